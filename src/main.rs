use anyhow::Result;
use clap::Parser;

use graphql_query_guard::{Cli, check_query_file, run_server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(query_file) = &cli.check {
        let decision = check_query_file(&cli, query_file).await?;
        println!("{}", serde_json::to_string_pretty(&decision)?);
        if !decision.allow {
            std::process::exit(1);
        }
        return Ok(());
    }

    run_server(&cli).await
}
