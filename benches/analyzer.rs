//! Run with: cargo bench --features=benchmarks

use criterion::criterion_main;

use graphql_query_guard::benchmarks::analyzer::benches;

criterion_main!(benches);
