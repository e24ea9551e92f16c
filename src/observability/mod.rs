//! Prometheus metrics for guard decisions and HTTP traffic

pub mod endpoint;
pub mod init;
pub mod metrics;
pub mod recorder;

pub use endpoint::*;
pub use init::*;
pub use metrics::*;
pub use recorder::*;
