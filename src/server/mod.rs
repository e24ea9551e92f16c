pub mod handlers;
pub mod runtime;
pub mod state;

pub use runtime::*;
pub use state::*;
