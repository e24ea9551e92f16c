pub mod models;
pub mod resolver;
pub mod source;
pub mod validation;

pub use models::*;
pub use resolver::*;
pub use source::*;
pub use validation::*;
