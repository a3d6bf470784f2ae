pub mod assets;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use types::*;
