//! Utility helpers: glob expansion and filesystem helpers shared by operators.
pub mod files;
pub mod glob;

pub use glob::{expand, ExpandOptions, GlobPattern};
