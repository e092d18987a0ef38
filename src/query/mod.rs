//! Read path: query execution and result rendering.

pub mod executor;
pub mod render;

pub use executor::{QueryExecutor, ReadOutcome};
pub use render::markdown_table;
