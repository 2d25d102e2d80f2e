//! SQL generation module.
//!
//! Renders a built (and pruned) SQL AST into SQL text for a selected
//! dialect:
//!
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations and the static registry
//! - [`render`] - the AST stringifier

pub mod dialect;
pub mod render;
pub mod token;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use render::render;
pub use token::{Token, TokenStream};
