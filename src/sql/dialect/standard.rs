//! Standard SQL dialect.
//!
//! The baseline the other dialects deviate from:
//! - ANSI identifier quoting (`"`)
//! - `LIMIT n OFFSET m` pagination
//! - `||` string concatenation

use super::helpers;
use super::SqlDialect;

/// Standard SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Standard;

impl SqlDialect for Standard {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...)
}
