//! SQL dialect definitions and formatting rules.
//!
//! A trait-based abstraction over dialect differences:
//!
//! - Identifier quoting: `"` (Standard/Oracle), `` ` `` (MySQL)
//! - Pagination: native LIMIT/OFFSET vs a row-number window bound
//! - String concatenation: `||` vs CONCAT()
//! - Table alias syntax: `AS alias` vs bare `alias`
//!
//! Dialects are selected once per compilation through the static registry on
//! [`Dialect`]; configuration surfaces that carry a dialect name resolve it
//! with [`Dialect::from_name`], which rejects unknown names before any SQL
//! text is produced.

pub mod helpers;
mod mysql;
mod oracle;
mod standard;

pub use mysql::MySql;
pub use oracle::Oracle;
pub use standard::Standard;

use serde::{Deserialize, Serialize};

use super::token::TokenStream;
use crate::error::{CompileError, CompileResult};

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Default implementations follow standard SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging and configuration lookup.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// String concatenation operator.
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// Whether the concat operator may be used at all. Dialects answering
    /// false get a `CONCAT()` call instead.
    fn supports_concat_operator(&self) -> bool {
        true
    }

    /// Whether LIMIT/OFFSET can be emitted directly. Dialects answering
    /// false get the same bound expressed through a row-number window.
    fn supports_limit_offset(&self) -> bool {
        true
    }

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    /// Whether table aliases take the `AS` keyword.
    fn emits_as_for_table_alias(&self) -> bool {
        true
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Standard,
    MySql,
    Oracle,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Standard => &Standard,
            Dialect::MySql => &MySql,
            Dialect::Oracle => &Oracle,
        }
    }

    /// Resolve a dialect from its configured name.
    pub fn from_name(name: &str) -> CompileResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Ok(Dialect::Standard),
            "mysql" => Ok(Dialect::MySql),
            "oracle" => Ok(Dialect::Oracle),
            _ => Err(CompileError::UnknownDialect(name.to_string())),
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn concat_operator(&self) -> &'static str {
        self.dialect().concat_operator()
    }

    fn supports_concat_operator(&self) -> bool {
        self.dialect().supports_concat_operator()
    }

    fn supports_limit_offset(&self) -> bool {
        self.dialect().supports_limit_offset()
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn emits_as_for_table_alias(&self) -> bool {
        self.dialect().emits_as_for_table_alias()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
