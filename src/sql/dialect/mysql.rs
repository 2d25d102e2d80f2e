//! MySQL dialect.
//!
//! Differences from standard SQL that matter here:
//! - Backtick identifier quoting (`` `name` ``)
//! - `||` is logical OR by default, so concatenation uses CONCAT()
//! - LIMIT ... OFFSET ... works as in standard SQL

use super::helpers;
use super::SqlDialect;

/// MySQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn supports_concat_operator(&self) -> bool {
        false
    }
}
