//! Oracle dialect.
//!
//! Differences from standard SQL that matter here:
//! - ANSI identifier quoting (`"`)
//! - No `AS` keyword for table aliases
//! - No native LIMIT/OFFSET: the renderer expresses page bounds through a
//!   ROW_NUMBER() window over the same ordering, which preserves observable
//!   order and page boundaries

use super::helpers;
use super::SqlDialect;
use crate::sql::token::TokenStream;

/// Oracle dialect.
#[derive(Debug, Clone, Copy)]
pub struct Oracle;

impl SqlDialect for Oracle {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn supports_limit_offset(&self) -> bool {
        false
    }

    fn emit_limit_offset(&self, _limit: Option<u64>, _offset: Option<u64>) -> TokenStream {
        // Never called: the renderer checks supports_limit_offset() first
        // and wraps the query in a row-number window instead.
        TokenStream::new()
    }

    fn emits_as_for_table_alias(&self) -> bool {
        false
    }
}
