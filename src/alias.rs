//! Per-compilation alias allocator.
//!
//! Every table and selected column in the rendered SQL gets an alias from one
//! `AliasNamespace` instance, created fresh for each compilation. Allocation
//! is deterministic in call order, so compiling the same field tree twice
//! yields byte-identical SQL - in minified mode this makes the SQL text itself
//! a usable cache key for the caller.

use std::collections::HashSet;

use crate::error::{CompileError, CompileResult};

const MAX_VERBOSE_LEN: usize = 24;
const MINIFY_ALPHABET_LEN: u64 = 26;

/// Allocates unique aliases within one compilation.
#[derive(Debug)]
pub struct AliasNamespace {
    minify: bool,
    used: HashSet<String>,
    counter: u64,
}

impl AliasNamespace {
    pub fn new(minify: bool) -> Self {
        Self {
            minify,
            used: HashSet::new(),
            counter: 0,
        }
    }

    /// Allocate a fresh alias. In verbose mode the preferred name is kept,
    /// sanitized and suffixed with `$n` on collision. In minified mode the
    /// preferred name is ignored and the shortest unused code is handed out.
    pub fn allocate(&mut self, preferred: &str) -> CompileResult<String> {
        let alias = if self.minify {
            self.next_code()
        } else {
            self.verbose(preferred)
        };

        // Allocation strategies above never collide; if one ever does, that
        // is an implementation bug, not a user error.
        if !self.used.insert(alias.clone()) {
            return Err(CompileError::AliasInvariant(alias));
        }
        Ok(alias)
    }

    fn verbose(&self, preferred: &str) -> String {
        let base = sanitize(preferred);
        if !self.used.contains(&base) {
            return base;
        }
        let mut n: u64 = 2;
        loop {
            let candidate = format!("{base}${n}");
            if !self.used.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Bijective base-26 code: a..z, aa, ab, ...
    fn next_code(&mut self) -> String {
        let mut n = self.counter as i64;
        self.counter += 1;

        let mut code = Vec::new();
        loop {
            code.push(b'a' + (n % MINIFY_ALPHABET_LEN as i64) as u8);
            n = n / MINIFY_ALPHABET_LEN as i64 - 1;
            if n < 0 {
                break;
            }
        }
        code.reverse();
        String::from_utf8(code).expect("alias codes are ASCII")
    }
}

/// Strip characters that are awkward inside a quoted identifier and keep the
/// result short enough for the most restrictive identifier limits.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(MAX_VERBOSE_LEN)
        .collect();
    if cleaned.is_empty() {
        "t".into()
    } else {
        cleaned
    }
}
