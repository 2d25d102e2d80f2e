//! Error types for the compilation pipeline.
//!
//! Two families matter to callers:
//!
//! - Configuration errors: the requested field tree asks for something the
//!   schema mapping cannot express. Raised synchronously, before any SQL text
//!   exists.
//! - Generator errors: a user-supplied `where`/`join`/expression generator
//!   failed. These are passed through verbatim, never wrapped or retried,
//!   since they may carry authorization or validation failures the caller
//!   must see.

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that can occur while compiling a field tree to SQL.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no table mapping for type `{0}`")]
    MissingMapping(String),

    #[error("type `{type_name}` has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("relation `{0}` has neither a join generator nor junction metadata")]
    MissingJoin(String),

    #[error("table mapping for `{0}` declares no key columns")]
    MissingKey(String),

    #[error("unsupported dialect `{0}`")]
    UnknownDialect(String),

    #[error("unknown fragment `{0}`")]
    UnknownFragment(String),

    #[error("fragment cycle through `{0}`")]
    FragmentCycle(String),

    #[error("unresolved variable `${0}`")]
    UnknownVariable(String),

    /// A user-supplied condition generator failed. Propagated verbatim.
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// The alias namespace handed out the same alias twice. This is an
    /// internal invariant violation, never expected in correct operation.
    #[error("alias namespace returned duplicate alias `{0}`")]
    AliasInvariant(String),

    /// An ordered or paginated table reached rendering without one of its
    /// sort columns selected. Internal invariant violation, never expected
    /// in correct operation.
    #[error("ordering column `{0}` has no select alias")]
    OrderColumnInvariant(String),
}

/// Opaque error raised inside a user-supplied generator closure.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct GeneratorError(pub Box<dyn std::error::Error + Send + Sync>);

impl GeneratorError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }

    /// Convenience constructor from a plain message.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self(msg.into().into())
    }
}
