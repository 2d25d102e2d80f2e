//! # nestql
//!
//! Compiles a hierarchical field selection into exactly one SQL query and
//! re-nests the flat rows it returns.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │           Field Tree (requested selection)               │
//! │     + Schema (tables, keys, relations, generators)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [ast builder + pruner]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     SQL AST                              │
//! └─────────────────────────────────────────────────────────┘
//!              │                           │
//!              ▼ [renderer]                ▼ [shape builder]
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │   SQL text (per dialect)  │  │     Shape definition     │
//! └──────────────────────────┘  └──────────────────────────┘
//!              │                           │
//!              ▼ caller executes           │
//! ┌──────────────────────────┐             │
//! │        Flat rows          │─────────────┤
//! └──────────────────────────┘             ▼ [hydrate + post]
//!                               ┌──────────────────────────┐
//!                               │      Nested result        │
//!                               └──────────────────────────┘
//! ```
//!
//! The crate never opens a database connection: [`compile`] hands back SQL
//! text and a hydration plan, and [`resolve`] drives the round trip through
//! a caller-supplied transport closure.

pub mod alias;
pub mod ast;
pub mod compile;
pub mod error;
pub mod field;
pub mod hydrate;
pub mod post;
pub mod schema;
pub mod shape;
pub mod sql;

// Re-export SQL submodules at crate level
pub use sql::dialect;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compile::{compile, resolve, CompileOptions, Compiled, QueryRequest};
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::error::{CompileError, CompileResult, GeneratorError};
    pub use crate::field::{ArgValue, FieldNode, Fragments, Selection, Variables};
    pub use crate::hydrate::Row;
    pub use crate::schema::{
        Cardinality, ObjectMapping, RelationMapping, Schema, SortDir, SortKey,
    };
}

// Also export at crate root for convenience
pub use compile::{compile, resolve, CompileOptions, Compiled, QueryRequest, ResolveError};
pub use dialect::Dialect;
pub use error::{CompileError, CompileResult, GeneratorError};
pub use field::FieldNode;
pub use hydrate::Row;
pub use schema::{Cardinality, ObjectMapping, RelationMapping, Schema, SortDir};
