//! Top-level compilation entry points.
//!
//! [`compile`] turns one request into a [`Compiled`] pair of SQL text and
//! hydration shape; the caller executes the SQL on its own connection.
//! [`resolve`] runs the whole round trip through a caller-supplied transport
//! closure and returns finished data.

use serde_json::Value;
use thiserror::Error;

use crate::ast::{prune, AstBuilder};
use crate::error::{CompileError, CompileResult};
use crate::field::{FieldNode, Fragments, Variables};
use crate::hydrate::{hydrate, Row};
use crate::post::finalize;
use crate::schema::{Cardinality, Schema};
use crate::shape::{define_shape, ObjectShape};
use crate::sql::{render, Dialect};

/// One query request: the field tree plus everything needed to resolve it.
#[must_use = "builders have no effect until used"]
pub struct QueryRequest<'a> {
    pub field: &'a FieldNode,
    pub root_type: &'a str,
    pub cardinality: Cardinality,
    pub fragments: Option<&'a Fragments>,
    pub variables: Option<&'a Variables>,
    /// Ambient request context (auth claims, tenant id, ...), passed to every
    /// generator untouched.
    pub context: Option<&'a Value>,
}

impl<'a> QueryRequest<'a> {
    /// A list-valued request rooted at `root_type`.
    pub fn new(field: &'a FieldNode, root_type: &'a str) -> Self {
        Self {
            field,
            root_type,
            cardinality: Cardinality::Many,
            fragments: None,
            variables: None,
            context: None,
        }
    }

    /// A single-object request rooted at `root_type`.
    pub fn single(field: &'a FieldNode, root_type: &'a str) -> Self {
        Self {
            cardinality: Cardinality::One,
            ..Self::new(field, root_type)
        }
    }

    pub fn fragments(mut self, fragments: &'a Fragments) -> Self {
        self.fragments = Some(fragments);
        self
    }

    pub fn variables(mut self, variables: &'a Variables) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn context(mut self, context: &'a Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Knobs for one compilation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    pub dialect: Dialect,
    /// Allocate one- and two-letter aliases instead of readable ones. Useful
    /// when generated SQL would otherwise exceed identifier length limits.
    pub minify: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builders have no effect until used"]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use = "builders have no effect until used"]
    pub fn minified(mut self) -> Self {
        self.minify = true;
        self
    }
}

/// Output of [`compile`]: SQL to execute and the plan to reassemble its
/// rows.
#[derive(Debug)]
pub struct Compiled {
    pub sql: String,
    pub shape: ObjectShape,
    pub dialect: Dialect,
}

/// Compile one request into SQL text and a hydration shape.
pub fn compile(
    schema: &Schema,
    request: &QueryRequest<'_>,
    options: &CompileOptions,
) -> CompileResult<Compiled> {
    tracing::debug!(
        root_type = request.root_type,
        field = %request.field.name,
        dialect = %options.dialect,
        "compiling query"
    );

    let builder = AstBuilder::new(
        schema,
        request.fragments,
        request.variables,
        request.context,
        options.minify,
    );
    let context = builder.context();
    let mut root = builder.build(request.field, request.root_type, request.cardinality)?;
    prune(&mut root);

    let sql = render(&root, options.dialect, context)?;
    let shape = define_shape(&root, true);
    tracing::debug!(sql_len = sql.len(), "query compiled");

    Ok(Compiled {
        sql,
        shape,
        dialect: options.dialect,
    })
}

/// Errors from the full round trip: compilation, or the caller's transport.
#[derive(Debug, Error)]
pub enum ResolveError<E> {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("transport failed: {0}")]
    Transport(E),
}

/// Compile, execute through `transport`, hydrate, and post-process.
///
/// The transport receives the rendered SQL and returns flat rows keyed by
/// select alias. Execution itself stays entirely on the caller's side; this
/// crate never opens a connection.
pub fn resolve<E, F>(
    schema: &Schema,
    request: &QueryRequest<'_>,
    options: &CompileOptions,
    transport: F,
) -> Result<Value, ResolveError<E>>
where
    F: FnOnce(&str) -> Result<Vec<Row>, E>,
{
    let compiled = compile(schema, request, options)?;
    let rows = transport(&compiled.sql).map_err(ResolveError::Transport)?;
    tracing::debug!(rows = rows.len(), "hydrating rows");

    let mut data = hydrate(&compiled.shape, &rows);
    finalize(&compiled.shape, &mut data).map_err(ResolveError::Compile)?;
    Ok(data)
}
