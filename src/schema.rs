//! Schema mapping metadata - how requested fields relate to tables and columns.
//!
//! The schema is the bridge between the field tree and the database: for each
//! object type it records the backing table, the identifier columns used to
//! group flat rows, and a mapping per field. Relations carry user-supplied
//! condition generators that are captured at build time and invoked exactly
//! once during rendering, after aliases are fixed.
//!
//! Generators receive alias strings already quoted for the target dialect, so
//! condition text can embed them directly:
//!
//! ```ignore
//! RelationMapping::many("Post")
//!     .join(|parent, child, _args, _ctx| Ok(format!("{parent}.id = {child}.author_id")))
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GeneratorError;

/// Resolved field arguments, in request order.
pub type Args = serde_json::Map<String, Value>;

/// `where(alias, args, context) -> condition text`.
pub type WhereGen =
    Arc<dyn Fn(&str, &Args, &Value) -> Result<String, GeneratorError> + Send + Sync>;

/// `join(parent_alias, child_alias, args, context) -> condition text`.
pub type JoinGen =
    Arc<dyn Fn(&str, &str, &Args, &Value) -> Result<String, GeneratorError> + Send + Sync>;

/// `expression(table_alias, args, context) -> select expression text`.
pub type ExprGen =
    Arc<dyn Fn(&str, &Args, &Value) -> Result<String, GeneratorError> + Send + Sync>;

/// `resolve(sibling_object) -> value`, applied after hydration.
pub type ComputedFn =
    Arc<dyn Fn(&serde_json::Map<String, Value>) -> Result<Value, GeneratorError> + Send + Sync>;

/// Relation cardinality. `Many` marks the relation as array-valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Sort direction for an ordering descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// One ordering key on a relation or root table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub dir: SortDir,
}

// =============================================================================
// Schema
// =============================================================================

/// Mapping metadata for every object type reachable from a query.
#[derive(Clone, Default)]
pub struct Schema {
    types: IndexMap<String, ObjectMapping>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type mapping.
    #[must_use = "builders have no effect until used"]
    pub fn object(mut self, name: &str, mapping: ObjectMapping) -> Self {
        self.types.insert(name.into(), mapping);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ObjectMapping> {
        self.types.get(name)
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// How one object type maps onto a table.
#[derive(Clone)]
pub struct ObjectMapping {
    pub table: String,
    /// Identifier columns used to group flat rows. At least one is required;
    /// more than one forms a composite key.
    pub key_columns: Vec<String>,
    pub fields: IndexMap<String, FieldMapping>,
    /// Filter applied when this type is the query root.
    pub where_gen: Option<WhereGen>,
    /// Ordering applied when this type is the query root.
    pub order_by: Vec<SortKey>,
    /// When true, `limit`/`offset` arguments on the root field become a page
    /// bound on the generated SQL.
    pub paginated: bool,
}

impl ObjectMapping {
    pub fn new(table: &str, key_columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
            fields: IndexMap::new(),
            where_gen: None,
            order_by: Vec::new(),
            paginated: false,
        }
    }

    /// Map a field to a plain column.
    #[must_use = "builders have no effect until used"]
    pub fn column(mut self, field: &str, column: &str) -> Self {
        self.fields
            .insert(field.into(), FieldMapping::Column { column: column.into() });
        self
    }

    /// Map a field to a raw SQL expression. The generator receives the quoted
    /// table alias.
    #[must_use = "builders have no effect until used"]
    pub fn expression<F>(mut self, field: &str, sql: F) -> Self
    where
        F: Fn(&str, &Args, &Value) -> Result<String, GeneratorError> + Send + Sync + 'static,
    {
        self.fields
            .insert(field.into(), FieldMapping::Expression { sql: Arc::new(sql) });
        self
    }

    /// Map a field to a relation.
    #[must_use = "builders have no effect until used"]
    pub fn relation(mut self, field: &str, relation: RelationMapping) -> Self {
        self.fields
            .insert(field.into(), FieldMapping::Relation(Box::new(relation)));
        self
    }

    /// Map a field to a value computed from sibling columns after hydration.
    /// The listed dependency columns are selected internally and stripped from
    /// the final output unless requested in their own right.
    #[must_use = "builders have no effect until used"]
    pub fn computed<F>(mut self, field: &str, dependencies: &[&str], resolve: F) -> Self
    where
        F: Fn(&serde_json::Map<String, Value>) -> Result<Value, GeneratorError>
            + Send
            + Sync
            + 'static,
    {
        self.fields.insert(
            field.into(),
            FieldMapping::Computed {
                dependencies: dependencies.iter().map(|c| c.to_string()).collect(),
                resolve: Arc::new(resolve),
            },
        );
        self
    }

    /// Mark a field as handled entirely outside SQL.
    #[must_use = "builders have no effect until used"]
    pub fn ignored(mut self, field: &str) -> Self {
        self.fields.insert(field.into(), FieldMapping::Ignored);
        self
    }

    /// Filter applied when this type is the query root.
    #[must_use = "builders have no effect until used"]
    pub fn filter<F>(mut self, where_gen: F) -> Self
    where
        F: Fn(&str, &Args, &Value) -> Result<String, GeneratorError> + Send + Sync + 'static,
    {
        self.where_gen = Some(Arc::new(where_gen));
        self
    }

    /// Ordering applied when this type is the query root.
    #[must_use = "builders have no effect until used"]
    pub fn order_by(mut self, column: &str, dir: SortDir) -> Self {
        self.order_by.push(SortKey { column: column.into(), dir });
        self
    }

    /// Honor `limit`/`offset` arguments when this type is the query root.
    #[must_use = "builders have no effect until used"]
    pub fn paginated(mut self) -> Self {
        self.paginated = true;
        self
    }
}

impl std::fmt::Debug for ObjectMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectMapping")
            .field("table", &self.table)
            .field("key_columns", &self.key_columns)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// How one field of an object type resolves.
#[derive(Clone)]
pub enum FieldMapping {
    /// A plain column on the owning table.
    Column { column: String },
    /// A raw SQL expression over the owning table.
    Expression { sql: ExprGen },
    /// A join to another mapped type.
    Relation(Box<RelationMapping>),
    /// A value derived from sibling columns after hydration.
    Computed {
        dependencies: Vec<String>,
        resolve: ComputedFn,
    },
    /// Not backed by SQL at all.
    Ignored,
}

impl std::fmt::Debug for FieldMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldMapping::Column { column } => f.debug_struct("Column").field("column", column).finish(),
            FieldMapping::Expression { .. } => f.write_str("Expression"),
            FieldMapping::Relation(rel) => f.debug_tuple("Relation").field(rel).finish(),
            FieldMapping::Computed { dependencies, .. } => f
                .debug_struct("Computed")
                .field("dependencies", dependencies)
                .finish_non_exhaustive(),
            FieldMapping::Ignored => f.write_str("Ignored"),
        }
    }
}

// =============================================================================
// Relations
// =============================================================================

/// A relation to another mapped type.
///
/// Exactly one of `join` or `junction` must be present; a relation with
/// neither is a configuration error reported at build time.
#[derive(Clone)]
pub struct RelationMapping {
    pub target: String,
    pub cardinality: Cardinality,
    pub join: Option<JoinGen>,
    pub junction: Option<JunctionMapping>,
    pub where_gen: Option<WhereGen>,
    pub order_by: Vec<SortKey>,
    /// When true, `limit`/`offset` arguments bound the hydrated array and the
    /// post-processor attaches page markers.
    pub paginated: bool,
}

impl RelationMapping {
    /// A one-to-one relation.
    pub fn one(target: &str) -> Self {
        Self::with_cardinality(target, Cardinality::One)
    }

    /// A one-to-many relation.
    pub fn many(target: &str) -> Self {
        Self::with_cardinality(target, Cardinality::Many)
    }

    fn with_cardinality(target: &str, cardinality: Cardinality) -> Self {
        Self {
            target: target.into(),
            cardinality,
            join: None,
            junction: None,
            where_gen: None,
            order_by: Vec::new(),
            paginated: false,
        }
    }

    /// Direct join condition between parent and child table.
    #[must_use = "builders have no effect until used"]
    pub fn join<F>(mut self, join: F) -> Self
    where
        F: Fn(&str, &str, &Args, &Value) -> Result<String, GeneratorError> + Send + Sync + 'static,
    {
        self.join = Some(Arc::new(join));
        self
    }

    /// Many-to-many through a junction table: `parent_join` links the parent
    /// to the junction, `child_join` links the junction to the child.
    #[must_use = "builders have no effect until used"]
    pub fn through<P, C>(mut self, table: &str, parent_join: P, child_join: C) -> Self
    where
        P: Fn(&str, &str, &Args, &Value) -> Result<String, GeneratorError> + Send + Sync + 'static,
        C: Fn(&str, &str, &Args, &Value) -> Result<String, GeneratorError> + Send + Sync + 'static,
    {
        self.junction = Some(JunctionMapping {
            table: table.into(),
            parent_join: Arc::new(parent_join),
            child_join: Arc::new(child_join),
        });
        self
    }

    /// Filter on the child table.
    #[must_use = "builders have no effect until used"]
    pub fn filter<F>(mut self, where_gen: F) -> Self
    where
        F: Fn(&str, &Args, &Value) -> Result<String, GeneratorError> + Send + Sync + 'static,
    {
        self.where_gen = Some(Arc::new(where_gen));
        self
    }

    #[must_use = "builders have no effect until used"]
    pub fn order_by(mut self, column: &str, dir: SortDir) -> Self {
        self.order_by.push(SortKey { column: column.into(), dir });
        self
    }

    #[must_use = "builders have no effect until used"]
    pub fn paginated(mut self) -> Self {
        self.paginated = true;
        self
    }
}

impl std::fmt::Debug for RelationMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationMapping")
            .field("target", &self.target)
            .field("cardinality", &self.cardinality)
            .field("junction", &self.junction.as_ref().map(|j| &j.table))
            .field("paginated", &self.paginated)
            .finish_non_exhaustive()
    }
}

/// Junction-table metadata for a many-to-many relation.
#[derive(Clone)]
pub struct JunctionMapping {
    pub table: String,
    pub parent_join: JoinGen,
    pub child_join: JoinGen,
}
