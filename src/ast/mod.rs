//! SQL AST - the intermediate tree between the field tree and SQL text.
//!
//! Each node kind is an explicit tagged variant; the builder and every
//! renderer match exhaustively, so adding a variant causes compile errors
//! everywhere it needs handling.
//!
//! Aliases are allocated exactly once, at build time. Condition generators
//! are carried on the nodes as deferred closures and invoked during
//! rendering, once the aliases they need are fixed.

pub mod build;
pub mod prune;

pub use build::AstBuilder;
pub use prune::prune;

use crate::schema::{Args, ComputedFn, ExprGen, JoinGen, SortKey, WhereGen};

/// One node of the SQL AST.
pub enum SqlNode {
    /// A joined (or root) table.
    Table(TableNode),
    /// A selected column.
    Column(ColumnNode),
    /// A selected raw SQL expression.
    Expression(ExpressionNode),
    /// A synthetic identifier concatenated from several columns.
    Composite(CompositeNode),
    /// An intermediate table expressing a many-to-many relation.
    Junction(JunctionNode),
    /// A field resolved from sibling columns after hydration.
    Computed(ComputedNode),
    /// A field with no SQL backing at all.
    NoOp,
}

/// A table in the join tree. The root table has no `join_gen`.
pub struct TableNode {
    /// Output key of the field this table answers.
    pub output_key: String,
    pub table: String,
    pub alias: String,
    /// Identifier columns from the schema mapping.
    pub key_columns: Vec<String>,
    /// Select aliases of the identifier expression(s) used for row grouping.
    pub key_aliases: Vec<String>,
    /// True for array-valued relations (one-to-many, many-to-many).
    pub grouped: bool,
    /// Requested order, semantically significant.
    pub children: Vec<SqlNode>,
    pub args: Args,
    pub where_gen: Option<WhereGen>,
    pub join_gen: Option<JoinGen>,
    pub order_by: Vec<SortKey>,
    pub page: Option<Page>,
}

impl TableNode {
    /// Select alias of a plain column under this table, if one is selected.
    pub fn column_alias(&self, column: &str) -> Option<&str> {
        self.children.iter().find_map(|child| match child {
            SqlNode::Column(c) if c.column == column => Some(c.alias.as_str()),
            _ => None,
        })
    }
}

/// Page bound from `limit`/`offset` arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

/// A selected column. After pruning, one `ColumnNode` may answer several
/// requested output keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNode {
    pub column: String,
    pub alias: String,
    pub outputs: Vec<Output>,
}

/// One requested output key answered by a select expression. Internal
/// outputs exist only to drive joins, grouping, ordering, or computed
/// fields, and are stripped from the final result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub key: String,
    pub internal: bool,
}

/// A raw SQL expression select item. The generator receives the quoted
/// table alias during rendering.
pub struct ExpressionNode {
    pub output_key: String,
    pub alias: String,
    pub args: Args,
    pub sql: ExprGen,
}

/// A synthetic identifier built by concatenating several columns, used to
/// group rows for tables with composite keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeNode {
    pub columns: Vec<String>,
    pub alias: String,
    pub outputs: Vec<Output>,
}

/// An intermediate table between a parent and child of a many-to-many
/// relation. Contributes two joins and no nesting level of its own.
pub struct JunctionNode {
    pub table: String,
    pub alias: String,
    pub parent_join: JoinGen,
    pub child_join: JoinGen,
    pub child: Box<TableNode>,
}

/// A field computed from hydrated sibling columns. Its dependency columns
/// are selected as internal `ColumnNode`s alongside it.
pub struct ComputedNode {
    pub output_key: String,
    pub dependencies: Vec<String>,
    pub resolve: ComputedFn,
}

impl std::fmt::Debug for SqlNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlNode::Table(t) => f.debug_tuple("Table").field(t).finish(),
            SqlNode::Column(c) => f.debug_tuple("Column").field(c).finish(),
            SqlNode::Expression(e) => f.debug_tuple("Expression").field(e).finish(),
            SqlNode::Composite(c) => f.debug_tuple("Composite").field(c).finish(),
            SqlNode::Junction(j) => f.debug_tuple("Junction").field(j).finish(),
            SqlNode::Computed(c) => f.debug_tuple("Computed").field(c).finish(),
            SqlNode::NoOp => f.write_str("NoOp"),
        }
    }
}

impl std::fmt::Debug for TableNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableNode")
            .field("output_key", &self.output_key)
            .field("table", &self.table)
            .field("alias", &self.alias)
            .field("key_aliases", &self.key_aliases)
            .field("grouped", &self.grouped)
            .field("children", &self.children)
            .field("order_by", &self.order_by)
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ExpressionNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionNode")
            .field("output_key", &self.output_key)
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for JunctionNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JunctionNode")
            .field("table", &self.table)
            .field("alias", &self.alias)
            .field("child", &self.child)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ComputedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedNode")
            .field("output_key", &self.output_key)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
