//! Shape definitions - the hydration plan derived from a built AST.
//!
//! A shape mirrors the nesting of the requested field tree and records, for
//! every output key, which select alias carries its value (or which closure
//! computes it after hydration). The shape is derived from the same AST the
//! SQL is rendered from, so aliases always agree between the two.
//!
//! Junction nodes contribute joins but no nesting level, so a shape never
//! has an entry for a junction table; the child relation appears directly
//! under the parent.

use indexmap::IndexMap;

use crate::ast::{SqlNode, TableNode};
use crate::schema::{ComputedFn, SortDir};

/// Hydration plan for one nesting level of the result.
#[derive(Clone)]
pub struct ObjectShape {
    /// Select aliases of the identifier expression(s); rows sharing the same
    /// values under these aliases belong to the same object.
    pub key_aliases: Vec<String>,
    /// True for array-valued levels.
    pub grouped: bool,
    /// Output key -> field plan, in request order.
    pub fields: IndexMap<String, ShapeField>,
    pub page: Option<PageShape>,
}

/// How one output key of an object is produced.
#[derive(Clone)]
pub enum ShapeField {
    /// Copied from a row column. Internal fields exist only to drive
    /// grouping, ordering, or computed fields, and are stripped by the
    /// post-processor.
    Column { alias: String, internal: bool },
    /// A nested object or array hydrated from the same rows.
    Nested(Box<ObjectShape>),
    /// Resolved from sibling values after hydration.
    Computed {
        dependencies: Vec<String>,
        resolve: ComputedFn,
    },
}

/// Pagination plan for an array-valued level.
#[derive(Debug, Clone)]
pub struct PageShape {
    pub limit: u64,
    pub offset: u64,
    /// True when the SQL itself applied the offset and over-fetched
    /// `limit + 1` rows. False for nested levels, where the post-processor
    /// applies both bounds to the hydrated array.
    pub sql_bounded: bool,
    /// Ordering, by hydrated output key, used to read page markers.
    pub sort: Vec<SortShape>,
}

/// One ordering entry as visible on hydrated objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortShape {
    pub key: String,
    pub dir: SortDir,
}

/// Derive the hydration plan for a (pruned) AST. `is_root` marks the level
/// whose page bound was pushed into the SQL.
pub fn define_shape(node: &TableNode, is_root: bool) -> ObjectShape {
    let mut fields: IndexMap<String, ShapeField> = IndexMap::new();

    for child in &node.children {
        match child {
            SqlNode::Column(column) => {
                for output in &column.outputs {
                    insert_column(&mut fields, &output.key, &column.alias, output.internal);
                }
            }
            SqlNode::Expression(expr) => {
                insert_column(&mut fields, &expr.output_key, &expr.alias, false);
            }
            SqlNode::Composite(composite) => {
                for output in &composite.outputs {
                    insert_column(&mut fields, &output.key, &composite.alias, output.internal);
                }
            }
            SqlNode::Table(table) => {
                fields.insert(
                    table.output_key.clone(),
                    ShapeField::Nested(Box::new(define_shape(table, false))),
                );
            }
            SqlNode::Junction(junction) => {
                fields.insert(
                    junction.child.output_key.clone(),
                    ShapeField::Nested(Box::new(define_shape(&junction.child, false))),
                );
            }
            SqlNode::Computed(computed) => {
                fields.insert(
                    computed.output_key.clone(),
                    ShapeField::Computed {
                        dependencies: computed.dependencies.clone(),
                        resolve: computed.resolve.clone(),
                    },
                );
            }
            SqlNode::NoOp => {}
        }
    }

    ObjectShape {
        key_aliases: node.key_aliases.clone(),
        grouped: node.grouped,
        fields,
        page: node.page.map(|page| PageShape {
            limit: page.limit,
            offset: page.offset,
            sql_bounded: is_root,
            sort: sort_shapes(node),
        }),
    }
}

/// A requested field and an internal column can land on the same output key
/// after pruning; the requested one wins so the value survives stripping.
fn insert_column(fields: &mut IndexMap<String, ShapeField>, key: &str, alias: &str, internal: bool) {
    if internal {
        if let Some(ShapeField::Column {
            internal: false, ..
        }) = fields.get(key)
        {
            return;
        }
    }
    fields.insert(
        key.to_string(),
        ShapeField::Column {
            alias: alias.to_string(),
            internal,
        },
    );
}

/// Ordering entries mapped to the output keys they occupy on hydrated
/// objects: the sort keys first, then identifier columns as tie-breakers,
/// mirroring the rendered ORDER BY.
fn sort_shapes(node: &TableNode) -> Vec<SortShape> {
    let mut shapes: Vec<SortShape> = node
        .order_by
        .iter()
        .filter_map(|sk| {
            output_key_for_column(node, &sk.column).map(|key| SortShape { key, dir: sk.dir })
        })
        .collect();
    for column in &node.key_columns {
        if node.order_by.iter().any(|sk| sk.column == *column) {
            continue;
        }
        if let Some(key) = output_key_for_column(node, column) {
            shapes.push(SortShape {
                key,
                dir: SortDir::Asc,
            });
        }
    }
    shapes
}

/// Output key under which a column's value appears on hydrated objects. The
/// column may have been merged into a requested field by the pruner, in
/// which case any of its output keys carries the same value.
fn output_key_for_column(node: &TableNode, column: &str) -> Option<String> {
    node.children.iter().find_map(|child| match child {
        SqlNode::Column(c) if c.column == column => {
            c.outputs.first().map(|output| output.key.clone())
        }
        _ => None,
    })
}

impl std::fmt::Debug for ObjectShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectShape")
            .field("key_aliases", &self.key_aliases)
            .field("grouped", &self.grouped)
            .field("fields", &self.fields)
            .field("page", &self.page)
            .finish()
    }
}

impl std::fmt::Debug for ShapeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeField::Column { alias, internal } => f
                .debug_struct("Column")
                .field("alias", alias)
                .field("internal", internal)
                .finish(),
            ShapeField::Nested(shape) => f.debug_tuple("Nested").field(shape).finish(),
            ShapeField::Computed { dependencies, .. } => f
                .debug_struct("Computed")
                .field("dependencies", dependencies)
                .finish_non_exhaustive(),
        }
    }
}
