//! Hydration - regrouping flat result rows into nested objects.
//!
//! SQL returns a cartesian-style flat rowset: each row carries the columns
//! of every joined table, and a parent with three children appears three
//! times. Hydration walks the shape definition and folds rows back into the
//! nesting the request asked for, grouping by the identifier aliases at each
//! level.
//!
//! Grouping preserves first-appearance order, so the SQL ORDER BY survives
//! into the hydrated arrays. Rows whose identifier values are all null mean
//! the outer join matched nothing and contribute no object.

use indexmap::IndexMap;
use serde_json::Value;

use crate::shape::{ObjectShape, ShapeField};

/// One flat result row, keyed by select alias.
pub type Row = serde_json::Map<String, Value>;

/// Fold flat rows into the nested value the shape describes: an array for a
/// grouped root, a single object (or null when no row matched) otherwise.
pub fn hydrate(shape: &ObjectShape, rows: &[Row]) -> Value {
    let refs: Vec<&Row> = rows.iter().collect();
    hydrate_level(shape, &refs)
}

fn hydrate_level(shape: &ObjectShape, rows: &[&Row]) -> Value {
    let groups = group_rows(shape, rows);
    if shape.grouped {
        Value::Array(
            groups
                .into_iter()
                .map(|group| Value::Object(build_object(shape, &group)))
                .collect(),
        )
    } else {
        match groups.into_iter().next() {
            Some(group) => Value::Object(build_object(shape, &group)),
            None => Value::Null,
        }
    }
}

/// Partition rows by their identifier values, preserving first-appearance
/// order. Rows with an all-null identifier are dropped.
fn group_rows<'r>(shape: &ObjectShape, rows: &[&'r Row]) -> Vec<Vec<&'r Row>> {
    let mut groups: IndexMap<String, Vec<&Row>> = IndexMap::new();
    for row in rows {
        if let Some(key) = group_key(shape, row) {
            groups.entry(key).or_default().push(row);
        }
    }
    groups.into_values().collect()
}

fn group_key(shape: &ObjectShape, row: &Row) -> Option<String> {
    let mut parts = Vec::with_capacity(shape.key_aliases.len());
    let mut all_null = true;
    for alias in &shape.key_aliases {
        let value = row.get(alias).unwrap_or(&Value::Null);
        if !value.is_null() {
            all_null = false;
        }
        parts.push(value.to_string());
    }
    // unit separator keeps ("a", "bc") distinct from ("ab", "c")
    (!all_null).then(|| parts.join("\u{1f}"))
}

/// Build one object from its group of rows. Scalar fields read the first
/// row; nested fields recurse over the whole group. Computed fields get a
/// null placeholder, filled in by the post-processor once siblings exist.
fn build_object(shape: &ObjectShape, rows: &[&Row]) -> serde_json::Map<String, Value> {
    let mut object = serde_json::Map::new();
    for (key, field) in &shape.fields {
        let value = match field {
            ShapeField::Column { alias, .. } => rows
                .first()
                .and_then(|row| row.get(alias))
                .cloned()
                .unwrap_or(Value::Null),
            ShapeField::Nested(nested) => hydrate_level(nested, rows),
            ShapeField::Computed { .. } => Value::Null,
        };
        object.insert(key.clone(), value);
    }
    object
}
