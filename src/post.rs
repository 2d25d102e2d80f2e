//! Post-processing - the final pass over hydrated data.
//!
//! Three jobs, in an order that matters:
//! 1. resolve computed fields, while their internal dependency columns are
//!    still on the object;
//! 2. apply page bounds to paginated arrays and read page markers off the
//!    boundary rows, while their internal sort columns are still present;
//! 3. strip internal columns.
//!
//! Root-level pages were bounded in SQL (offset applied, one extra row
//! fetched); nested pages are applied here in full, since SQL cannot bound a
//! joined relation per parent row.

use serde_json::{Map, Value};

use crate::error::CompileResult;
use crate::shape::{ObjectShape, PageShape, ShapeField};

/// Finalize hydrated data in place. Fails only if a computed field's
/// resolver fails; the error propagates unmodified.
pub fn finalize(shape: &ObjectShape, value: &mut Value) -> CompileResult<()> {
    match value {
        Value::Array(_) => finalize_array(shape, value),
        Value::Object(object) => finalize_object(shape, object),
        _ => Ok(()),
    }
}

fn finalize_array(shape: &ObjectShape, value: &mut Value) -> CompileResult<()> {
    let Value::Array(items) = value else {
        return Ok(());
    };

    let Some(page) = &shape.page else {
        for item in items.iter_mut() {
            finalize(shape, item)?;
        }
        return Ok(());
    };

    let mut items = std::mem::take(items);
    if !page.sql_bounded {
        let skip = (page.offset as usize).min(items.len());
        items.drain(..skip);
    }
    let has_more = items.len() as u64 > page.limit;
    items.truncate(page.limit as usize);

    // markers read before stripping, while sort columns are still present
    let start = items
        .first()
        .map(|item| markers(page, item))
        .unwrap_or(Value::Null);
    let end = items
        .last()
        .map(|item| markers(page, item))
        .unwrap_or(Value::Null);

    for item in items.iter_mut() {
        finalize(shape, item)?;
    }

    let mut page_info = Map::new();
    page_info.insert("has_more".into(), Value::Bool(has_more));
    page_info.insert("has_previous".into(), Value::Bool(page.offset > 0));
    page_info.insert("start".into(), start);
    page_info.insert("end".into(), end);

    let mut envelope = Map::new();
    envelope.insert("nodes".into(), Value::Array(items));
    envelope.insert("page".into(), Value::Object(page_info));
    *value = Value::Object(envelope);
    Ok(())
}

fn finalize_object(shape: &ObjectShape, object: &mut Map<String, Value>) -> CompileResult<()> {
    let mut resolved = Vec::new();
    for (key, field) in &shape.fields {
        if let ShapeField::Computed { resolve, .. } = field {
            resolved.push((key.clone(), resolve(object)?));
        }
    }
    for (key, value) in resolved {
        object.insert(key, value);
    }

    for (key, field) in &shape.fields {
        if let ShapeField::Nested(nested) = field {
            if let Some(child) = object.get_mut(key) {
                finalize(nested, child)?;
            }
        }
    }

    for (key, field) in &shape.fields {
        if let ShapeField::Column { internal: true, .. } = field {
            object.remove(key);
        }
    }
    Ok(())
}

/// Sort values of one boundary row, keyed by output key. Callers pass these
/// back as cursors for keyset-style continuation.
fn markers(page: &PageShape, item: &Value) -> Value {
    let mut values = Map::new();
    for sort in &page.sort {
        values.insert(
            sort.key.clone(),
            item.get(&sort.key).cloned().unwrap_or(Value::Null),
        );
    }
    Value::Object(values)
}
