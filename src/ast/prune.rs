//! Dependency pruner - collapses duplicate column selections.
//!
//! Two requested output keys backed by the same underlying column (aliased
//! requests, fragment overlap, injected identifier or ordering columns) leave
//! duplicate `ColumnNode`s under one table after building. Pruning keeps one
//! physical select expression per column and folds every requested output key
//! onto it, so the shape definition still answers each original key.
//!
//! Runs once over the whole tree, after building and before rendering, so
//! duplicates discovered anywhere in a subtree are caught. Idempotent.

use std::collections::HashMap;

use crate::ast::{Output, SqlNode, TableNode};

/// Collapse duplicate column selections under every table of the tree.
pub fn prune(root: &mut TableNode) {
    prune_table(root);
}

fn prune_table(node: &mut TableNode) {
    let mut kept_index: HashMap<String, usize> = HashMap::new();
    let mut alias_remap: HashMap<String, String> = HashMap::new();
    let mut children: Vec<SqlNode> = Vec::with_capacity(node.children.len());

    for child in node.children.drain(..) {
        match child {
            SqlNode::Column(column) => {
                match kept_index.get(&column.column) {
                    Some(&index) => {
                        if let SqlNode::Column(kept) = &mut children[index] {
                            alias_remap.insert(column.alias, kept.alias.clone());
                            for output in column.outputs {
                                merge_output(&mut kept.outputs, output);
                            }
                        }
                    }
                    None => {
                        kept_index.insert(column.column.clone(), children.len());
                        children.push(SqlNode::Column(column));
                    }
                }
            }
            SqlNode::Table(mut table) => {
                prune_table(&mut table);
                children.push(SqlNode::Table(table));
            }
            SqlNode::Junction(mut junction) => {
                prune_table(&mut junction.child);
                children.push(SqlNode::Junction(junction));
            }
            other => children.push(other),
        }
    }

    node.children = children;

    // Grouping may reference an alias that was merged away.
    for key_alias in &mut node.key_aliases {
        if let Some(kept) = alias_remap.get(key_alias) {
            *key_alias = kept.clone();
        }
    }
}

fn merge_output(outputs: &mut Vec<Output>, output: Output) {
    match outputs.iter_mut().find(|o| o.key == output.key) {
        // An explicit request outranks an internal one for the same key.
        Some(existing) => existing.internal = existing.internal && output.internal,
        None => outputs.push(output),
    }
}
