//! The requested field tree - the input side of the pipeline.
//!
//! A resolver or execution engine hands the compiler a tree of requested
//! fields. Each field carries a schema name, an output key (the name the
//! caller wants in the result), arguments, and child selections. Selections
//! may spread named fragments; fragments are expanded inline before the
//! builder traverses the tree.

use indexmap::IndexMap;
use serde_json::Value;

/// Named fragments available to the selection, keyed by fragment name.
pub type Fragments = IndexMap<String, Vec<Selection>>;

/// Variable values available to argument resolution.
pub type Variables = IndexMap<String, Value>;

/// An argument value: either inline or a reference to a variable.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Value(Value),
    Variable(String),
}

/// One entry in a selection set.
#[derive(Debug, Clone)]
pub enum Selection {
    Field(FieldNode),
    FragmentSpread(String),
}

/// A requested field: schema name, output key, arguments, child selections.
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until used"]
pub struct FieldNode {
    /// Field name as known to the schema mapping.
    pub name: String,
    /// Key under which the value appears in the output. Defaults to `name`.
    pub output_key: String,
    pub args: IndexMap<String, ArgValue>,
    pub selections: Vec<Selection>,
}

impl FieldNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            output_key: name.into(),
            args: IndexMap::new(),
            selections: Vec::new(),
        }
    }

    /// Request the field under a different output key.
    pub fn aliased(name: &str, output_key: &str) -> Self {
        Self {
            name: name.into(),
            output_key: output_key.into(),
            args: IndexMap::new(),
            selections: Vec::new(),
        }
    }

    /// Attach an inline argument.
    pub fn arg(mut self, name: &str, value: Value) -> Self {
        self.args.insert(name.into(), ArgValue::Value(value));
        self
    }

    /// Attach an argument resolved from a variable at build time.
    pub fn var_arg(mut self, name: &str, variable: &str) -> Self {
        self.args
            .insert(name.into(), ArgValue::Variable(variable.into()));
        self
    }

    /// Add a child field to the selection set.
    pub fn select(mut self, child: FieldNode) -> Self {
        self.selections.push(Selection::Field(child));
        self
    }

    /// Spread a named fragment into the selection set.
    pub fn spread(mut self, fragment: &str) -> Self {
        self.selections
            .push(Selection::FragmentSpread(fragment.into()));
        self
    }
}
