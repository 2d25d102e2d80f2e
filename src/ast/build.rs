//! SQL AST builder - walks the requested field tree and resolves each field
//! against the schema mapping.
//!
//! Build order matters: a node's alias is allocated before its children are
//! visited, and generators are bound only after that, so every closure a
//! renderer later invokes observes final alias strings. Fragments are
//! expanded inline and variables substituted into arguments before any field
//! is resolved.

use serde_json::Value;

use crate::alias::AliasNamespace;
use crate::ast::{ColumnNode, CompositeNode, ComputedNode, ExpressionNode, JunctionNode, Output, Page, SqlNode, TableNode};
use crate::error::{CompileError, CompileResult};
use crate::field::{ArgValue, FieldNode, Fragments, Selection, Variables};
use crate::schema::{Args, Cardinality, FieldMapping, ObjectMapping, RelationMapping, Schema};

static NULL_CONTEXT: Value = Value::Null;

/// Builds the SQL AST for one compilation. Single use: owns the alias
/// namespace for the request.
pub struct AstBuilder<'a> {
    schema: &'a Schema,
    fragments: Option<&'a Fragments>,
    variables: Option<&'a Variables>,
    context: &'a Value,
    ns: AliasNamespace,
}

impl<'a> AstBuilder<'a> {
    pub fn new(
        schema: &'a Schema,
        fragments: Option<&'a Fragments>,
        variables: Option<&'a Variables>,
        context: Option<&'a Value>,
        minify: bool,
    ) -> Self {
        Self {
            schema,
            fragments,
            variables,
            context: context.unwrap_or(&NULL_CONTEXT),
            ns: AliasNamespace::new(minify),
        }
    }

    /// Ambient context, passed through to generators untouched.
    pub fn context(&self) -> &'a Value {
        self.context
    }

    /// Build the AST for the root field of a request.
    pub fn build(
        mut self,
        field: &'a FieldNode,
        root_type: &str,
        cardinality: Cardinality,
    ) -> CompileResult<TableNode> {
        self.build_table(field, root_type, None, cardinality == Cardinality::Many)
    }

    fn build_table(
        &mut self,
        field: &'a FieldNode,
        type_name: &str,
        relation: Option<&RelationMapping>,
        grouped: bool,
    ) -> CompileResult<TableNode> {
        let schema = self.schema;
        let mapping = schema
            .get(type_name)
            .ok_or_else(|| CompileError::MissingMapping(type_name.to_string()))?;
        if mapping.key_columns.is_empty() {
            return Err(CompileError::MissingKey(type_name.to_string()));
        }

        let alias = self.ns.allocate(&field.output_key)?;
        let args = self.resolve_args(field)?;

        let (where_gen, order_by, paginated) = match relation {
            Some(rel) => (rel.where_gen.clone(), rel.order_by.clone(), rel.paginated),
            None => (
                mapping.where_gen.clone(),
                mapping.order_by.clone(),
                mapping.paginated,
            ),
        };
        let page = if paginated { page_bounds(&args) } else { None };

        let mut node = TableNode {
            output_key: field.output_key.clone(),
            table: mapping.table.clone(),
            alias,
            key_columns: mapping.key_columns.clone(),
            key_aliases: Vec::new(),
            grouped,
            children: Vec::new(),
            args,
            where_gen,
            join_gen: None,
            order_by,
            page,
        };

        for child in self.expand(&field.selections)? {
            self.build_field(&mut node, mapping, type_name, child)?;
        }

        self.attach_keys(&mut node)?;
        if !node.order_by.is_empty() || node.page.is_some() {
            self.attach_order_columns(&mut node)?;
        }
        Ok(node)
    }

    fn build_field(
        &mut self,
        node: &mut TableNode,
        mapping: &'a ObjectMapping,
        type_name: &str,
        field: &'a FieldNode,
    ) -> CompileResult<()> {
        let field_mapping =
            mapping
                .fields
                .get(&field.name)
                .ok_or_else(|| CompileError::UnknownField {
                    type_name: type_name.to_string(),
                    field: field.name.clone(),
                })?;

        match field_mapping {
            FieldMapping::Column { column } => {
                let alias = self.select_alias(&node.alias, &field.output_key)?;
                node.children.push(SqlNode::Column(ColumnNode {
                    column: column.clone(),
                    alias,
                    outputs: vec![Output {
                        key: field.output_key.clone(),
                        internal: false,
                    }],
                }));
            }
            FieldMapping::Expression { sql } => {
                let alias = self.select_alias(&node.alias, &field.output_key)?;
                let args = self.resolve_args(field)?;
                node.children.push(SqlNode::Expression(ExpressionNode {
                    output_key: field.output_key.clone(),
                    alias,
                    args,
                    sql: sql.clone(),
                }));
            }
            FieldMapping::Computed {
                dependencies,
                resolve,
            } => {
                for dep in dependencies {
                    let alias = self.select_alias(&node.alias, dep)?;
                    node.children.push(SqlNode::Column(ColumnNode {
                        column: dep.clone(),
                        alias,
                        outputs: vec![Output {
                            key: dep.clone(),
                            internal: true,
                        }],
                    }));
                }
                node.children.push(SqlNode::Computed(ComputedNode {
                    output_key: field.output_key.clone(),
                    dependencies: dependencies.clone(),
                    resolve: resolve.clone(),
                }));
            }
            FieldMapping::Ignored => node.children.push(SqlNode::NoOp),
            FieldMapping::Relation(rel) => self.build_relation(node, rel, field)?,
        }
        Ok(())
    }

    fn build_relation(
        &mut self,
        node: &mut TableNode,
        rel: &'a RelationMapping,
        field: &'a FieldNode,
    ) -> CompileResult<()> {
        let grouped = rel.cardinality == Cardinality::Many;

        if let Some(junction) = &rel.junction {
            // Junction alias is allocated before the child table's, matching
            // the join order in the rendered SQL.
            let alias = self.ns.allocate(&format!("{}_junction", field.output_key))?;
            let child = self.build_table(field, &rel.target, Some(rel), grouped)?;
            node.children.push(SqlNode::Junction(JunctionNode {
                table: junction.table.clone(),
                alias,
                parent_join: junction.parent_join.clone(),
                child_join: junction.child_join.clone(),
                child: Box::new(child),
            }));
        } else if let Some(join) = &rel.join {
            let mut child = self.build_table(field, &rel.target, Some(rel), grouped)?;
            child.join_gen = Some(join.clone());
            node.children.push(SqlNode::Table(child));
        } else {
            return Err(CompileError::MissingJoin(field.name.clone()));
        }
        Ok(())
    }

    /// Select the identifier expression every Table/Junction node needs for
    /// row grouping: a single key column directly, a composite key as one
    /// concatenated expression.
    fn attach_keys(&mut self, node: &mut TableNode) -> CompileResult<()> {
        if let [column] = node.key_columns.as_slice() {
            let column = column.clone();
            let alias = self.select_alias(&node.alias, &column)?;
            node.children.push(SqlNode::Column(ColumnNode {
                column: column.clone(),
                alias: alias.clone(),
                outputs: vec![Output {
                    key: column,
                    internal: true,
                }],
            }));
            node.key_aliases = vec![alias];
        } else {
            let alias = self.select_alias(&node.alias, "key")?;
            node.children.push(SqlNode::Composite(CompositeNode {
                columns: node.key_columns.clone(),
                alias: alias.clone(),
                outputs: vec![Output {
                    key: node.key_columns.join("_"),
                    internal: true,
                }],
            }));
            node.key_aliases = vec![alias];
        }
        Ok(())
    }

    /// Ordered or paginated nodes also select their sort and key columns as
    /// plain internal columns, so ordering can reference select aliases and
    /// the post-processor can read sort values off the hydrated objects.
    /// Duplicates against requested columns are collapsed by the pruner.
    fn attach_order_columns(&mut self, node: &mut TableNode) -> CompileResult<()> {
        let mut columns: Vec<String> = node.order_by.iter().map(|sk| sk.column.clone()).collect();
        columns.extend(node.key_columns.iter().cloned());

        for column in columns {
            if node.column_alias(&column).is_some() {
                continue;
            }
            let alias = self.select_alias(&node.alias, &column)?;
            node.children.push(SqlNode::Column(ColumnNode {
                column: column.clone(),
                alias,
                outputs: vec![Output {
                    key: column,
                    internal: true,
                }],
            }));
        }
        Ok(())
    }

    fn select_alias(&mut self, table_alias: &str, key: &str) -> CompileResult<String> {
        self.ns.allocate(&format!("{table_alias}__{key}"))
    }

    fn resolve_args(&self, field: &FieldNode) -> CompileResult<Args> {
        let variables = self.variables;
        let mut out = Args::new();
        for (name, value) in &field.args {
            let resolved = match value {
                ArgValue::Value(v) => v.clone(),
                ArgValue::Variable(var) => variables
                    .and_then(|vars| vars.get(var))
                    .cloned()
                    .ok_or_else(|| CompileError::UnknownVariable(var.clone()))?,
            };
            out.insert(name.clone(), resolved);
        }
        Ok(out)
    }

    /// Expand fragment spreads inline, preserving selection order.
    fn expand(&self, selections: &'a [Selection]) -> CompileResult<Vec<&'a FieldNode>> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        self.expand_into(selections, &mut out, &mut stack)?;
        Ok(out)
    }

    fn expand_into(
        &self,
        selections: &'a [Selection],
        out: &mut Vec<&'a FieldNode>,
        stack: &mut Vec<&'a str>,
    ) -> CompileResult<()> {
        let fragments = self.fragments;
        for selection in selections {
            match selection {
                Selection::Field(field) => out.push(field),
                Selection::FragmentSpread(name) => {
                    if stack.contains(&name.as_str()) {
                        return Err(CompileError::FragmentCycle(name.clone()));
                    }
                    let fragment = fragments
                        .and_then(|f| f.get(name))
                        .ok_or_else(|| CompileError::UnknownFragment(name.clone()))?;
                    stack.push(name);
                    self.expand_into(fragment, out, stack)?;
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}

fn page_bounds(args: &Args) -> Option<Page> {
    let limit = args.get("limit").and_then(Value::as_u64)?;
    let offset = args.get("offset").and_then(Value::as_u64).unwrap_or(0);
    Some(Page { limit, offset })
}
