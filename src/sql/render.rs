//! Dialect stringifier - renders a SQL AST into SQL text.
//!
//! One pass over the tree collects select items, join clauses, filter
//! conditions, and ordering entries; assembly then lays them out for the
//! target dialect. Every non-root Table/Junction node becomes a LEFT JOIN -
//! outer, so an absent optional relation still yields the parent row with
//! null child columns instead of dropping it.
//!
//! Root page bounds count parent objects, not flat rows. When the root has
//! join descendants, a plain LIMIT on the joined query would bound the
//! join-multiplied rowset, so the bound (with the root's own filter and
//! ordering) is applied to the root table in a wrapped subquery before any
//! join is attached.
//!
//! User-supplied `where`/`join`/expression generators are invoked exactly
//! once each during this pass, receiving dialect-quoted alias strings. A
//! generator failure aborts rendering and propagates to the caller
//! unmodified.

use serde_json::Value;

use crate::ast::{Page, SqlNode, TableNode};
use crate::error::{CompileError, CompileResult};
use crate::schema::{SortDir, SortKey};
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::token::{Token, TokenStream};

/// Select alias of the derived row number in window-bounded pagination.
/// Cannot collide with namespace output: verbose aliases never contain `$`
/// without a digit suffix and minified codes are pure letters.
const ROW_NUMBER_ALIAS: &str = "rn$";

/// Alias of the wrapped subquery in window-bounded pagination.
const WRAP_ALIAS: &str = "q";

/// Render the pruned AST to SQL text for the given dialect.
pub fn render(root: &TableNode, dialect: Dialect, context: &Value) -> CompileResult<String> {
    let mut renderer = Renderer {
        dialect,
        context,
        root_alias: root.alias.clone(),
        root_where: None,
        selects: Vec::new(),
        joins: Vec::new(),
        wheres: Vec::new(),
        orders: Vec::new(),
    };
    renderer.walk(root, None)?;
    Ok(renderer.assemble(root).serialize(dialect))
}

/// One ORDER BY entry. Carries both the table-qualified column (for the
/// plain clause) and the select alias (for the window form, which can only
/// see the subquery's output columns).
struct OrderEntry {
    table_alias: String,
    column: String,
    select_alias: String,
    dir: SortDir,
}

struct Renderer<'a> {
    dialect: Dialect,
    context: &'a Value,
    root_alias: String,
    /// The root's own filter, kept apart from descendants' filters: a
    /// subquery-bounded root applies it inside the window.
    root_where: Option<String>,
    selects: Vec<TokenStream>,
    joins: Vec<TokenStream>,
    wheres: Vec<String>,
    orders: Vec<OrderEntry>,
}

impl Renderer<'_> {
    fn walk(&mut self, node: &TableNode, parent_alias: Option<&str>) -> CompileResult<()> {
        if let (Some(parent), Some(join_gen)) = (parent_alias, &node.join_gen) {
            let condition = join_gen(
                &self.quoted(parent),
                &self.quoted(&node.alias),
                &node.args,
                self.context,
            )?;
            self.joins
                .push(self.join_clause(&node.table, &node.alias, &condition));
        }

        if let Some(where_gen) = &node.where_gen {
            let condition = where_gen(&self.quoted(&node.alias), &node.args, self.context)?;
            if !condition.trim().is_empty() {
                if node.alias == self.root_alias {
                    self.root_where = Some(condition);
                } else {
                    self.wheres.push(condition);
                }
            }
        }

        self.collect_orders(node)?;

        for child in &node.children {
            match child {
                SqlNode::Column(column) => {
                    let item = self.column_item(&node.alias, &column.column, &column.alias);
                    self.selects.push(item);
                }
                SqlNode::Expression(expr) => {
                    let text = (expr.sql)(&self.quoted(&node.alias), &expr.args, self.context)?;
                    let mut item = TokenStream::new();
                    item.lparen()
                        .push(Token::Raw(text))
                        .rparen()
                        .space()
                        .push(Token::As)
                        .space()
                        .push(Token::Ident(expr.alias.clone()));
                    self.selects.push(item);
                }
                SqlNode::Composite(composite) => {
                    let item =
                        self.composite_item(&node.alias, &composite.columns, &composite.alias);
                    self.selects.push(item);
                }
                SqlNode::Table(table) => self.walk(table, Some(&node.alias))?,
                SqlNode::Junction(junction) => {
                    let parent_cond = (junction.parent_join)(
                        &self.quoted(&node.alias),
                        &self.quoted(&junction.alias),
                        &junction.child.args,
                        self.context,
                    )?;
                    self.joins.push(self.join_clause(
                        &junction.table,
                        &junction.alias,
                        &parent_cond,
                    ));

                    let child_cond = (junction.child_join)(
                        &self.quoted(&junction.alias),
                        &self.quoted(&junction.child.alias),
                        &junction.child.args,
                        self.context,
                    )?;
                    self.joins.push(self.join_clause(
                        &junction.child.table,
                        &junction.child.alias,
                        &child_cond,
                    ));

                    // The junction's joins are already emitted; the child
                    // table itself has no join generator of its own.
                    self.walk(&junction.child, None)?;
                }
                SqlNode::Computed(_) | SqlNode::NoOp => {}
            }
        }
        Ok(())
    }

    /// Ordering for a node: its sort keys, then its identifier columns as a
    /// stable tie-breaker so no two distinct rows compare equal.
    fn collect_orders(&mut self, node: &TableNode) -> CompileResult<()> {
        if node.order_by.is_empty() && node.page.is_none() {
            return Ok(());
        }

        let mut entries = node.order_by.clone();
        for key in &node.key_columns {
            if !entries.iter().any(|sk| sk.column == *key) {
                entries.push(SortKey {
                    column: key.clone(),
                    dir: SortDir::Asc,
                });
            }
        }

        for sort_key in entries {
            // Build time selects every sort and key column of an ordered
            // node; a miss here is an implementation bug, not a user error.
            let select_alias = node
                .column_alias(&sort_key.column)
                .ok_or_else(|| CompileError::OrderColumnInvariant(sort_key.column.clone()))?
                .to_string();
            self.orders.push(OrderEntry {
                table_alias: node.alias.clone(),
                column: sort_key.column,
                select_alias,
                dir: sort_key.dir,
            });
        }
        Ok(())
    }

    fn assemble(&self, root: &TableNode) -> TokenStream {
        // A joined query multiplies root rows; the page bound must then be
        // applied to the root table alone, inside the FROM clause.
        let bound_in_subquery = root.page.is_some() && !self.joins.is_empty();

        let mut ts = TokenStream::new();

        ts.push(Token::Select);
        for (i, item) in self.selects.iter().enumerate() {
            if i > 0 {
                ts.comma();
            }
            ts.newline().indent(1);
            ts.append(item);
        }

        ts.newline().push(Token::From).space();
        match root.page {
            Some(page) if bound_in_subquery => {
                ts.append(&self.bounded_root_ref(root, page));
            }
            _ => {
                ts.append(&self.table_ref(&root.table, &root.alias));
            }
        };

        for join in &self.joins {
            ts.newline().append(join);
        }

        let mut conditions: Vec<&str> = Vec::new();
        if !bound_in_subquery {
            if let Some(condition) = &self.root_where {
                conditions.push(condition);
            }
        }
        conditions.extend(self.wheres.iter().map(String::as_str));
        if !conditions.is_empty() {
            ts.newline().push(Token::Where).space();
            for (i, condition) in conditions.iter().enumerate() {
                if i > 0 {
                    ts.space().push(Token::And).space();
                }
                ts.lparen().push(Token::Raw(condition.to_string())).rparen();
            }
        }

        if !bound_in_subquery {
            if let Some(page) = root.page {
                if !self.dialect.supports_limit_offset() {
                    return self.wrap_with_row_bound(ts, page);
                }
            }
        }

        if !self.orders.is_empty() {
            ts.newline().push(Token::OrderBy).space();
            for (i, entry) in self.orders.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Ident(entry.table_alias.clone()))
                    .push(Token::Dot)
                    .push(Token::Ident(entry.column.clone()))
                    .space()
                    .push(dir_token(entry.dir));
            }
        }

        if !bound_in_subquery {
            if let Some(page) = root.page {
                // Over-fetch one row so the post-processor can tell whether
                // a further page exists.
                let offset = (page.offset > 0).then_some(page.offset);
                ts.newline().append(
                    &self
                        .dialect
                        .emit_limit_offset(Some(page.limit.saturating_add(1)), offset),
                );
            }
        }

        ts
    }

    /// The root table bounded to its page window before joining:
    /// `(SELECT * FROM t AS alias WHERE ... ORDER BY ... LIMIT n) AS alias`.
    /// The inner alias shadows the outer one, so the root's filter, the join
    /// conditions, and the select list all keep working unchanged.
    fn bounded_root_ref(&self, root: &TableNode, page: Page) -> TokenStream {
        let mut base = TokenStream::new();
        base.push(Token::Select)
            .space()
            .push(Token::Star)
            .space()
            .push(Token::From)
            .space();
        base.append(&self.table_ref(&root.table, &root.alias));
        if let Some(condition) = &self.root_where {
            base.space().push(Token::Where).space();
            base.lparen().push(Token::Raw(condition.clone())).rparen();
        }

        let fetch = page.limit.saturating_add(1);
        let mut ts = TokenStream::new();
        ts.lparen();
        if self.dialect.supports_limit_offset() {
            ts.append(&base);
            ts.space().push(Token::OrderBy).space();
            for (i, entry) in self.root_orders().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Ident(entry.table_alias.clone()))
                    .push(Token::Dot)
                    .push(Token::Ident(entry.column.clone()))
                    .space()
                    .push(dir_token(entry.dir));
            }
            let offset = (page.offset > 0).then_some(page.offset);
            ts.space()
                .append(&self.dialect.emit_limit_offset(Some(fetch), offset));
        } else {
            // Same row-number construct as the join-free window wrap, but
            // ordering by raw columns: `SELECT *` exposes no select aliases.
            ts.push(Token::Select)
                .space()
                .push(Token::Star)
                .space()
                .push(Token::From)
                .space()
                .lparen();
            ts.push(Token::Select)
                .space()
                .push(Token::Raw(format!("{WRAP_ALIAS}.*")))
                .comma()
                .space()
                .push(Token::RowNumber)
                .lparen()
                .rparen()
                .space()
                .push(Token::Over)
                .space()
                .lparen()
                .push(Token::OrderBy)
                .space();
            for (i, entry) in self.root_orders().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Raw(WRAP_ALIAS.into()))
                    .push(Token::Dot)
                    .push(Token::Ident(entry.column.clone()))
                    .space()
                    .push(dir_token(entry.dir));
            }
            ts.rparen()
                .space()
                .push(Token::As)
                .space()
                .push(Token::Ident(ROW_NUMBER_ALIAS.into()));
            ts.space()
                .push(Token::From)
                .space()
                .lparen()
                .append(&base)
                .rparen()
                .space()
                .push(Token::Raw(WRAP_ALIAS.into()));
            ts.rparen().space().push(Token::Where).space();
            push_row_bound(&mut ts, page.offset, fetch);
        }
        ts.rparen().space();
        if self.dialect.emits_as_for_table_alias() {
            ts.push(Token::As).space();
        }
        ts.push(Token::Ident(root.alias.clone()));
        ts
    }

    /// Express the page bound through a ROW_NUMBER() window for dialects
    /// without native LIMIT/OFFSET. The window orders by the same entries
    /// (via their select aliases, the only columns visible at that level),
    /// so observable order and page boundaries match the native form.
    fn wrap_with_row_bound(&self, base: TokenStream, page: Page) -> TokenStream {
        let fetch = page.limit.saturating_add(1);
        let mut ts = TokenStream::new();

        ts.push(Token::Select)
            .space()
            .push(Token::Star)
            .space()
            .push(Token::From)
            .space()
            .lparen()
            .newline();

        ts.push(Token::Select)
            .space()
            .push(Token::Raw(format!("{WRAP_ALIAS}.*")))
            .comma()
            .space()
            .push(Token::RowNumber)
            .lparen()
            .rparen()
            .space()
            .push(Token::Over)
            .space()
            .lparen()
            .push(Token::OrderBy)
            .space();
        for (i, entry) in self.orders.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Raw(WRAP_ALIAS.into()))
                .push(Token::Dot)
                .push(Token::Ident(entry.select_alias.clone()))
                .space()
                .push(dir_token(entry.dir));
        }
        ts.rparen()
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(ROW_NUMBER_ALIAS.into()));

        ts.space().push(Token::From).space().lparen().newline();
        ts.append(&base);
        ts.newline()
            .rparen()
            .space()
            .push(Token::Raw(WRAP_ALIAS.into()));

        ts.newline().rparen().space().push(Token::Where).space();
        push_row_bound(&mut ts, page.offset, fetch);

        ts.newline()
            .push(Token::OrderBy)
            .space()
            .push(Token::Ident(ROW_NUMBER_ALIAS.into()));

        ts
    }

    fn root_orders(&self) -> impl Iterator<Item = &OrderEntry> + '_ {
        self.orders
            .iter()
            .filter(move |entry| entry.table_alias == self.root_alias)
    }

    fn column_item(&self, table_alias: &str, column: &str, alias: &str) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Ident(table_alias.into()))
            .push(Token::Dot)
            .push(Token::Ident(column.into()))
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(alias.into()));
        ts
    }

    fn composite_item(&self, table_alias: &str, columns: &[String], alias: &str) -> TokenStream {
        let mut ts = TokenStream::new();
        if self.dialect.supports_concat_operator() {
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    ts.space().push(Token::Concat).space();
                }
                ts.push(Token::Ident(table_alias.into()))
                    .push(Token::Dot)
                    .push(Token::Ident(column.into()));
            }
        } else {
            ts.push(Token::Raw("CONCAT".into())).lparen();
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Ident(table_alias.into()))
                    .push(Token::Dot)
                    .push(Token::Ident(column.into()));
            }
            ts.rparen();
        }
        ts.space()
            .push(Token::As)
            .space()
            .push(Token::Ident(alias.into()));
        ts
    }

    fn join_clause(&self, table: &str, alias: &str, condition: &str) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Left).space().push(Token::Join).space();
        ts.append(&self.table_ref(table, alias));
        ts.space()
            .push(Token::On)
            .space()
            .push(Token::Raw(condition.into()));
        ts
    }

    fn table_ref(&self, table: &str, alias: &str) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Ident(table.into()));
        if self.dialect.emits_as_for_table_alias() {
            ts.space().push(Token::As);
        }
        ts.space().push(Token::Ident(alias.into()));
        ts
    }

    fn quoted(&self, alias: &str) -> String {
        self.dialect.quote_identifier(alias)
    }
}

fn push_row_bound(ts: &mut TokenStream, offset: u64, fetch: u64) {
    let upper = offset.saturating_add(fetch);
    ts.push(Token::Ident(ROW_NUMBER_ALIAS.into()))
        .space()
        .push(Token::Gt)
        .space()
        .push(lit_u64(offset))
        .space()
        .push(Token::And)
        .space()
        .push(Token::Ident(ROW_NUMBER_ALIAS.into()))
        .space()
        .push(Token::Lte)
        .space()
        .push(lit_u64(upper));
}

/// Clamp instead of wrapping: an absurd page argument renders an absurd
/// (but well-formed) bound rather than a negative one.
fn lit_u64(n: u64) -> Token {
    Token::LitInt(i64::try_from(n).unwrap_or(i64::MAX))
}

fn dir_token(dir: SortDir) -> Token {
    match dir {
        SortDir::Asc => Token::Asc,
        SortDir::Desc => Token::Desc,
    }
}
