//! SQL generation tests across dialects.

use nestql::prelude::*;
use serde_json::{json, Value};

fn blog_schema() -> Schema {
    Schema::new()
        .object(
            "Account",
            ObjectMapping::new("accounts", &["id"])
                .column("id", "id")
                .column("email", "email_address")
                .column("contact", "email_address")
                .relation(
                    "posts",
                    RelationMapping::many("Post")
                        .join(|parent, child, _args, _ctx| {
                            Ok(format!("{parent}.id = {child}.author_id"))
                        })
                        .order_by("created_at", SortDir::Desc)
                        .paginated(),
                )
                .relation(
                    "friends",
                    RelationMapping::many("Account").through(
                        "friendships",
                        |parent, junction, _args, _ctx| {
                            Ok(format!("{parent}.id = {junction}.account_id"))
                        },
                        |junction, child, _args, _ctx| {
                            Ok(format!("{junction}.friend_id = {child}.id"))
                        },
                    ),
                ),
        )
        .object(
            "Post",
            ObjectMapping::new("posts", &["id"])
                .column("id", "id")
                .column("body", "body")
                .column("created_at", "created_at"),
        )
}

fn compiled_sql(schema: &Schema, field: &FieldNode, dialect: Dialect) -> String {
    let request = QueryRequest::new(field, "Account");
    let options = CompileOptions::new().with_dialect(dialect);
    compile(schema, &request, &options).unwrap().sql
}

#[test]
fn test_one_statement_per_request() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts")
        .select(FieldNode::new("email"))
        .select(FieldNode::new("posts").select(FieldNode::new("body")))
        .select(FieldNode::new("friends").select(FieldNode::new("email")));

    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(sql.starts_with("SELECT"));
    assert!(!sql.contains(';'));
}

#[test]
fn test_shared_column_selected_once() {
    // "email" and "contact" both map to email_address; one select item
    // answers both output keys
    let schema = blog_schema();
    let field = FieldNode::new("accounts")
        .select(FieldNode::new("email"))
        .select(FieldNode::new("contact"));

    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert_eq!(sql.matches("email_address").count(), 1);
}

#[test]
fn test_relations_are_outer_joins() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts")
        .select(FieldNode::new("posts").select(FieldNode::new("body")));

    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(sql.contains("LEFT JOIN \"posts\" AS \"posts\" ON \"accounts\".id = \"posts\".author_id"));
    assert!(!sql.contains("INNER JOIN"));
}

#[test]
fn test_junction_relation_emits_two_joins() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts")
        .select(FieldNode::new("friends").select(FieldNode::new("email")));

    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert_eq!(sql.matches("LEFT JOIN").count(), 2);
    assert!(sql.contains("\"friendships\" AS \"friends_junction\""));
    assert!(sql.contains("\"accounts\".id = \"friends_junction\".account_id"));
    assert!(sql.contains("\"friends_junction\".friend_id = \"friends\".id"));
}

#[test]
fn test_dialect_quoting_differences() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts").select(FieldNode::new("email"));

    let standard = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(standard.contains("FROM \"accounts\" AS \"accounts\""));

    let mysql = compiled_sql(&schema, &field, Dialect::MySql);
    assert!(mysql.contains("FROM `accounts` AS `accounts`"));
    assert!(mysql.contains("`accounts`.`email_address` AS `accounts__email`"));

    let oracle = compiled_sql(&schema, &field, Dialect::Oracle);
    assert!(oracle.contains("FROM \"accounts\" \"accounts\""));
    assert!(!oracle.contains("FROM \"accounts\" AS"));
}

#[test]
fn test_unknown_dialect_name_rejected() {
    let err = Dialect::from_name("sqlserver").unwrap_err();
    assert!(matches!(err, CompileError::UnknownDialect(ref name) if name == "sqlserver"));
}

#[test]
fn test_minified_aliases_deterministic() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts")
        .select(FieldNode::new("email"))
        .select(FieldNode::new("posts").select(FieldNode::new("body")));
    let request = QueryRequest::new(&field, "Account");
    let options = CompileOptions::new().minified();

    let first = compile(&schema, &request, &options).unwrap();
    let second = compile(&schema, &request, &options).unwrap();
    assert_eq!(first.sql, second.sql);
    assert!(!first.sql.contains("accounts__"));
    assert!(first.sql.contains("FROM \"accounts\" AS \"a\""));
}

#[test]
fn test_nested_order_by_with_key_tiebreak() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts")
        .select(FieldNode::new("posts").select(FieldNode::new("body")));

    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(sql.contains(
        "ORDER BY \"posts\".\"created_at\" DESC, \"posts\".\"id\" ASC"
    ));
}

#[test]
fn test_root_pagination_overfetches_one_row() {
    let schema = Schema::new().object(
        "Account",
        ObjectMapping::new("accounts", &["id"])
            .column("email", "email_address")
            .order_by("id", SortDir::Asc)
            .paginated(),
    );
    let field = FieldNode::new("accounts")
        .arg("limit", json!(5))
        .arg("offset", json!(10))
        .select(FieldNode::new("email"));

    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(sql.ends_with("LIMIT 6 OFFSET 10"));
    assert!(sql.contains("ORDER BY \"accounts\".\"id\" ASC"));
}

#[test]
fn test_paginated_root_with_join_bounds_parents_not_rows() {
    // with a to-many join in play, LIMIT on the joined query would count
    // join-multiplied rows; the bound must sit on the root table instead
    let schema = paginated_blog_schema();
    let field = FieldNode::new("accounts")
        .arg("limit", json!(2))
        .select(FieldNode::new("email"))
        .select(FieldNode::new("posts").select(FieldNode::new("body")));

    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(sql.contains(
        "FROM (SELECT * FROM \"accounts\" AS \"accounts\" \
         ORDER BY \"accounts\".\"id\" ASC LIMIT 3) AS \"accounts\""
    ));
    assert_eq!(sql.matches("LIMIT").count(), 1);
    assert!(!sql.ends_with("LIMIT 3"));
    assert!(sql.contains("LEFT JOIN \"posts\""));
}

#[test]
fn test_paginated_root_with_join_keeps_root_filter_inside_bound() {
    let schema = Schema::new()
        .object(
            "Account",
            ObjectMapping::new("accounts", &["id"])
                .column("email", "email_address")
                .filter(|alias, _args, _ctx| Ok(format!("{alias}.active = TRUE")))
                .order_by("id", SortDir::Asc)
                .paginated()
                .relation(
                    "posts",
                    RelationMapping::many("Post")
                        .join(|p, c, _a, _x| Ok(format!("{p}.id = {c}.author_id")))
                        .filter(|alias, _args, _ctx| Ok(format!("{alias}.deleted_at IS NULL"))),
                ),
        )
        .object(
            "Post",
            ObjectMapping::new("posts", &["id"]).column("body", "body"),
        );
    let field = FieldNode::new("accounts")
        .arg("limit", json!(2))
        .select(FieldNode::new("email"))
        .select(FieldNode::new("posts").select(FieldNode::new("body")));

    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    // root filter applies before the page window, child filter after the join
    assert!(sql.contains(
        "(SELECT * FROM \"accounts\" AS \"accounts\" \
         WHERE (\"accounts\".active = TRUE) ORDER BY"
    ));
    assert!(sql.contains("\nWHERE (\"posts\".deleted_at IS NULL)"));
    assert_eq!(sql.matches("accounts\".active").count(), 1);
}

#[test]
fn test_oracle_paginated_root_with_join_uses_inner_window() {
    let schema = paginated_blog_schema();
    let field = FieldNode::new("accounts")
        .arg("limit", json!(2))
        .select(FieldNode::new("email"))
        .select(FieldNode::new("posts").select(FieldNode::new("body")));

    let sql = compiled_sql(&schema, &field, Dialect::Oracle);
    // the window bounds the root table alone, ordering by raw columns
    assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY q.\"id\" ASC) AS \"rn$\""));
    assert!(sql.contains("\"rn$\" > 0 AND \"rn$\" <= 3"));
    assert!(sql.contains("LEFT JOIN \"posts\""));
    assert!(!sql.contains("LIMIT"));
}

#[test]
fn test_absurd_limit_is_clamped_not_wrapped() {
    let schema = Schema::new().object(
        "Account",
        ObjectMapping::new("accounts", &["id"])
            .column("email", "email_address")
            .order_by("id", SortDir::Asc)
            .paginated(),
    );
    let field = FieldNode::new("accounts")
        .arg("limit", json!(u64::MAX))
        .select(FieldNode::new("email"));

    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(sql.ends_with(&format!("LIMIT {}", i64::MAX)));
}

fn paginated_blog_schema() -> Schema {
    Schema::new()
        .object(
            "Account",
            ObjectMapping::new("accounts", &["id"])
                .column("email", "email_address")
                .order_by("id", SortDir::Asc)
                .paginated()
                .relation(
                    "posts",
                    RelationMapping::many("Post")
                        .join(|p, c, _a, _x| Ok(format!("{p}.id = {c}.author_id"))),
                ),
        )
        .object(
            "Post",
            ObjectMapping::new("posts", &["id"]).column("body", "body"),
        )
}

#[test]
fn test_oracle_pagination_uses_row_number_window() {
    let schema = Schema::new().object(
        "Account",
        ObjectMapping::new("accounts", &["id"])
            .column("email", "email_address")
            .order_by("id", SortDir::Asc)
            .paginated(),
    );
    let field = FieldNode::new("accounts")
        .arg("limit", json!(5))
        .arg("offset", json!(10))
        .select(FieldNode::new("email"));

    let sql = compiled_sql(&schema, &field, Dialect::Oracle);
    assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY q.\"accounts__id\" ASC) AS \"rn$\""));
    assert!(sql.contains("\"rn$\" > 10 AND \"rn$\" <= 16"));
    assert!(sql.ends_with("ORDER BY \"rn$\""));
    assert!(!sql.contains("LIMIT"));
}

#[test]
fn test_filters_are_parenthesized_and_anded() {
    let schema = Schema::new()
        .object(
            "Account",
            ObjectMapping::new("accounts", &["id"])
                .column("email", "email_address")
                .filter(|alias, _args, _ctx| Ok(format!("{alias}.active = TRUE")))
                .relation(
                    "posts",
                    RelationMapping::many("Post")
                        .join(|p, c, _a, _x| Ok(format!("{p}.id = {c}.author_id")))
                        .filter(|alias, _args, _ctx| Ok(format!("{alias}.deleted_at IS NULL"))),
                ),
        )
        .object(
            "Post",
            ObjectMapping::new("posts", &["id"]).column("body", "body"),
        );

    let field = FieldNode::new("accounts")
        .select(FieldNode::new("email"))
        .select(FieldNode::new("posts").select(FieldNode::new("body")));
    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(sql.contains(
        "WHERE (\"accounts\".active = TRUE) AND (\"posts\".deleted_at IS NULL)"
    ));
}

#[test]
fn test_blank_filter_emits_no_where_clause() {
    let schema = Schema::new().object(
        "Account",
        ObjectMapping::new("accounts", &["id"])
            .column("email", "email_address")
            .filter(|_alias, _args, _ctx| Ok(String::new())),
    );

    let field = FieldNode::new("accounts").select(FieldNode::new("email"));
    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(!sql.contains("WHERE"));
}

#[test]
fn test_generator_failure_propagates_verbatim() {
    let schema = Schema::new().object(
        "Account",
        ObjectMapping::new("accounts", &["id"])
            .column("email", "email_address")
            .filter(|_alias, _args, _ctx| Err(GeneratorError::msg("not authorized"))),
    );

    let field = FieldNode::new("accounts").select(FieldNode::new("email"));
    let request = QueryRequest::new(&field, "Account");
    let err = compile(&schema, &request, &CompileOptions::new()).unwrap_err();
    assert_eq!(err.to_string(), "not authorized");
}

#[test]
fn test_context_reaches_generators() {
    let schema = Schema::new().object(
        "Account",
        ObjectMapping::new("accounts", &["id"])
            .column("email", "email_address")
            .filter(|alias, _args, ctx| {
                let tenant = ctx["tenant_id"].as_i64().unwrap_or_default();
                Ok(format!("{alias}.tenant_id = {tenant}"))
            }),
    );

    let field = FieldNode::new("accounts").select(FieldNode::new("email"));
    let context: Value = json!({"tenant_id": 42});
    let request = QueryRequest::new(&field, "Account").context(&context);
    let sql = compile(&schema, &request, &CompileOptions::new())
        .unwrap()
        .sql;
    assert!(sql.contains("(\"accounts\".tenant_id = 42)"));
}

#[test]
fn test_composite_key_concat_per_dialect() {
    let schema = Schema::new().object(
        "Account",
        ObjectMapping::new("entries", &["tenant", "seq"]).column("note", "note"),
    );
    let field = FieldNode::new("entries").select(FieldNode::new("note"));

    let standard = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(standard.contains("\"entries\".\"tenant\" || \"entries\".\"seq\""));

    let mysql = compiled_sql(&schema, &field, Dialect::MySql);
    assert!(mysql.contains("CONCAT(`entries`.`tenant`, `entries`.`seq`)"));
}

#[test]
fn test_expression_fields_render_parenthesized() {
    let schema = Schema::new().object(
        "Account",
        ObjectMapping::new("accounts", &["id"]).expression("post_count", |alias, _args, _ctx| {
            Ok(format!(
                "SELECT COUNT(*) FROM posts WHERE posts.author_id = {alias}.id"
            ))
        }),
    );
    let field = FieldNode::new("accounts").select(FieldNode::new("post_count"));
    let sql = compiled_sql(&schema, &field, Dialect::Standard);
    assert!(sql.contains(
        "(SELECT COUNT(*) FROM posts WHERE posts.author_id = \"accounts\".id) AS \"accounts__post_count\""
    ));
}
