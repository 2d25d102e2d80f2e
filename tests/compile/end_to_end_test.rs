//! Full round trips through `resolve` with a fake transport.

use nestql::prelude::*;
use nestql::ResolveError;
use serde_json::{json, Value};

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("rows must be objects, got {other}"),
    }
}

fn blog_schema() -> Schema {
    Schema::new()
        .object(
            "Account",
            ObjectMapping::new("accounts", &["id"])
                .column("id", "id")
                .column("email", "email_address")
                .computed("full_name", &["first_name", "last_name"], |obj| {
                    let first = obj["first_name"].as_str().unwrap_or_default();
                    let last = obj["last_name"].as_str().unwrap_or_default();
                    Ok(Value::String(format!("{first} {last}")))
                })
                .relation(
                    "posts",
                    RelationMapping::many("Post")
                        .join(|parent, child, _args, _ctx| {
                            Ok(format!("{parent}.id = {child}.author_id"))
                        })
                        .order_by("created_at", SortDir::Desc)
                        .paginated(),
                ),
        )
        .object(
            "Post",
            ObjectMapping::new("posts", &["id"])
                .column("body", "body")
                .column("created_at", "created_at"),
        )
}

#[test]
fn test_resolve_round_trip() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts")
        .select(FieldNode::new("email"))
        .select(FieldNode::new("posts").select(FieldNode::new("body")));
    let request = QueryRequest::new(&field, "Account");

    let data = resolve(&schema, &request, &CompileOptions::new(), |sql| {
        assert!(sql.starts_with("SELECT"));
        Ok::<_, String>(vec![
            row(json!({
                "accounts__id": 1,
                "accounts__email": "ann@example.com",
                "posts__id": 10,
                "posts__body": "hello",
                "posts__created_at": "2024-03-01",
            })),
            row(json!({
                "accounts__id": 1,
                "accounts__email": "ann@example.com",
                "posts__id": 11,
                "posts__body": "again",
                "posts__created_at": "2024-02-01",
            })),
        ])
    })
    .unwrap();

    assert_eq!(
        data,
        json!([{
            "email": "ann@example.com",
            "posts": [{"body": "hello"}, {"body": "again"}],
        }])
    );
}

#[test]
fn test_computed_field_resolved_and_dependencies_stripped() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts")
        .select(FieldNode::new("email"))
        .select(FieldNode::new("full_name"));
    let request = QueryRequest::new(&field, "Account");

    let data = resolve(&schema, &request, &CompileOptions::new(), |sql| {
        // dependency columns are selected even though never requested
        assert!(sql.contains("\"accounts\".\"first_name\""));
        assert!(sql.contains("\"accounts\".\"last_name\""));
        Ok::<_, String>(vec![row(json!({
            "accounts__id": 1,
            "accounts__email": "ann@example.com",
            "accounts__first_name": "Ann",
            "accounts__last_name": "Example",
        }))])
    })
    .unwrap();

    assert_eq!(
        data,
        json!([{
            "email": "ann@example.com",
            "full_name": "Ann Example",
        }])
    );
}

#[test]
fn test_nested_pagination_envelope() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts").select(
        FieldNode::new("posts")
            .arg("limit", json!(2))
            .select(FieldNode::new("body")),
    );
    let request = QueryRequest::new(&field, "Account");

    let data = resolve(&schema, &request, &CompileOptions::new(), |sql| {
        // nested page bounds never reach the SQL
        assert!(!sql.contains("LIMIT"));
        Ok::<_, String>(vec![
            row(json!({
                "accounts__id": 1,
                "posts__id": 10,
                "posts__body": "newest",
                "posts__created_at": "2024-03-01",
            })),
            row(json!({
                "accounts__id": 1,
                "posts__id": 11,
                "posts__body": "middle",
                "posts__created_at": "2024-02-01",
            })),
            row(json!({
                "accounts__id": 1,
                "posts__id": 12,
                "posts__body": "oldest",
                "posts__created_at": "2024-01-01",
            })),
        ])
    })
    .unwrap();

    assert_eq!(
        data,
        json!([{
            "posts": {
                "nodes": [{"body": "newest"}, {"body": "middle"}],
                "page": {
                    "has_more": true,
                    "has_previous": false,
                    "start": {"created_at": "2024-03-01", "id": 10},
                    "end": {"created_at": "2024-02-01", "id": 11},
                },
            },
        }])
    );
}

#[test]
fn test_root_pagination_trims_probe_row() {
    let schema = Schema::new().object(
        "Account",
        ObjectMapping::new("accounts", &["id"])
            .column("email", "email_address")
            .order_by("id", SortDir::Asc)
            .paginated(),
    );
    let field = FieldNode::new("accounts")
        .arg("limit", json!(2))
        .select(FieldNode::new("email"));
    let request = QueryRequest::new(&field, "Account");

    let data = resolve(&schema, &request, &CompileOptions::new(), |sql| {
        assert!(sql.contains("LIMIT 3"));
        Ok::<_, String>(vec![
            row(json!({"accounts__id": 1, "accounts__email": "a@example.com"})),
            row(json!({"accounts__id": 2, "accounts__email": "b@example.com"})),
            row(json!({"accounts__id": 3, "accounts__email": "c@example.com"})),
        ])
    })
    .unwrap();

    let nodes = data["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(data["page"]["has_more"], json!(true));
    assert_eq!(data["page"]["has_previous"], json!(false));
    assert_eq!(data["page"]["end"], json!({"id": 2}));
}

#[test]
fn test_root_page_counts_parents_not_flat_rows() {
    let schema = Schema::new()
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
        );
    let field = FieldNode::new("accounts")
        .arg("limit", json!(2))
        .select(FieldNode::new("email"))
        .select(FieldNode::new("posts").select(FieldNode::new("body")));
    let request = QueryRequest::new(&field, "Account");

    let data = resolve(&schema, &request, &CompileOptions::new(), |sql| {
        // the bound sits inside the FROM subquery, not on the joined rowset
        assert!(sql.contains("LIMIT 3"));
        assert!(!sql.trim_end().ends_with("LIMIT 3"));
        // account 1 owns two posts, so the joined rowset has four rows for
        // three parents; a full page of two parents must still come back
        Ok::<_, String>(vec![
            row(json!({"accounts__id": 1, "accounts__email": "a@example.com",
                        "posts__id": 10, "posts__body": "one"})),
            row(json!({"accounts__id": 1, "accounts__email": "a@example.com",
                        "posts__id": 11, "posts__body": "two"})),
            row(json!({"accounts__id": 2, "accounts__email": "b@example.com",
                        "posts__id": 12, "posts__body": "three"})),
            row(json!({"accounts__id": 3, "accounts__email": "c@example.com",
                        "posts__id": 13, "posts__body": "four"})),
        ])
    })
    .unwrap();

    assert_eq!(
        data["nodes"],
        json!([
            {"email": "a@example.com", "posts": [{"body": "one"}, {"body": "two"}]},
            {"email": "b@example.com", "posts": [{"body": "three"}]},
        ])
    );
    assert_eq!(data["page"]["has_more"], json!(true));
    assert_eq!(data["page"]["end"], json!({"id": 2}));
}

#[test]
fn test_transport_error_passes_through() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts").select(FieldNode::new("email"));
    let request = QueryRequest::new(&field, "Account");

    let err = resolve(&schema, &request, &CompileOptions::new(), |_sql| {
        Err::<Vec<Row>, _>("connection refused".to_string())
    })
    .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::Transport(ref msg) if msg == "connection refused"
    ));
}

#[test]
fn test_compile_error_surfaces_through_resolve() {
    let schema = blog_schema();
    let field = FieldNode::new("accounts").select(FieldNode::new("nope"));
    let request = QueryRequest::new(&field, "Account");

    let err = resolve(&schema, &request, &CompileOptions::new(), |_sql| {
        Ok::<_, String>(Vec::new())
    })
    .unwrap_err();

    assert!(matches!(err, ResolveError::Compile(_)));
}
