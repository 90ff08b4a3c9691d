use relq::query_model::{QueryExpr, QueryModel, ResultOperator};
use serde_json::json;

use super::common::{check_query, cook_columns};

const FIRST_HUGO: &str = r#"{
  "main_from": { "item_name": "c", "item_type": "Cook",
                 "source": { "kind": "Table", "entity_type": "Cook" } },
  "body_clauses": [
    { "kind": "Where", "predicate": { "kind": "Binary", "operator": "Equal",
      "left":  { "kind": "Member", "expr": { "kind": "SourceRef", "name": "c" }, "member": "Name" },
      "right": { "kind": "Constant", "value": "Hugo" } } }
  ],
  "select": { "kind": "SourceRef", "name": "c" },
  "result_operators": [ { "kind": "First" } ]
}"#;

#[test]
fn test_deserialized_model_translates() {
    let query: QueryModel = serde_json::from_str(FIRST_HUGO).unwrap();
    check_query(
        &query,
        &format!(
            "SELECT TOP (@1) {} FROM [CookTable] AS [t0] WHERE ([t0].[Name] = @2)",
            cook_columns("t0")
        ),
        &[json!(1), json!("Hugo")],
    );
}

#[test]
fn test_deserialized_model_matches_builder() {
    let query: QueryModel = serde_json::from_str(FIRST_HUGO).unwrap();
    let built = QueryModel::from_table("c", "Cook")
        .where_clause(QueryExpr::equal(
            QueryExpr::source("c").member("Name"),
            QueryExpr::constant("Hugo"),
        ))
        .with_result_operator(ResultOperator::First {
            return_default_when_empty: false,
        });
    assert_eq!(query, built);
}

#[test]
fn test_optional_fields_take_defaults() {
    let query: QueryModel = serde_json::from_value(json!({
        "main_from": { "item_name": "k", "item_type": "Kitchen",
                       "source": { "kind": "Table", "entity_type": "Kitchen" } },
        "body_clauses": [
            { "kind": "OrderBy", "orderings": [
                { "expr": { "kind": "Member", "expr": { "kind": "SourceRef", "name": "k" }, "member": "Name" } }
            ] }
        ],
        "select": { "kind": "Member", "expr": { "kind": "SourceRef", "name": "k" }, "member": "ID" }
    }))
    .unwrap();
    assert!(query.result_operators.is_empty());
    check_query(
        &query,
        "SELECT [t0].[ID] FROM [KitchenTable] AS [t0] ORDER BY [t0].[Name] ASC",
        &[],
    );
}

#[test]
fn test_null_and_boolean_constants() {
    let query: QueryModel = serde_json::from_value(json!({
        "main_from": { "item_name": "c", "item_type": "Cook",
                       "source": { "kind": "Table", "entity_type": "Cook" } },
        "body_clauses": [
            { "kind": "Where", "predicate": { "kind": "Binary", "operator": "NotEqual",
              "left": { "kind": "Member", "expr": { "kind": "SourceRef", "name": "c" }, "member": "Name" },
              "right": { "kind": "Constant", "value": null } } },
            { "kind": "Where", "predicate": { "kind": "Binary", "operator": "Equal",
              "left": { "kind": "Member", "expr": { "kind": "SourceRef", "name": "c" }, "member": "IsStarredCook" },
              "right": { "kind": "Constant", "value": true } } }
        ],
        "select": { "kind": "Member", "expr": { "kind": "SourceRef", "name": "c" }, "member": "ID" }
    }))
    .unwrap();
    check_query(
        &query,
        "SELECT [t0].[ID] FROM [CookTable] AS [t0] \
         WHERE (([t0].[Name] IS NOT NULL) AND ([t0].[IsStarredCook] = @1))",
        &[json!(1)],
    );
}

#[test]
fn test_unknown_kind_is_rejected() {
    let result: Result<QueryModel, _> = serde_json::from_value(json!({
        "main_from": { "item_name": "c", "item_type": "Cook",
                       "source": { "kind": "View", "entity_type": "Cook" } },
        "select": { "kind": "SourceRef", "name": "c" }
    }));
    assert!(result.is_err());
}
