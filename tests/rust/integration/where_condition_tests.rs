use relq::query_model::{QueryExpr, QueryModel};
use relq::ErrorCategory;
use serde_json::json;
use test_case::test_case;

use super::common::{check_query, translate};

fn cook(member: &str) -> QueryExpr {
    QueryExpr::source("c").member(member)
}

fn cooks_where(predicate: QueryExpr) -> QueryModel {
    QueryModel::from_table("c", "Cook")
        .where_clause(predicate)
        .select(cook("FirstName"))
}

#[test]
fn test_boolean_column() {
    check_query(
        &cooks_where(cook("IsFullTimeCook")),
        "SELECT [t0].[FirstName] FROM [CookTable] AS [t0] WHERE ([t0].[IsFullTimeCook] = 1)",
        &[],
    );
}

#[test_case(true, 1 ; "true literal")]
#[test_case(false, 0 ; "false literal")]
fn test_boolean_literal_is_parameterized(value: bool, parameter: i64) {
    check_query(
        &cooks_where(QueryExpr::constant(value)),
        "SELECT [t0].[FirstName] FROM [CookTable] AS [t0] WHERE (@1 = 1)",
        &[json!(parameter)],
    );
}

#[test]
fn test_binary_expression() {
    check_query(
        &cooks_where(QueryExpr::equal(cook("FirstName"), QueryExpr::constant("hugo"))),
        "SELECT [t0].[FirstName] FROM [CookTable] AS [t0] WHERE ([t0].[FirstName] = @1)",
        &[json!("hugo")],
    );
}

#[test]
fn test_constant_id() {
    check_query(
        &cooks_where(QueryExpr::equal(cook("ID"), QueryExpr::constant(5))),
        "SELECT [t0].[FirstName] FROM [CookTable] AS [t0] WHERE ([t0].[ID] = @1)",
        &[json!(5)],
    );
}

#[test]
fn test_successive_where_clauses_are_combined() {
    let query = cooks_where(cook("IsStarredCook"))
        .where_clause(QueryExpr::not(cook("IsFullTimeCook")));
    check_query(
        &query,
        "SELECT [t0].[FirstName] FROM [CookTable] AS [t0] \
         WHERE (([t0].[IsStarredCook] = 1) AND NOT ([t0].[IsFullTimeCook] = 1))",
        &[],
    );
}

#[test_case(QueryExpr::equal(cook("Name"), QueryExpr::null()), "([t0].[Name] IS NULL)" ; "equal null")]
#[test_case(QueryExpr::not_equal(QueryExpr::null(), cook("Name")), "([t0].[Name] IS NOT NULL)" ; "null not equal")]
fn test_null_comparison(predicate: QueryExpr, expected_condition: &str) {
    check_query(
        &cooks_where(predicate),
        &format!(
            "SELECT [t0].[FirstName] FROM [CookTable] AS [t0] WHERE {}",
            expected_condition
        ),
        &[],
    );
}

#[test]
fn test_entity_comparison_uses_primary_keys() {
    let query = QueryModel::from_table("c", "Cook")
        .additional_from_table("s", "Cook")
        .where_clause(QueryExpr::equal(QueryExpr::source("c"), QueryExpr::source("s")))
        .select(cook("FirstName"));
    check_query(
        &query,
        "SELECT [t0].[FirstName] FROM [CookTable] AS [t0] CROSS JOIN [CookTable] AS [t1] \
         WHERE ([t0].[ID] = [t1].[ID])",
        &[],
    );
}

#[test_case("StartsWith", "Hu", "Hu%" ; "starts with")]
#[test_case("EndsWith", "go", "%go" ; "ends with")]
#[test_case("Contains", "5%_", "%5[%][_]%" ; "contains escapes wildcards")]
fn test_string_methods_become_like(method: &str, argument: &str, pattern: &str) {
    let predicate = cook("FirstName").call(method, vec![QueryExpr::constant(argument)]);
    check_query(
        &cooks_where(predicate),
        "SELECT [t0].[FirstName] FROM [CookTable] AS [t0] WHERE ([t0].[FirstName] LIKE @1)",
        &[json!(pattern)],
    );
}

#[test]
fn test_sql_function_in_predicate() {
    let predicate = QueryExpr::equal(
        cook("Name").call("ToUpper", vec![]),
        QueryExpr::constant("MAIER"),
    );
    check_query(
        &cooks_where(predicate),
        "SELECT [t0].[FirstName] FROM [CookTable] AS [t0] WHERE (UPPER([t0].[Name]) = @1)",
        &[json!("MAIER")],
    );
}

#[test]
fn test_untranslatable_method_in_where_is_rejected() {
    let predicate = QueryExpr::static_call("IsLucky", vec![cook("ID")]);
    let err = translate(&cooks_where(predicate)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedConstruct);
    assert!(err.to_string().contains("'IsLucky'"));
}

#[test]
fn test_unmapped_member_is_rejected() {
    let err = translate(&cooks_where(cook("Salary"))).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedConstruct);
}

#[test]
fn test_unknown_source_is_unresolved() {
    let query = cooks_where(QueryExpr::equal(
        QueryExpr::source("x").member("ID"),
        QueryExpr::constant(1),
    ));
    let err = translate(&query).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnresolvedReference);
}

#[test]
fn test_join_clause() {
    let query = QueryModel::from_table("c", "Cook")
        .join_table(
            "k",
            "Kitchen",
            cook("KitchenID"),
            QueryExpr::source("k").member("ID"),
        )
        .select(QueryExpr::new_with_members(
            "CookKitchen",
            vec![
                ("FirstName", cook("FirstName")),
                ("Kitchen", QueryExpr::source("k").member("Name")),
            ],
        ));
    check_query(
        &query,
        "SELECT [t0].[FirstName] AS [FirstName],[t1].[Name] AS [Kitchen] FROM [CookTable] AS [t0] \
         INNER JOIN [KitchenTable] AS [t1] ON ([t0].[KitchenID] = [t1].[ID])",
        &[],
    );
}
