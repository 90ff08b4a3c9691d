use relq::query_model::{QueryExpr, QueryModel, ResultOperator};
use relq::statement_model::{AggregateFunction, OrderByOrder};
use relq::ErrorCategory;
use serde_json::json;

use super::common::{check_query, cook_columns, translate};

fn cook(member: &str) -> QueryExpr {
    QueryExpr::source("c").member(member)
}

#[test]
fn test_first_in_where_condition() {
    let first_name = QueryModel::from_table("a", "Cook")
        .select(QueryExpr::source("a").member("FirstName"))
        .with_result_operator(ResultOperator::First {
            return_default_when_empty: false,
        });
    let query = QueryModel::from_table("c", "Cook")
        .where_clause(QueryExpr::equal(cook("Name"), QueryExpr::sub_query(first_name)))
        .select(cook("Name"));

    check_query(
        &query,
        "SELECT [t0].[Name] FROM [CookTable] AS [t0] WHERE ([t0].[Name] = \
         (SELECT TOP (@1) [t1].[FirstName] FROM [CookTable] AS [t1]))",
        &[json!(1)],
    );
}

#[test]
fn test_single_in_where_condition_keeps_sentinel_limit() {
    let kitchen_name = QueryModel::from_table("k", "Kitchen")
        .select(QueryExpr::source("k").member("Name"))
        .with_result_operator(ResultOperator::Single {
            return_default_when_empty: false,
        });
    let query = QueryModel::from_table("c", "Cook")
        .where_clause(QueryExpr::equal(cook("Name"), QueryExpr::sub_query(kitchen_name)))
        .select(cook("Name"));

    // A scalar sub-query keeps TOP 2 so the database reports a second row.
    check_query(
        &query,
        "SELECT [t0].[Name] FROM [CookTable] AS [t0] WHERE ([t0].[Name] = \
         (SELECT TOP (@1) [t1].[Name] FROM [KitchenTable] AS [t1]))",
        &[json!(2)],
    );
}

#[test]
fn test_count_in_where_condition() {
    let kitchen_count =
        QueryModel::from_table("k", "Kitchen").with_result_operator(ResultOperator::Count);
    let query = QueryModel::from_table("c", "Cook")
        .where_clause(QueryExpr::equal(cook("ID"), QueryExpr::sub_query(kitchen_count)))
        .select(cook("Name"));

    check_query(
        &query,
        "SELECT [t0].[Name] FROM [CookTable] AS [t0] WHERE ([t0].[ID] = \
         (SELECT COUNT(*) FROM [KitchenTable] AS [t1]))",
        &[],
    );
}

#[test]
fn test_count_in_select_projection() {
    let kitchen_count = QueryModel::from_table("k", "Kitchen")
        .select(QueryExpr::source("k").member("Name"))
        .with_result_operator(ResultOperator::Count);
    let query = QueryModel::from_table("c", "Cook").select(QueryExpr::sub_query(kitchen_count));

    check_query(
        &query,
        "SELECT (SELECT COUNT(*) FROM [KitchenTable] AS [t1]) FROM [CookTable] AS [t0]",
        &[],
    );
}

#[test]
fn test_sub_query_in_main_from_clause() {
    let limited = QueryModel::from_table("s2", "Cook").with_result_operator(ResultOperator::Take {
        count: QueryExpr::constant(1),
    });
    let query = QueryModel::from_sub_query("s", limited);

    check_query(
        &query,
        &format!(
            "SELECT {} FROM (SELECT TOP (@1) {} FROM [CookTable] AS [t1]) AS [q0]",
            cook_columns("q0"),
            cook_columns("t1")
        ),
        &[json!(1)],
    );
}

#[test]
fn test_sub_query_in_additional_from_clause() {
    let query = QueryModel::from_table("s", "Cook")
        .additional_from_sub_query("s2", QueryModel::from_table("s3", "Cook"))
        .select(QueryExpr::source("s").member("FirstName"));

    check_query(
        &query,
        &format!(
            "SELECT [t1].[FirstName] FROM [CookTable] AS [t1] CROSS APPLY \
             (SELECT {} FROM [CookTable] AS [t2]) AS [q0]",
            cook_columns("t2")
        ),
        &[],
    );
}

#[test]
fn test_correlated_sub_query_in_additional_from_clause() {
    let s3 = |member: &str| QueryExpr::source("s3").member(member);
    let correlated = QueryModel::from_table("s3", "Cook").where_clause(QueryExpr::and(
        QueryExpr::equal(s3("ID"), QueryExpr::source("s").member("ID")),
        QueryExpr::greater_than(s3("ID"), QueryExpr::constant(3)),
    ));
    let query = QueryModel::from_table("s", "Cook")
        .additional_from_sub_query("s2", correlated)
        .select(QueryExpr::source("s2").member("FirstName"));

    check_query(
        &query,
        &format!(
            "SELECT [q0].[FirstName] FROM [CookTable] AS [t1] CROSS APPLY \
             (SELECT {} FROM [CookTable] AS [t2] \
             WHERE (([t2].[ID] = [t1].[ID]) AND ([t2].[ID] > @1))) AS [q0]",
            cook_columns("t2")
        ),
        &[json!(3)],
    );
}

#[test]
fn test_first_or_default_in_additional_from_uses_outer_apply() {
    let first_cook = QueryModel::from_table("c2", "Cook")
        .where_clause(QueryExpr::equal(
            QueryExpr::source("c2").member("KitchenID"),
            QueryExpr::source("k").member("ID"),
        ))
        .select(QueryExpr::source("c2").member("FirstName"))
        .with_result_operator(ResultOperator::First {
            return_default_when_empty: true,
        });
    let query = QueryModel::from_table("k", "Kitchen")
        .additional_from_sub_query("c", first_cook)
        .select(QueryExpr::source("c"));

    check_query(
        &query,
        "SELECT [q0].[value] FROM [KitchenTable] AS [t1] OUTER APPLY \
         (SELECT TOP (@1) [t2].[FirstName] AS [value] FROM [CookTable] AS [t2] \
         WHERE ([t2].[KitchenID] = [t1].[ID])) AS [q0]",
        &[json!(1)],
    );
}

#[test]
fn test_collection_sub_query_in_select_projection_is_rejected() {
    let kitchen_names =
        QueryModel::from_table("k", "Kitchen").select(QueryExpr::source("k").member("Name"));
    let query = QueryModel::from_table("c", "Cook").select(QueryExpr::sub_query(kitchen_names));

    let err = translate(&query).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedShape);
    assert_eq!(
        err.to_string(),
        "Subquery selects a collection where a single value is expected."
    );
}

#[test]
fn test_sub_query_in_order_by_clause() {
    let kitchen_count =
        QueryModel::from_table("k", "Kitchen").with_result_operator(ResultOperator::Count);
    let query = QueryModel::from_table("c", "Cook")
        .order_by(QueryExpr::sub_query(kitchen_count), OrderByOrder::Asc)
        .select(cook("Name"));

    check_query(
        &query,
        "SELECT [t0].[Name] FROM [CookTable] AS [t0] \
         ORDER BY (SELECT COUNT(*) FROM [KitchenTable] AS [t1]) ASC",
        &[],
    );
}

#[test]
fn test_sub_query_in_sub_query() {
    let restaurant_count =
        QueryModel::from_table("r", "Restaurant").with_result_operator(ResultOperator::Count);
    let kitchen_count = QueryModel::from_table("k", "Kitchen")
        .where_clause(QueryExpr::equal(
            QueryExpr::source("k").member("ID"),
            QueryExpr::sub_query(restaurant_count),
        ))
        .with_result_operator(ResultOperator::Count);
    let query = QueryModel::from_table("c", "Cook")
        .where_clause(QueryExpr::equal(cook("ID"), QueryExpr::sub_query(kitchen_count)))
        .select(cook("Name"));

    check_query(
        &query,
        "SELECT [t0].[Name] FROM [CookTable] AS [t0] WHERE ([t0].[ID] = \
         (SELECT COUNT(*) FROM [KitchenTable] AS [t1] WHERE ([t1].[ID] = \
         (SELECT COUNT(*) FROM [RestaurantTable] AS [t2]))))",
        &[],
    );
}

#[test]
fn test_grouped_count_sub_query_in_where_is_scalar() {
    let cooks_per_name = QueryModel::from_table("c", "Cook")
        .where_clause(QueryExpr::equal(cook("KitchenID"), QueryExpr::source("k").member("ID")))
        .with_result_operator(ResultOperator::GroupBy {
            key: cook("Name"),
            element: QueryExpr::source("c"),
        })
        .with_result_operator(ResultOperator::Count);
    let query = QueryModel::from_table("k", "Kitchen")
        .where_clause(QueryExpr::equal(
            QueryExpr::source("k").member("ID"),
            QueryExpr::sub_query(cooks_per_name),
        ))
        .select(QueryExpr::source("k").member("Name"));

    check_query(
        &query,
        "SELECT [t1].[Name] FROM [KitchenTable] AS [t1] WHERE ([t1].[ID] = \
         (SELECT COUNT(*) FROM (SELECT [t2].[Name] AS [key] FROM [CookTable] AS [t2] \
         WHERE ([t2].[KitchenID] = [t1].[ID]) GROUP BY [t2].[Name]) AS [q0]))",
        &[],
    );
}

#[test]
fn test_constructor_projection_of_main_from_sub_query() {
    let pairs = QueryModel::from_table("k", "Kitchen").select(QueryExpr::new_with_members(
        "KitchenInfo",
        vec![
            ("ID", QueryExpr::source("k").member("ID")),
            ("Name", QueryExpr::source("k").member("Name")),
        ],
    ));
    let query = QueryModel::from_sub_query("x", pairs).select(QueryExpr::source("x").member("Name"));

    check_query(
        &query,
        "SELECT [q0].[Name] FROM (SELECT [t1].[ID] AS [ID],[t1].[Name] AS [Name] \
         FROM [KitchenTable] AS [t1]) AS [q0]",
        &[],
    );
}

#[test]
fn test_grouped_sub_query_in_main_from_is_pulled_up() {
    let grouped = QueryModel::from_table("c", "Cook").with_result_operator(ResultOperator::GroupBy {
        key: cook("Name"),
        element: QueryExpr::source("c"),
    });
    let query = QueryModel::from_sub_query("g", grouped)
        .where_clause(QueryExpr::greater_than(
            QueryExpr::aggregate(AggregateFunction::Count, QueryExpr::source("g")),
            QueryExpr::constant(1),
        ))
        .select(QueryExpr::new_with_members(
            "NameCount",
            vec![
                ("Key", QueryExpr::source("g").member("Key")),
                (
                    "Count",
                    QueryExpr::aggregate(AggregateFunction::Count, QueryExpr::source("g")),
                ),
            ],
        ));

    check_query(
        &query,
        "SELECT [t0].[Name] AS [Key],COUNT(*) AS [Count] FROM [CookTable] AS [t0] \
         GROUP BY [t0].[Name] HAVING (COUNT(*) > @1)",
        &[json!(1)],
    );
}
