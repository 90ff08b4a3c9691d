use relq::query_model::{QueryExpr, QueryModel, ResultOperator};
use relq::statement_model::OrderByOrder;
use relq::ErrorCategory;
use serde_json::json;

use super::common::{check_query, translate};

fn customers_in(city: &str) -> QueryModel {
    QueryModel::from_table("c", "Customer").where_clause(QueryExpr::equal(
        QueryExpr::source("c").member("City"),
        QueryExpr::constant(city),
    ))
}

fn city() -> QueryExpr {
    QueryExpr::source("c").member("City")
}

#[test]
fn test_union_of_filtered_entities() {
    let query = customers_in("London").with_result_operator(ResultOperator::Union {
        query: Box::new(customers_in("Berlin")),
    });
    check_query(
        &query,
        "SELECT [t0].[ID],[t0].[Name],[t0].[City] FROM [CustomerTable] AS [t0] \
         WHERE ([t0].[City] = @1) UNION (SELECT [t1].[ID],[t1].[Name],[t1].[City] \
         FROM [CustomerTable] AS [t1] WHERE ([t1].[City] = @2))",
        &[json!("London"), json!("Berlin")],
    );
}

#[test]
fn test_concat_keeps_duplicates() {
    let query = customers_in("London")
        .select(city())
        .with_result_operator(ResultOperator::Concat {
            query: Box::new(customers_in("Berlin").select(city())),
        });
    check_query(
        &query,
        "SELECT [t0].[City] FROM [CustomerTable] AS [t0] WHERE ([t0].[City] = @1) \
         UNION ALL (SELECT [t1].[City] FROM [CustomerTable] AS [t1] WHERE ([t1].[City] = @2))",
        &[json!("London"), json!("Berlin")],
    );
}

#[test]
fn test_union_after_take_wraps_left_side() {
    let query = QueryModel::from_table("c", "Customer")
        .select(city())
        .with_result_operator(ResultOperator::Take {
            count: QueryExpr::constant(2),
        })
        .with_result_operator(ResultOperator::Union {
            query: Box::new(QueryModel::from_table("c", "Customer").select(city())),
        });
    check_query(
        &query,
        "SELECT [q0].[value] FROM (SELECT TOP (@1) [t1].[City] AS [value] \
         FROM [CustomerTable] AS [t1]) AS [q0] \
         UNION (SELECT [t2].[City] FROM [CustomerTable] AS [t2])",
        &[json!(2)],
    );
}

#[test]
fn test_orderings_without_limit_are_dropped_from_both_sides() {
    let ordered = |name: &str| {
        customers_in(name)
            .order_by(QueryExpr::source("c").member("Name"), OrderByOrder::Asc)
            .select(city())
    };
    let query = ordered("London").with_result_operator(ResultOperator::Union {
        query: Box::new(ordered("Berlin")),
    });
    check_query(
        &query,
        "SELECT [t0].[City] FROM [CustomerTable] AS [t0] WHERE ([t0].[City] = @1) \
         UNION (SELECT [t1].[City] FROM [CustomerTable] AS [t1] WHERE ([t1].[City] = @2))",
        &[json!("London"), json!("Berlin")],
    );
}

#[test]
fn test_count_over_union_wraps_combined_statement() {
    let query = customers_in("London")
        .with_result_operator(ResultOperator::Union {
            query: Box::new(customers_in("Berlin")),
        })
        .with_result_operator(ResultOperator::Count);
    check_query(
        &query,
        "SELECT COUNT(*) FROM (SELECT [t1].[ID],[t1].[Name],[t1].[City] \
         FROM [CustomerTable] AS [t1] WHERE ([t1].[City] = @1) \
         UNION (SELECT [t2].[ID],[t2].[Name],[t2].[City] FROM [CustomerTable] AS [t2] \
         WHERE ([t2].[City] = @2))) AS [q0]",
        &[json!("London"), json!("Berlin")],
    );
}

#[test]
fn test_in_memory_projection_with_concat_is_rejected() {
    let in_memory = |name: &str| {
        customers_in(name).select(QueryExpr::static_call("SomeMethod", vec![city()]))
    };
    let query = in_memory("London").with_result_operator(ResultOperator::Concat {
        query: Box::new(in_memory("Berlin")),
    });

    let err = translate(&query).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedConstruct);
    let message = err.to_string();
    assert!(message
        .starts_with("In-memory method calls are not supported when a set operation (such as Union or Concat) is used."));
    assert!(message.contains(
        "SomeOrders.Select (o => o.ID).Concat (OtherOrders.Select (o => o.ID)).Select (i => SomeMethod (i))"
    ));
}

#[test]
fn test_in_memory_call_on_right_side_only_is_rejected() {
    let query = customers_in("London")
        .select(city())
        .with_result_operator(ResultOperator::Union {
            query: Box::new(
                customers_in("Berlin").select(QueryExpr::static_call("SomeMethod", vec![city()])),
            ),
        });
    let err = translate(&query).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedConstruct);
}
