//! Result operators.
//!
//! Each operator edits the statement under construction. When an operator
//! cannot be expressed on the statement as it stands (for example `Count`
//! after `Take`), the statement is first moved into a sub-statement table and
//! the operator is applied to a new statement that selects from it:
//!
//! ```text
//! (from c in Cooks select c).Take(5).Count()
//! → SELECT COUNT(*) FROM (SELECT TOP (@1) ... FROM [CookTable] AS [t1]) AS [q0]
//! ```

use std::sync::Arc;

use super::{ExpressionPosition, StatementPreparer};
use crate::errors::TranslationError;
use crate::query_model::{QueryModel, ResultOperator};
use crate::resolution::{
    convert_to_table, name_projection_for_table, resolve_sub_statement_reference,
    without_unlimited_orderings, MappingResolutionContext,
};
use crate::statement_model::errors::StatementModelError;
use crate::statement_model::{
    AggregateFunction, AggregationExpr, DataInfo, ExprRef, GroupingSelectExpr, InExpr,
    SetOperation, SetOperationCombinator, SqlExpr, SqlLiteral, SqlStatementBuilder, BOOLEAN_TYPE,
};

impl<'a> StatementPreparer<'a> {
    pub fn apply_result_operator(
        &mut self,
        operator: &ResultOperator,
        builder: &mut SqlStatementBuilder,
        ctx: &mut MappingResolutionContext<'_>,
    ) -> Result<(), TranslationError> {
        log::debug!("Applying result operator {}", operator.name());

        match operator {
            ResultOperator::First {
                return_default_when_empty,
            } => self.apply_single_row(builder, ctx, 1, *return_default_when_empty),
            // Two rows are requested so that a second row can be detected.
            ResultOperator::Single {
                return_default_when_empty,
            } => self.apply_single_row(builder, ctx, 2, *return_default_when_empty),
            ResultOperator::Take { count } => {
                if builder.top_expression.is_some() || builder.has_set_operations() {
                    self.wrap_in_sub_statement(builder, ctx, true)?;
                }
                builder.top_expression =
                    Some(self.resolve_expression(count, ctx, ExpressionPosition::Sql)?);
                Ok(())
            }
            ResultOperator::Distinct => {
                if builder.top_expression.is_some() || builder.has_set_operations() {
                    self.wrap_in_sub_statement(builder, ctx, true)?;
                }
                builder.is_distinct = true;
                Ok(())
            }
            ResultOperator::Count => {
                self.wrap_for_aggregation(builder, ctx, false)?;
                builder.select_projection = Some(Arc::new(SqlExpr::Aggregation(AggregationExpr {
                    function: AggregateFunction::Count,
                    argument: None,
                })));
                builder.orderings.clear();
                builder.data_info = Some(DataInfo::Value {
                    data_type: "int".to_string(),
                });
                Ok(())
            }
            ResultOperator::Sum => self.apply_aggregation(builder, ctx, AggregateFunction::Sum),
            ResultOperator::Min => self.apply_aggregation(builder, ctx, AggregateFunction::Min),
            ResultOperator::Max => self.apply_aggregation(builder, ctx, AggregateFunction::Max),
            ResultOperator::Average => {
                self.apply_aggregation(builder, ctx, AggregateFunction::Average)
            }
            ResultOperator::Any => {
                let inner = without_unlimited_orderings(builder.build_shared()?)?;
                *builder = value_statement(Arc::new(SqlExpr::Exists(inner)));
                Ok(())
            }
            ResultOperator::Contains { item } => {
                let item = self.resolve_expression(item, ctx, ExpressionPosition::Sql)?;
                let item = comparable_value(&item)?;
                let projection = builder
                    .select_projection
                    .clone()
                    .ok_or(StatementModelError::MissingSelectProjection)?;
                builder.select_projection = Some(comparable_value(&projection)?);
                let statement = without_unlimited_orderings(builder.build_shared()?)?;
                *builder = value_statement(Arc::new(SqlExpr::In(InExpr { item, statement })));
                Ok(())
            }
            ResultOperator::GroupBy { key, element } => {
                if builder.top_expression.is_some()
                    || builder.is_distinct
                    || builder.has_set_operations()
                    || builder.is_grouped()
                {
                    return Err(TranslationError::unsupported(
                        "GroupBy cannot follow Take, First, Single, Distinct, a set operation or \
                         another GroupBy. Apply the grouping before those operators.",
                    ));
                }
                let key = self.resolve_expression(key, ctx, ExpressionPosition::Sql)?;
                let element = self.resolve_expression(element, ctx, ExpressionPosition::Sql)?;
                let grouping = Arc::new(SqlExpr::GroupingSelect(GroupingSelectExpr {
                    key: SqlExpr::named(Some("key".to_string()), key.clone()),
                    element: SqlExpr::named(Some("element".to_string()), element),
                    aggregations: Vec::new(),
                }));
                builder.data_info = Some(DataInfo::Sequence {
                    item_type: grouping.type_name(),
                });
                builder.select_projection = Some(grouping);
                builder.group_by_expression = Some(key);
                builder.orderings.clear();
                Ok(())
            }
            ResultOperator::Union { query } => {
                self.apply_set_operation(builder, ctx, SetOperation::Union, query)
            }
            ResultOperator::Concat { query } => {
                self.apply_set_operation(builder, ctx, SetOperation::Concat, query)
            }
        }
    }

    fn apply_single_row(
        &mut self,
        builder: &mut SqlStatementBuilder,
        ctx: &mut MappingResolutionContext<'_>,
        top: i64,
        return_default_when_empty: bool,
    ) -> Result<(), TranslationError> {
        if builder.top_expression.is_some() || builder.has_set_operations() {
            self.wrap_in_sub_statement(builder, ctx, true)?;
        }
        builder.top_expression = Some(SqlExpr::literal(SqlLiteral::Integer(top)));
        builder.data_info = Some(DataInfo::SingleValue {
            data_type: element_type(builder),
            return_default_when_empty,
        });
        Ok(())
    }

    fn apply_aggregation(
        &mut self,
        builder: &mut SqlStatementBuilder,
        ctx: &mut MappingResolutionContext<'_>,
        function: AggregateFunction,
    ) -> Result<(), TranslationError> {
        self.wrap_for_aggregation(builder, ctx, true)?;
        let projection = builder
            .select_projection
            .clone()
            .ok_or(StatementModelError::MissingSelectProjection)?;
        let argument = SqlExpr::unwrap_named(&projection).clone();
        match argument.as_ref() {
            SqlExpr::Entity(_)
            | SqlExpr::New(_)
            | SqlExpr::GroupingSelect(_)
            | SqlExpr::MethodCall(_) => {
                return Err(TranslationError::unsupported(format!(
                    "{} can only be applied to a query that selects a single value, not '{}'.",
                    function.sql_name(),
                    argument.type_name()
                )))
            }
            _ => {}
        }

        let aggregation = Arc::new(SqlExpr::Aggregation(AggregationExpr {
            function,
            argument: Some(argument),
        }));
        builder.data_info = Some(DataInfo::Value {
            data_type: aggregation.type_name(),
        });
        builder.select_projection = Some(aggregation);
        builder.orderings.clear();
        Ok(())
    }

    fn wrap_for_aggregation(
        &mut self,
        builder: &mut SqlStatementBuilder,
        ctx: &mut MappingResolutionContext<'_>,
        needs_projection: bool,
    ) -> Result<(), TranslationError> {
        if builder.top_expression.is_some()
            || builder.is_distinct
            || builder.is_grouped()
            || builder.has_set_operations()
        {
            self.wrap_in_sub_statement(builder, ctx, needs_projection)?;
        }
        Ok(())
    }

    fn apply_set_operation(
        &mut self,
        builder: &mut SqlStatementBuilder,
        ctx: &mut MappingResolutionContext<'_>,
        operation: SetOperation,
        query: &QueryModel,
    ) -> Result<(), TranslationError> {
        let right = {
            let mut sibling = match ctx.parent() {
                Some(parent) => parent.child(),
                None => MappingResolutionContext::new(),
            };
            self.prepare_query_model(query, &mut sibling)?
        };

        let left_in_memory = builder
            .select_projection
            .as_ref()
            .is_some_and(|p| p.contains_in_memory_call());
        if left_in_memory || right.select_projection.contains_in_memory_call() {
            return Err(TranslationError::unsupported(in_memory_set_operation_message()));
        }

        // TOP with ORDER BY must stay together inside its own derived table.
        if builder.top_expression.is_some() {
            self.wrap_in_sub_statement(builder, ctx, true)?;
        }
        builder.orderings.clear();

        let right = if right.top_expression.is_none() && !right.orderings.is_empty() {
            let mut right_builder = SqlStatementBuilder::from_statement(&right);
            right_builder.orderings.clear();
            right_builder.build_shared()?
        } else {
            right
        };

        log::debug!("Combining statement with {:?}", operation);
        builder.set_operation_combinators.push(SetOperationCombinator {
            operation,
            statement: right,
        });
        Ok(())
    }

    /// Moves the statement built so far into a sub-statement table and
    /// restarts `builder` as a statement selecting from it.
    pub fn wrap_in_sub_statement(
        &mut self,
        builder: &mut SqlStatementBuilder,
        ctx: &mut MappingResolutionContext<'_>,
        needs_projection: bool,
    ) -> Result<(), TranslationError> {
        let statement = builder.get_sql_statement()?;
        let named = name_projection_for_table(&statement, ctx)?;
        let table_id = self.table_ids.next_id();
        let table = convert_to_table(&named, table_id, self.cap_policy)?;

        // Callers that replace the projection right away never read the
        // reference, and some projections (groupings) cannot be read back.
        let projection = if needs_projection {
            resolve_sub_statement_reference(&named.select_projection, table_id)?
        } else {
            SqlExpr::literal(SqlLiteral::Null)
        };

        log::debug!("Wrapped statement into sub-statement table {}", table_id);
        let mut wrapped = SqlStatementBuilder::new();
        wrapped.data_info = Some(DataInfo::Sequence {
            item_type: named.data_info.element_type().to_string(),
        });
        wrapped.sql_tables.push(table);
        wrapped.select_projection = Some(projection);
        *builder = wrapped;
        Ok(())
    }
}

fn element_type(builder: &SqlStatementBuilder) -> String {
    match (&builder.data_info, &builder.select_projection) {
        (Some(info), _) => info.element_type().to_string(),
        (None, Some(projection)) => projection.type_name(),
        (None, None) => "object".to_string(),
    }
}

/// A statement with no tables that yields one boolean.
fn value_statement(projection: ExprRef) -> SqlStatementBuilder {
    let mut builder = SqlStatementBuilder::new();
    builder.select_projection = Some(projection);
    builder.data_info = Some(DataInfo::Value {
        data_type: BOOLEAN_TYPE.to_string(),
    });
    builder
}

/// Entities take part in IN lists through their primary key.
fn comparable_value(expr: &ExprRef) -> Result<ExprRef, TranslationError> {
    match SqlExpr::unwrap_named(expr).as_ref() {
        SqlExpr::Entity(entity) => entity
            .primary_key_column()
            .map(|column| Arc::new(SqlExpr::Column(column)))
            .ok_or_else(|| {
                TranslationError::unsupported(format!(
                    "The entity type '{}' has no primary key column to compare.",
                    entity.entity_type
                ))
            }),
        SqlExpr::New(_) | SqlExpr::GroupingSelect(_) | SqlExpr::MethodCall(_) => {
            Err(TranslationError::unsupported(
                "Contains can only compare single values or entities.",
            ))
        }
        _ => Ok(SqlExpr::unwrap_named(expr).clone()),
    }
}

fn in_memory_set_operation_message() -> String {
    [
        "In-memory method calls are not supported when a set operation (such as Union or Concat) is used. \
         Rewrite the query to perform the in-memory operation after the set operation has been performed.",
        "For example, instead of the following query:",
        "    SomeOrders.Select (o => SomeMethod (o.ID)).Concat (OtherOrders.Select (o => SomeMethod (o.ID)))",
        "Try the following query:",
        "    SomeOrders.Select (o => o.ID).Concat (OtherOrders.Select (o => o.ID)).Select (i => SomeMethod (i))",
    ]
    .join("\n")
}
