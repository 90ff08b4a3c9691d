//! Folding nested statements into their enclosing statement.
//!
//! A nested statement ends up either as a table (main or additional source,
//! or the inner side of a wrapping step) or as a scalar sub-expression. Outer
//! references into a sub-statement table are rebuilt against the table's
//! output columns by [`resolve_sub_statement_reference`].

use std::sync::Arc;

use super::context::MappingResolutionContext;
use super::named_expression_combiner::NamedExpressionCombiner;
use crate::errors::TranslationError;
use crate::statement_model::{
    ConvertExpr, DataInfo, EntityColumn, ExprRef, JoinSemantics, NewExpr, SqlEntity, SqlExpr,
    SqlLiteral, SqlStatement, SqlStatementBuilder, SqlTable, TableId, TableInfo,
    DEFAULT_VALUE_NAME,
};

/// How the row limit of a single-value statement is rewritten when the
/// statement becomes a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleRowCapPolicy {
    /// Always request exactly one row.
    Uniform,
    /// Only a sentinel limit greater than one (set to detect surplus rows) is
    /// lowered to one; any other limit is kept as is.
    PreserveSentinel,
}

pub const COLLECTION_IN_SCALAR_POSITION: &str =
    "Subquery selects a collection where a single value is expected.";

/// Converts `statement` into a table with id `table_id`.
///
/// `SingleValue` statements that materialize a default when empty join with
/// `Left` semantics; everything else joins `Inner`.
pub fn convert_to_table(
    statement: &Arc<SqlStatement>,
    table_id: TableId,
    policy: SingleRowCapPolicy,
) -> Result<SqlTable, TranslationError> {
    let join_semantics = match &statement.data_info {
        DataInfo::SingleValue {
            return_default_when_empty: true,
            ..
        } => JoinSemantics::Left,
        _ => JoinSemantics::Inner,
    };

    let sequence = match &statement.data_info {
        DataInfo::Sequence { .. } => statement.clone(),
        DataInfo::SingleValue { data_type, .. } | DataInfo::Value { data_type } => {
            if !statement.set_operation_combinators.is_empty() {
                return Err(TranslationError::UnsupportedShape(format!(
                    "A {} statement combined with a set operation cannot be used as a table.",
                    shape_name(&statement.data_info)
                )));
            }
            Arc::new(convert_value_statement_to_sequence(
                statement, data_type, policy,
            )?)
        }
    };

    if sequence.select_projection.contains_in_memory_call() {
        return Err(TranslationError::unsupported(
            "A sub-query projection calls a method that cannot be translated to SQL. \
             Move the method call into the outermost projection.",
        ));
    }

    log::debug!(
        "convert_to_table: {} sub-statement as table {} ({:?})",
        shape_name(&statement.data_info),
        table_id,
        join_semantics
    );

    Ok(SqlTable {
        id: table_id,
        info: TableInfo::SubStatement(without_unlimited_orderings(sequence)?),
        join_semantics,
        join_condition: None,
    })
}

fn convert_value_statement_to_sequence(
    statement: &SqlStatement,
    data_type: &str,
    policy: SingleRowCapPolicy,
) -> Result<SqlStatement, TranslationError> {
    let mut builder = SqlStatementBuilder::from_statement(statement);
    builder.data_info = Some(DataInfo::Sequence {
        item_type: data_type.to_string(),
    });

    if let DataInfo::SingleValue { .. } = statement.data_info {
        let capped = match policy {
            SingleRowCapPolicy::Uniform => true,
            SingleRowCapPolicy::PreserveSentinel => matches!(
                statement.top_expression.as_deref(),
                Some(SqlExpr::Literal(SqlLiteral::Integer(n))) if *n > 1
            ),
        };
        if capped {
            builder.top_expression = Some(SqlExpr::literal(SqlLiteral::Integer(1)));
        }
    }

    Ok(builder.get_sql_statement()?)
}

/// Leaves `statement` as a scalar sub-expression of its enclosing statement.
pub fn convert_to_scalar(statement: Arc<SqlStatement>) -> Result<ExprRef, TranslationError> {
    if statement.data_info.is_sequence() {
        return Err(TranslationError::UnsupportedShape(
            COLLECTION_IN_SCALAR_POSITION.to_string(),
        ));
    }
    if statement.select_projection.contains_in_memory_call() {
        return Err(TranslationError::unsupported(
            "A scalar sub-query calls a method that cannot be translated to SQL.",
        ));
    }
    // EXISTS/IN statements carry no source of their own; inline them.
    if statement.is_projection_only() {
        return Ok(statement.select_projection.clone());
    }
    Ok(Arc::new(SqlExpr::SubStatement(without_unlimited_orderings(
        statement,
    )?)))
}

/// A nested statement may only be ordered when it is also limited.
pub fn without_unlimited_orderings(
    statement: Arc<SqlStatement>,
) -> Result<Arc<SqlStatement>, TranslationError> {
    if statement.orderings.is_empty() || statement.top_expression.is_some() {
        return Ok(statement);
    }
    log::debug!("Dropping orderings of a nested statement without a row limit");
    let mut builder = SqlStatementBuilder::from_statement(&statement);
    builder.orderings.clear();
    Ok(builder.build_shared()?)
}

/// Names the projection of `statement` so each of its outputs has a column
/// alias once the statement is used as a table.
pub fn name_projection_for_table(
    statement: &SqlStatement,
    ctx: &mut MappingResolutionContext<'_>,
) -> Result<Arc<SqlStatement>, TranslationError> {
    let wrapped = SqlExpr::named(None, statement.select_projection.clone());
    let named = NamedExpressionCombiner::new(ctx).process_names(&wrapped)?;

    let mut builder = SqlStatementBuilder::from_statement(statement);
    builder.select_projection = Some(named);
    Ok(builder.build_shared()?)
}

/// Rebuilds a (named) sub-statement projection as seen from outside, i.e. as
/// columns of the sub-statement table `table`.
pub fn resolve_sub_statement_reference(
    projection: &ExprRef,
    table: TableId,
) -> Result<ExprRef, TranslationError> {
    match projection.as_ref() {
        SqlExpr::Entity(entity) => {
            let columns = entity
                .columns
                .iter()
                .map(|column| EntityColumn {
                    property: column.property.clone(),
                    column: entity.output_name(column),
                    data_type: column.data_type.clone(),
                })
                .collect();
            Ok(Arc::new(SqlExpr::Entity(SqlEntity {
                table,
                entity_type: entity.entity_type.clone(),
                name: None,
                columns,
                primary_key: entity.primary_key.clone(),
            })))
        }
        SqlExpr::Named(named) => Ok(SqlExpr::column(
            table,
            named.name.as_deref().unwrap_or(DEFAULT_VALUE_NAME),
            named.expression.type_name(),
        )),
        SqlExpr::New(new) => {
            let args = new
                .args
                .iter()
                .map(|arg| resolve_sub_statement_reference(arg, table))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Arc::new(SqlExpr::New(NewExpr {
                type_name: new.type_name.clone(),
                args,
                members: new.members.clone(),
            })))
        }
        SqlExpr::Convert(conv) => Ok(Arc::new(SqlExpr::Convert(ConvertExpr {
            operand: resolve_sub_statement_reference(&conv.operand, table)?,
            target_type: conv.target_type.clone(),
            checked: conv.checked,
            method: conv.method.clone(),
        }))),
        SqlExpr::GroupingSelect(_) => Err(TranslationError::unsupported(
            "A grouped sub-query can only be used as the main source of a query that \
             does not limit, order or combine the groups. Apply Take, OrderBy or set \
             operations to the outer query instead.",
        )),
        SqlExpr::MethodCall(call) => Err(TranslationError::unsupported(format!(
            "The result of method '{}' cannot be read back from a sub-query.",
            call.method
        ))),
        _ => Ok(SqlExpr::column(
            table,
            DEFAULT_VALUE_NAME,
            projection.type_name(),
        )),
    }
}

fn shape_name(info: &DataInfo) -> &'static str {
    match info {
        DataInfo::Value { .. } => "Value",
        DataInfo::SingleValue { .. } => "SingleValue",
        DataInfo::Sequence { .. } => "Sequence",
    }
}
