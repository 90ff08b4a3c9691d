//! Statement preparation.
//!
//! Walks one query model per nesting level and builds its [`SqlStatement`].
//! Clauses are applied in source order: the main source, body clauses, the
//! terminal projection, then each result operator.
//!
//! ```text
//! from c in Cooks                     sql_tables  [CookTable AS #0]
//! where c.Name == "Hugo"              where       #0.Name = "Hugo"
//! select c.FirstName                  projection  #0.FirstName
//! .First()                            top 1, SingleValue
//! ```
//!
//! Nested queries are prepared recursively in a child mapping scope and are
//! folded into the parent through the sub-statement integrator.

pub mod expression;
pub mod method_calls;
pub mod result_operators;

use std::sync::Arc;

use crate::catalog::MappingCatalog;
use crate::errors::TranslationError;
use crate::query_model::{BodyClause, FromClause, FromSource, QueryModel};
use crate::resolution::{
    convert_to_table, name_projection_for_table, resolve_sub_statement_reference, MappingKey,
    MappingResolutionContext, SingleRowCapPolicy,
};
use crate::statement_model::{
    BinaryOperator, DataInfo, OrderByItem, SqlEntity, SqlExpr, SqlStatement, SqlStatementBuilder,
    SqlTable, TableId, TableIdGenerator, TableInfo,
};

pub use expression::ExpressionPosition;
pub use method_calls::{MethodCallParts, MethodCallTransformer, MethodCallTransformerRegistry};

/// Per-statement preparation state.
#[derive(Debug, Default)]
struct PreparationState {
    builder: SqlStatementBuilder,
    /// Set once a grouped sub-query has been pulled up into this statement;
    /// later filters apply to groups and go to HAVING.
    filters_groups: bool,
}

pub struct StatementPreparer<'a> {
    catalog: &'a MappingCatalog,
    transformers: &'a MethodCallTransformerRegistry,
    cap_policy: SingleRowCapPolicy,
    table_ids: TableIdGenerator,
}

impl<'a> StatementPreparer<'a> {
    pub fn new(
        catalog: &'a MappingCatalog,
        transformers: &'a MethodCallTransformerRegistry,
        cap_policy: SingleRowCapPolicy,
    ) -> Self {
        StatementPreparer {
            catalog,
            transformers,
            cap_policy,
            table_ids: TableIdGenerator::new(),
        }
    }

    /// Prepares a top-level query in a fresh root scope.
    pub fn prepare(&mut self, model: &QueryModel) -> Result<Arc<SqlStatement>, TranslationError> {
        let mut ctx = MappingResolutionContext::new();
        self.prepare_query_model(model, &mut ctx)
    }

    pub fn prepare_query_model(
        &mut self,
        model: &QueryModel,
        ctx: &mut MappingResolutionContext<'_>,
    ) -> Result<Arc<SqlStatement>, TranslationError> {
        let mut state = PreparationState::default();

        self.add_from_clause(&model.main_from, true, &mut state, ctx)?;
        for clause in &model.body_clauses {
            self.add_body_clause(clause, &mut state, ctx)?;
        }

        let projection =
            self.resolve_expression(&model.select, ctx, ExpressionPosition::Projection)?;
        state.builder.data_info = Some(DataInfo::Sequence {
            item_type: projection.type_name(),
        });
        state.builder.select_projection = Some(projection);

        for operator in &model.result_operators {
            self.apply_result_operator(operator, &mut state.builder, ctx)?;
        }

        let statement = state.builder.build_shared()?;
        log::debug!(
            "Prepared statement over {} table(s), data info {:?}",
            statement.sql_tables.len(),
            statement.data_info
        );
        Ok(statement)
    }

    fn add_body_clause(
        &mut self,
        clause: &BodyClause,
        state: &mut PreparationState,
        ctx: &mut MappingResolutionContext<'_>,
    ) -> Result<(), TranslationError> {
        match clause {
            BodyClause::AdditionalFrom { clause } => {
                self.add_from_clause(clause, false, state, ctx)?;
            }
            BodyClause::Where { predicate } => {
                let condition = self.resolve_expression(predicate, ctx, ExpressionPosition::Sql)?;
                if state.filters_groups {
                    state.builder.add_having_condition(condition);
                } else {
                    state.builder.add_where_condition(condition);
                }
            }
            BodyClause::OrderBy { orderings } => {
                let items = orderings
                    .iter()
                    .map(|ordering| {
                        Ok(OrderByItem {
                            expression: self.resolve_expression(
                                &ordering.expr,
                                ctx,
                                ExpressionPosition::Sql,
                            )?,
                            order: ordering.order,
                        })
                    })
                    .collect::<Result<Vec<_>, TranslationError>>()?;
                state.builder.prepend_orderings(items);
            }
            BodyClause::Join {
                item_name,
                item_type,
                source,
                outer_key,
                inner_key,
            } => {
                let join = FromClause {
                    item_name: item_name.clone(),
                    item_type: item_type.clone(),
                    source: source.clone(),
                };
                self.add_from_clause(&join, false, state, ctx)?;

                let outer = self.resolve_expression(outer_key, ctx, ExpressionPosition::Sql)?;
                let inner = self.resolve_expression(inner_key, ctx, ExpressionPosition::Sql)?;
                let condition = self.resolve_binary(BinaryOperator::Equal, outer, inner)?;
                if let Some(table) = state.builder.sql_tables.last_mut() {
                    table.join_condition = Some(condition);
                }
            }
        }
        Ok(())
    }

    /// Adds the table for a from-clause item and maps the item name to the
    /// expression that stands for one of its rows.
    fn add_from_clause(
        &mut self,
        clause: &FromClause,
        is_main: bool,
        state: &mut PreparationState,
        ctx: &mut MappingResolutionContext<'_>,
    ) -> Result<(), TranslationError> {
        log::debug!(
            "Adding {} source `{}` ({})",
            if is_main { "main" } else { "additional" },
            clause.item_name,
            clause.item_type
        );

        match &clause.source {
            FromSource::Table { entity_type } => {
                let id = self.table_ids.next_id();
                let table = self.resolve_table(SqlTable::unresolved(id, entity_type.as_str()))?;
                let entity = self.entity_for_table(id, entity_type)?;
                state.builder.sql_tables.push(table);
                ctx.add_mapping(MappingKey::source(clause.item_name.as_str()), entity)?;
            }
            FromSource::SubQuery { query } => {
                let statement = {
                    let mut child = ctx.child();
                    self.prepare_query_model(query, &mut child)?
                };

                if is_main && state.builder.sql_tables.is_empty() && can_pull_up(&statement) {
                    log::debug!(
                        "Pulling grouped sub-query `{}` up into the enclosing statement",
                        clause.item_name
                    );
                    state.builder.sql_tables = statement.sql_tables.clone();
                    state.builder.where_condition = statement.where_condition.clone();
                    state.builder.group_by_expression = statement.group_by_expression.clone();
                    state.filters_groups = true;
                    ctx.add_mapping(
                        MappingKey::source(clause.item_name.as_str()),
                        statement.select_projection.clone(),
                    )?;
                    return Ok(());
                }

                let named = name_projection_for_table(&statement, ctx)?;
                let id = self.table_ids.next_id();
                let table = convert_to_table(&named, id, self.cap_policy)?;
                log::debug!(
                    "Sub-query `{}` becomes table {} ({:?} join{})",
                    clause.item_name,
                    id,
                    table.join_semantics,
                    if named.is_correlated() { ", correlated" } else { "" }
                );
                let reference = resolve_sub_statement_reference(&named.select_projection, id)?;
                state.builder.sql_tables.push(table);
                ctx.add_mapping(MappingKey::source(clause.item_name.as_str()), reference)?;
            }
        }
        Ok(())
    }

    /// Looks an unresolved table up in the catalog.
    pub fn resolve_table(&self, table: SqlTable) -> Result<SqlTable, TranslationError> {
        let TableInfo::Unresolved { entity_type } = &table.info else {
            return Ok(table);
        };
        let mapping = self.catalog.entity(entity_type).ok_or_else(|| {
            TranslationError::unsupported(format!(
                "The entity type '{}' is not mapped to a table.",
                entity_type
            ))
        })?;
        Ok(SqlTable {
            info: TableInfo::Resolved {
                table_name: mapping.table.clone(),
                entity_type: entity_type.clone(),
            },
            ..table
        })
    }

    fn entity_for_table(
        &self,
        table: TableId,
        entity_type: &str,
    ) -> Result<Arc<SqlExpr>, TranslationError> {
        let mapping = self.catalog.entity(entity_type).ok_or_else(|| {
            TranslationError::unsupported(format!(
                "The entity type '{}' is not mapped to a table.",
                entity_type
            ))
        })?;
        Ok(Arc::new(SqlExpr::Entity(SqlEntity {
            table,
            entity_type: entity_type.to_string(),
            name: None,
            columns: mapping.columns(),
            primary_key: mapping.primary_key.clone(),
        })))
    }
}

/// A grouped statement can be merged into the statement that selects from it
/// when nothing else restricts or reshapes the groups.
fn can_pull_up(statement: &SqlStatement) -> bool {
    matches!(statement.select_projection.as_ref(), SqlExpr::GroupingSelect(_))
        && statement.data_info.is_sequence()
        && statement.group_by_expression.is_some()
        && statement.having_condition.is_none()
        && statement.top_expression.is_none()
        && !statement.is_distinct
        && statement.set_operation_combinators.is_empty()
}
