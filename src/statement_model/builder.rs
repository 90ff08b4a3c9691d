//! SqlStatement builder.
//!
//! Statements are immutable once built. A stage that needs a variation of an
//! existing statement copies it into a builder, edits the builder, and builds a
//! new statement.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = SqlStatementBuilder::from_statement(&statement);
//! builder.add_where_condition(predicate);
//! let filtered = builder.get_sql_statement()?;
//! ```

use std::sync::Arc;

use super::{
    errors::StatementModelError, BinaryOperator, DataInfo, ExprRef, OrderByItem,
    SetOperationCombinator, SqlExpr, SqlStatement, SqlTable,
};

#[derive(Debug, Clone, Default)]
pub struct SqlStatementBuilder {
    pub data_info: Option<DataInfo>,
    pub select_projection: Option<ExprRef>,
    pub sql_tables: Vec<SqlTable>,
    pub where_condition: Option<ExprRef>,
    pub group_by_expression: Option<ExprRef>,
    pub having_condition: Option<ExprRef>,
    pub orderings: Vec<OrderByItem>,
    pub top_expression: Option<ExprRef>,
    pub is_distinct: bool,
    pub set_operation_combinators: Vec<SetOperationCombinator>,
}

impl SqlStatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_statement(statement: &SqlStatement) -> Self {
        SqlStatementBuilder {
            data_info: Some(statement.data_info.clone()),
            select_projection: Some(statement.select_projection.clone()),
            sql_tables: statement.sql_tables.clone(),
            where_condition: statement.where_condition.clone(),
            group_by_expression: statement.group_by_expression.clone(),
            having_condition: statement.having_condition.clone(),
            orderings: statement.orderings.clone(),
            top_expression: statement.top_expression.clone(),
            is_distinct: statement.is_distinct,
            set_operation_combinators: statement.set_operation_combinators.clone(),
        }
    }

    /// ANDs `condition` onto the existing predicate.
    pub fn add_where_condition(&mut self, condition: ExprRef) {
        self.where_condition = Some(match self.where_condition.take() {
            Some(existing) => SqlExpr::binary(BinaryOperator::And, existing, condition),
            None => condition,
        });
    }

    pub fn add_having_condition(&mut self, condition: ExprRef) {
        self.having_condition = Some(match self.having_condition.take() {
            Some(existing) => SqlExpr::binary(BinaryOperator::And, existing, condition),
            None => condition,
        });
    }

    /// A later ordering clause takes precedence over the orderings already present.
    pub fn prepend_orderings(&mut self, orderings: Vec<OrderByItem>) {
        self.orderings.splice(0..0, orderings);
    }

    pub fn has_set_operations(&self) -> bool {
        !self.set_operation_combinators.is_empty()
    }

    pub fn is_grouped(&self) -> bool {
        self.group_by_expression.is_some()
    }

    pub fn get_sql_statement(&self) -> Result<SqlStatement, StatementModelError> {
        let data_info = self
            .data_info
            .clone()
            .ok_or(StatementModelError::MissingDataInfo)?;
        let select_projection = self
            .select_projection
            .clone()
            .ok_or(StatementModelError::MissingSelectProjection)?;

        Ok(SqlStatement {
            data_info,
            select_projection,
            sql_tables: self.sql_tables.clone(),
            where_condition: self.where_condition.clone(),
            group_by_expression: self.group_by_expression.clone(),
            having_condition: self.having_condition.clone(),
            orderings: self.orderings.clone(),
            top_expression: self.top_expression.clone(),
            is_distinct: self.is_distinct,
            set_operation_combinators: self.set_operation_combinators.clone(),
        })
    }

    pub fn build_shared(&self) -> Result<Arc<SqlStatement>, StatementModelError> {
        self.get_sql_statement().map(Arc::new)
    }
}
