//! Expression emission.
//!
//! An expression is written in one of two contexts. In value context it must
//! yield a value (a predicate becomes `CASE WHEN ... THEN 1 ELSE 0 END`); in
//! predicate context it must be a search condition (a boolean value becomes
//! `(value = 1)`). Boolean literals are never written as dialect literals.

use super::{SqlGenerator, ToSql};
use crate::errors::TranslationError;
use crate::resolution::combine_names;
use crate::statement_model::{
    BinaryOperator, ExprRef, SqlColumn, SqlExpr, SqlLiteral, UnaryOperator, DEFAULT_VALUE_NAME,
};

impl ToSql for SqlLiteral {
    fn to_sql(&self, generator: &mut SqlGenerator) -> Result<(), TranslationError> {
        match self {
            SqlLiteral::Null => generator.command.append("NULL"),
            literal => generator.command.append_parameter(literal.to_parameter_value()),
        }
        Ok(())
    }
}

impl ToSql for SqlColumn {
    fn to_sql(&self, generator: &mut SqlGenerator) -> Result<(), TranslationError> {
        let alias = generator.alias(self.table)?;
        generator.command.append_column(&alias, &self.column);
        Ok(())
    }
}

impl SqlGenerator {
    /// Writes the select list of a projection. A projection with no
    /// selectable parts (a `Count` placeholder, for example) selects `NULL`.
    pub(super) fn emit_select_list(&mut self, projection: &ExprRef) -> Result<(), TranslationError> {
        let mut items = 0;
        self.emit_select_item(projection, None, false, &mut items)?;
        if items == 0 {
            self.command.append("NULL");
        }
        Ok(())
    }

    fn emit_select_item(
        &mut self,
        expr: &ExprRef,
        name: Option<&str>,
        wrapped: bool,
        items: &mut usize,
    ) -> Result<(), TranslationError> {
        match expr.as_ref() {
            SqlExpr::Named(named) => {
                let name = combine_names(name, named.name.as_deref());
                self.emit_select_item(&named.expression, name.as_deref(), true, items)
            }
            SqlExpr::Entity(entity) => {
                let alias = self.alias(entity.table)?;
                let prefix = combine_names(name, entity.name.as_deref());
                for column in &entity.columns {
                    self.next_select_item(items);
                    self.command.append_column(&alias, &column.column);
                    if let Some(prefix) = &prefix {
                        self.command.append(" AS ");
                        self.command
                            .append_identifier(&format!("{}_{}", prefix, column.column));
                    }
                }
                Ok(())
            }
            SqlExpr::New(new) => {
                for arg in &new.args {
                    self.emit_select_item(arg, name, wrapped, items)?;
                }
                Ok(())
            }
            // The element of a grouping is only reachable through aggregations.
            SqlExpr::GroupingSelect(grouping) => {
                self.emit_select_item(&grouping.key, name, wrapped, items)?;
                for aggregation in &grouping.aggregations {
                    self.emit_select_item(aggregation, name, wrapped, items)?;
                }
                Ok(())
            }
            // In-memory calls are evaluated by the caller; select their inputs.
            SqlExpr::MethodCall(call) => {
                if let Some(object) = &call.object {
                    self.emit_select_item(object, name, wrapped, items)?;
                }
                for arg in &call.args {
                    self.emit_select_item(arg, name, wrapped, items)?;
                }
                Ok(())
            }
            SqlExpr::Convert(convert) => {
                self.emit_select_item(&convert.operand, name, wrapped, items)
            }
            _ => {
                self.next_select_item(items);
                self.emit_value(expr)?;
                if wrapped {
                    self.command.append(" AS ");
                    self.command
                        .append_identifier(name.unwrap_or(DEFAULT_VALUE_NAME));
                }
                Ok(())
            }
        }
    }

    fn next_select_item(&mut self, items: &mut usize) {
        if *items > 0 {
            self.command.append(",");
        }
        *items += 1;
    }

    pub(super) fn emit_value(&mut self, expr: &ExprRef) -> Result<(), TranslationError> {
        match expr.as_ref() {
            SqlExpr::Literal(literal) => literal.to_sql(self),
            SqlExpr::Column(column) => column.to_sql(self),
            SqlExpr::Named(named) => self.emit_value(&named.expression),
            SqlExpr::Convert(convert) => self.emit_value(&convert.operand),
            SqlExpr::Binary(binary) if binary.operator == BinaryOperator::Coalesce => {
                self.command.append("COALESCE(");
                self.emit_value(&binary.left)?;
                self.command.append(", ");
                self.emit_value(&binary.right)?;
                self.command.append(")");
                Ok(())
            }
            SqlExpr::Binary(binary)
                if !binary.operator.is_comparison() && !binary.operator.is_logical() =>
            {
                self.command.append("(");
                self.emit_value(&binary.left)?;
                self.emit_operator_token(binary.operator)?;
                self.emit_value(&binary.right)?;
                self.command.append(")");
                Ok(())
            }
            SqlExpr::Unary(unary) if unary.operator == UnaryOperator::Negate => {
                self.command.append("-");
                self.emit_value(&unary.operand)
            }
            SqlExpr::Binary(_)
            | SqlExpr::Unary(_)
            | SqlExpr::IsNull(_)
            | SqlExpr::Exists(_)
            | SqlExpr::In(_) => {
                self.command.append("CASE WHEN ");
                self.emit_predicate(expr)?;
                self.command.append(" THEN 1 ELSE 0 END");
                Ok(())
            }
            SqlExpr::Function(function) => {
                self.command.append(&function.name);
                self.command.append("(");
                for (index, arg) in function.args.iter().enumerate() {
                    if index > 0 {
                        self.command.append(", ");
                    }
                    self.emit_value(arg)?;
                }
                self.command.append(")");
                Ok(())
            }
            SqlExpr::Aggregation(aggregation) => {
                self.command.append(aggregation.function.sql_name());
                self.command.append("(");
                match &aggregation.argument {
                    Some(argument) => self.emit_value(argument)?,
                    None => self.command.append("*"),
                }
                self.command.append(")");
                Ok(())
            }
            SqlExpr::SubStatement(statement) => {
                self.command.append("(");
                statement.to_sql(self)?;
                self.command.append(")");
                Ok(())
            }
            SqlExpr::Entity(entity) => Err(TranslationError::unsupported(format!(
                "An entity of type '{}' cannot be used as a single value here; compare or select one of its members instead.",
                entity.entity_type
            ))),
            SqlExpr::New(new) => Err(TranslationError::unsupported(format!(
                "A constructed '{}' value cannot be used as a single value in SQL.",
                new.type_name
            ))),
            SqlExpr::MethodCall(call) => Err(TranslationError::unsupported(format!(
                "The method '{}' cannot be translated to SQL.",
                call.method
            ))),
            SqlExpr::GroupingSelect(_) => Err(TranslationError::unsupported(
                "A grouping cannot be used as a single value; select its key or an aggregate.",
            )),
        }
    }

    pub(super) fn emit_predicate(&mut self, expr: &ExprRef) -> Result<(), TranslationError> {
        match expr.as_ref() {
            SqlExpr::Named(named) => self.emit_predicate(&named.expression),
            SqlExpr::Convert(convert) if convert.operand.is_predicate() => {
                self.emit_predicate(&convert.operand)
            }
            SqlExpr::Binary(binary) if binary.operator.is_logical() => {
                self.command.append("(");
                self.emit_predicate(&binary.left)?;
                self.emit_operator_token(binary.operator)?;
                self.emit_predicate(&binary.right)?;
                self.command.append(")");
                Ok(())
            }
            SqlExpr::Binary(binary) if binary.operator.is_comparison() => {
                self.command.append("(");
                self.emit_value(&binary.left)?;
                self.emit_operator_token(binary.operator)?;
                self.emit_value(&binary.right)?;
                self.command.append(")");
                Ok(())
            }
            SqlExpr::Unary(unary) if unary.operator == UnaryOperator::Not => {
                self.command.append("NOT ");
                self.emit_predicate(&unary.operand)
            }
            SqlExpr::IsNull(is_null) => {
                self.command.append("(");
                self.emit_value(&is_null.expression)?;
                self.command.append(if is_null.negated {
                    " IS NOT NULL)"
                } else {
                    " IS NULL)"
                });
                Ok(())
            }
            SqlExpr::Exists(statement) => {
                self.command.append("EXISTS((");
                statement.to_sql(self)?;
                self.command.append("))");
                Ok(())
            }
            SqlExpr::In(in_expr) => {
                self.command.append("(");
                self.emit_value(&in_expr.item)?;
                self.command.append(" IN (");
                in_expr.statement.to_sql(self)?;
                self.command.append("))");
                Ok(())
            }
            _ => {
                self.command.append("(");
                self.emit_value(expr)?;
                self.command.append(" = 1)");
                Ok(())
            }
        }
    }

    fn emit_operator_token(&mut self, operator: BinaryOperator) -> Result<(), TranslationError> {
        let token = operator.sql_token().ok_or_else(|| {
            TranslationError::unsupported(format!("{:?} has no infix SQL form.", operator))
        })?;
        self.command.append(" ");
        self.command.append(token);
        self.command.append(" ");
        Ok(())
    }
}
