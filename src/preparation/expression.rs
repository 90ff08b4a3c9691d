//! Resolution of front-end expressions into statement-model expressions.

use std::sync::Arc;

use super::method_calls::MethodCallParts;
use super::StatementPreparer;
use crate::errors::TranslationError;
use crate::query_model::QueryExpr;
use crate::resolution::{convert_to_scalar, MappingKey, MappingResolutionContext};
use crate::statement_model::{
    AggregateFunction, AggregationExpr, BinaryOperator, ConvertExpr, ExprRef, IsNullExpr,
    MethodCallExpr, NewExpr, SqlExpr, SqlLiteral, UnaryExpr,
};

/// Where an expression ends up. Only the terminal projection may keep
/// method calls that have no SQL translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionPosition {
    Projection,
    Sql,
}

impl<'a> StatementPreparer<'a> {
    pub fn resolve_expression(
        &mut self,
        expr: &QueryExpr,
        ctx: &mut MappingResolutionContext<'_>,
        position: ExpressionPosition,
    ) -> Result<ExprRef, TranslationError> {
        match expr {
            QueryExpr::Constant { value } => Ok(SqlExpr::literal(value.clone())),
            QueryExpr::SourceRef { name } => {
                let node = ctx.get_mapping_from_hierarchy(&MappingKey::source(name.as_str()))?;
                Ok(ctx.current_replacement(&node))
            }
            QueryExpr::Member { expr, member } => {
                let target = self.resolve_expression(expr, ctx, position)?;
                resolve_member(&target, member)
            }
            QueryExpr::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.resolve_expression(left, ctx, ExpressionPosition::Sql)?;
                let right = self.resolve_expression(right, ctx, ExpressionPosition::Sql)?;
                self.resolve_binary(*operator, left, right)
            }
            QueryExpr::Unary { operator, operand } => Ok(Arc::new(SqlExpr::Unary(UnaryExpr {
                operator: *operator,
                operand: self.resolve_expression(operand, ctx, ExpressionPosition::Sql)?,
            }))),
            QueryExpr::Convert {
                operand,
                target_type,
                checked,
                method,
            } => Ok(Arc::new(SqlExpr::Convert(ConvertExpr {
                operand: self.resolve_expression(operand, ctx, position)?,
                target_type: target_type.clone(),
                checked: *checked,
                method: method.clone(),
            }))),
            QueryExpr::New {
                type_name,
                args,
                members,
            } => {
                let args = args
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| {
                        // Constructor arguments without a member name are named positionally.
                        let name = members
                            .as_ref()
                            .and_then(|m| m.get(i).cloned())
                            .unwrap_or_else(|| format!("m{}", i));
                        Ok(SqlExpr::named(
                            Some(name),
                            self.resolve_expression(arg, ctx, position)?,
                        ))
                    })
                    .collect::<Result<Vec<_>, TranslationError>>()?;
                Ok(Arc::new(SqlExpr::New(NewExpr {
                    type_name: type_name.clone(),
                    args,
                    members: members.clone(),
                })))
            }
            QueryExpr::MethodCall {
                object,
                method,
                args,
                result_type,
            } => {
                let object = match object {
                    Some(object) => Some(self.resolve_expression(object, ctx, position)?),
                    None => None,
                };
                let args = args
                    .iter()
                    .map(|arg| self.resolve_expression(arg, ctx, position))
                    .collect::<Result<Vec<_>, _>>()?;
                self.resolve_method_call(
                    MethodCallParts {
                        method: method.clone(),
                        object,
                        args,
                        result_type: result_type.clone(),
                    },
                    position,
                )
            }
            QueryExpr::SubQuery { query } => {
                let statement = {
                    let mut child = ctx.child();
                    self.prepare_query_model(query, &mut child)?
                };
                convert_to_scalar(statement)
            }
            QueryExpr::Aggregate {
                function,
                source,
                element_name,
                selector,
            } => self.resolve_aggregate(
                *function,
                source,
                element_name.as_deref(),
                selector.as_deref(),
                ctx,
            ),
        }
    }

    /// Builds a binary node, rewriting null comparisons and entity comparisons
    /// into forms SQL can evaluate.
    pub fn resolve_binary(
        &self,
        operator: BinaryOperator,
        left: ExprRef,
        right: ExprRef,
    ) -> Result<ExprRef, TranslationError> {
        if matches!(operator, BinaryOperator::Equal | BinaryOperator::NotEqual) {
            let negated = operator == BinaryOperator::NotEqual;
            if is_null_literal(&right) {
                return Ok(is_null(left, negated));
            }
            if is_null_literal(&left) {
                return Ok(is_null(right, negated));
            }

            let left_entity = matches!(SqlExpr::unwrap_named(&left).as_ref(), SqlExpr::Entity(_));
            let right_entity = matches!(SqlExpr::unwrap_named(&right).as_ref(), SqlExpr::Entity(_));
            if left_entity || right_entity {
                return Ok(SqlExpr::binary(
                    operator,
                    entity_identity(&left)?,
                    entity_identity(&right)?,
                ));
            }
        }
        Ok(SqlExpr::binary(operator, left, right))
    }

    fn resolve_method_call(
        &self,
        call: MethodCallParts,
        position: ExpressionPosition,
    ) -> Result<ExprRef, TranslationError> {
        if let Some(transformer) = self.transformers.get_item(&call.method) {
            log::trace!("Transforming method call '{}'", call.method);
            return transformer.transform(call);
        }

        match position {
            ExpressionPosition::Projection => {
                log::debug!(
                    "Method '{}' has no SQL translation; it is evaluated in memory",
                    call.method
                );
                Ok(Arc::new(SqlExpr::MethodCall(MethodCallExpr {
                    object: call.object,
                    method: call.method,
                    args: call.args,
                    result_type: call.result_type,
                })))
            }
            ExpressionPosition::Sql => Err(TranslationError::unsupported(format!(
                "The method '{}' is not supported by this code generator, and no custom \
                 transformer has been registered.",
                call.method
            ))),
        }
    }

    fn resolve_aggregate(
        &mut self,
        function: AggregateFunction,
        source: &QueryExpr,
        element_name: Option<&str>,
        selector: Option<&QueryExpr>,
        ctx: &mut MappingResolutionContext<'_>,
    ) -> Result<ExprRef, TranslationError> {
        let grouping_node = self.resolve_expression(source, ctx, ExpressionPosition::Sql)?;
        let SqlExpr::GroupingSelect(grouping) = grouping_node.as_ref() else {
            return Err(TranslationError::unsupported(format!(
                "{} can only be applied to the groups of a grouped query here.",
                function.sql_name()
            )));
        };
        let element = SqlExpr::unwrap_named(&grouping.element).clone();

        let argument = match (function, selector) {
            (AggregateFunction::Count, None) => None,
            (AggregateFunction::Count, Some(_)) => {
                return Err(TranslationError::unsupported(
                    "Counting the elements of a group that satisfy a condition is not supported.",
                ))
            }
            (_, None) => Some(element),
            (_, Some(selector)) => {
                let mut child = ctx.child();
                if let Some(name) = element_name {
                    child.add_mapping(MappingKey::source(name), element)?;
                }
                Some(self.resolve_expression(selector, &mut child, ExpressionPosition::Sql)?)
            }
        };

        let aggregation = Arc::new(SqlExpr::Aggregation(AggregationExpr { function, argument }));
        let mut aggregations = grouping.aggregations.clone();
        aggregations.push(aggregation.clone());
        ctx.update_grouping_select_and_add_mapping(
            &grouping_node,
            grouping.key.clone(),
            grouping.element.clone(),
            aggregations,
        )?;
        Ok(aggregation)
    }
}

fn resolve_member(target: &ExprRef, member: &str) -> Result<ExprRef, TranslationError> {
    match SqlExpr::unwrap_named(target).as_ref() {
        SqlExpr::Entity(entity) => entity
            .column_for_property(member)
            .map(|column| Arc::new(SqlExpr::Column(entity.column_ref(column))))
            .ok_or_else(|| {
                TranslationError::unsupported(format!(
                    "The member '{}.{}' is not mapped to a column.",
                    entity.entity_type, member
                ))
            }),
        SqlExpr::GroupingSelect(grouping) if member == "Key" => {
            Ok(SqlExpr::unwrap_named(&grouping.key).clone())
        }
        SqlExpr::New(new) => {
            let index = new
                .members
                .as_ref()
                .and_then(|members| members.iter().position(|m| m == member));
            match index.and_then(|i| new.args.get(i)) {
                Some(arg) => Ok(SqlExpr::unwrap_named(arg).clone()),
                None => Err(TranslationError::unsupported(format!(
                    "The member '{}' of a '{}' constructor cannot be resolved.",
                    member, new.type_name
                ))),
            }
        }
        SqlExpr::Convert(conv) => resolve_member(&conv.operand, member),
        other => Err(TranslationError::unsupported(format!(
            "The member '{}' cannot be accessed on an expression of type '{}'.",
            member,
            other.type_name()
        ))),
    }
}

fn is_null_literal(expr: &ExprRef) -> bool {
    matches!(expr.as_ref(), SqlExpr::Literal(SqlLiteral::Null))
}

fn is_null(expression: ExprRef, negated: bool) -> ExprRef {
    Arc::new(SqlExpr::IsNull(IsNullExpr {
        expression,
        negated,
    }))
}

/// Entities compare by primary key.
fn entity_identity(expr: &ExprRef) -> Result<ExprRef, TranslationError> {
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
        other => Err(TranslationError::unsupported(format!(
            "An entity can only be compared with another entity, not with '{}'.",
            other.type_name()
        ))),
    }
}
