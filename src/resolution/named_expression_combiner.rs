//! Pushes an output name down to the node that can carry it.
//!
//! A named wrapper around a constructor, method call, conversion or grouping
//! is dissolved: the name is applied to each constituent instead. Entities take
//! the name themselves (through the mapping context, so the renamed entity has
//! a stable identity). Every other shape keeps its wrapper.
//!
//! ```text
//! Named("P", New(Pair, [x, y]))        → New(Pair, [Named("P", x), Named("P", y)])
//! Named("a", Named("b", e))             → Named("a_b", e)
//! Named("c", Entity(name: None))        → Entity(name: "c")
//! ```

use std::sync::Arc;

use super::context::MappingResolutionContext;
use super::errors::ResolutionError;
use crate::statement_model::{ConvertExpr, ExprRef, MethodCallExpr, NewExpr, SqlExpr};

/// `a` + `b` → `a_b`; an absent name is absorbed by the other.
pub fn combine_names(first: Option<&str>, second: Option<&str>) -> Option<String> {
    match (first, second) {
        (None, None) => None,
        (Some(name), None) | (None, Some(name)) => Some(name.to_string()),
        (Some(first), Some(second)) => Some(format!("{}_{}", first, second)),
    }
}

pub struct NamedExpressionCombiner<'c, 'p> {
    ctx: &'c mut MappingResolutionContext<'p>,
}

impl<'c, 'p> NamedExpressionCombiner<'c, 'p> {
    pub fn new(ctx: &'c mut MappingResolutionContext<'p>) -> Self {
        NamedExpressionCombiner { ctx }
    }

    /// Returns an expression equivalent to `outer` that carries its name
    /// without the extra wrapper where possible. Non-wrappers pass through.
    pub fn process_names(&mut self, outer: &ExprRef) -> Result<ExprRef, ResolutionError> {
        let SqlExpr::Named(named) = outer.as_ref() else {
            return Ok(outer.clone());
        };
        let name = named.name.as_deref();
        let inner = &named.expression;

        match inner.as_ref() {
            SqlExpr::New(new) => {
                let args = self.process_each(name, &new.args)?;
                let members = new.members.clone().filter(|m| !m.is_empty());
                Ok(Arc::new(SqlExpr::New(NewExpr {
                    type_name: new.type_name.clone(),
                    args,
                    members,
                })))
            }
            SqlExpr::MethodCall(call) => {
                let object = match &call.object {
                    Some(object) => Some(self.process_named(name, object)?),
                    None => None,
                };
                let args = self.process_each(name, &call.args)?;
                Ok(Arc::new(SqlExpr::MethodCall(MethodCallExpr {
                    object,
                    method: call.method.clone(),
                    args,
                    result_type: call.result_type.clone(),
                })))
            }
            SqlExpr::Entity(entity) => {
                let new_name = combine_names(name, entity.name.as_deref());
                self.ctx
                    .update_entity_and_add_mapping(inner, entity, new_name)
            }
            SqlExpr::Named(nested) => {
                let combined = combine_names(name, nested.name.as_deref());
                self.process_names(&SqlExpr::named(combined, nested.expression.clone()))
            }
            SqlExpr::GroupingSelect(grouping) => {
                let key = self.process_named(name, &grouping.key)?;
                let element = self.process_named(name, &grouping.element)?;
                let aggregations = self.process_each(name, &grouping.aggregations)?;
                self.ctx
                    .update_grouping_select_and_add_mapping(inner, key, element, aggregations)
            }
            SqlExpr::Convert(conv) => {
                let operand = self.process_named(name, &conv.operand)?;
                Ok(Arc::new(SqlExpr::Convert(ConvertExpr {
                    operand,
                    target_type: conv.target_type.clone(),
                    checked: conv.checked,
                    method: conv.method.clone(),
                })))
            }
            // Shapes introduced by other stages keep their wrapper.
            _ => Ok(outer.clone()),
        }
    }

    fn process_named(
        &mut self,
        name: Option<&str>,
        expr: &ExprRef,
    ) -> Result<ExprRef, ResolutionError> {
        self.process_names(&SqlExpr::named(name.map(str::to_string), expr.clone()))
    }

    fn process_each(
        &mut self,
        name: Option<&str>,
        exprs: &[ExprRef],
    ) -> Result<Vec<ExprRef>, ResolutionError> {
        exprs
            .iter()
            .map(|expr| self.process_named(name, expr))
            .collect()
    }
}
