use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{SqlStatement, TableId};

/// Shared handle to an expression node.
///
/// Identity of a node is the identity of its allocation: two handles refer to
/// "the same" node only when [`Arc::ptr_eq`] holds. Structural equality via
/// `PartialEq` is still available for tests and idempotency checks.
pub type ExprRef = Arc<SqlExpr>;

/// Output column name for an unnamed scalar exposed through a sub-statement table.
pub const DEFAULT_VALUE_NAME: &str = "value";

pub const BOOLEAN_TYPE: &str = "bool";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlLiteral {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl SqlLiteral {
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlLiteral::Boolean(_) => BOOLEAN_TYPE,
            SqlLiteral::Integer(_) => "int",
            SqlLiteral::Float(_) => "double",
            SqlLiteral::String(_) => "string",
            SqlLiteral::Null => "object",
        }
    }

    /// Value bound to the command parameter for this literal. Booleans are
    /// bound as `1`/`0` so the text never relies on a dialect boolean literal.
    pub fn to_parameter_value(&self) -> serde_json::Value {
        match self {
            SqlLiteral::Boolean(b) => serde_json::Value::from(if *b { 1 } else { 0 }),
            SqlLiteral::Integer(i) => serde_json::Value::from(*i),
            SqlLiteral::Float(f) => serde_json::Value::from(*f),
            SqlLiteral::String(s) => serde_json::Value::from(s.clone()),
            SqlLiteral::Null => serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Like,
    Coalesce,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
                | BinaryOperator::Like
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    /// Infix SQL token. `Coalesce` is emitted as a function and has none.
    pub fn sql_token(&self) -> Option<&'static str> {
        let token = match self {
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Like => "LIKE",
            BinaryOperator::Coalesce => return None,
        };
        Some(token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Average,
}

impl AggregateFunction {
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Average => "AVG",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlColumn {
    pub table: TableId,
    pub column: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityColumn {
    pub property: String,
    pub column: String,
    pub data_type: String,
}

/// Row-shaped reference to a table. Carries its own output name so that the
/// generated column aliases are `name_column`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlEntity {
    pub table: TableId,
    pub entity_type: String,
    pub name: Option<String>,
    pub columns: Vec<EntityColumn>,
    pub primary_key: String,
}

impl SqlEntity {
    pub fn column_for_property(&self, property: &str) -> Option<&EntityColumn> {
        self.columns.iter().find(|c| c.property == property)
    }

    pub fn column_ref(&self, column: &EntityColumn) -> SqlColumn {
        SqlColumn {
            table: self.table,
            column: column.column.clone(),
            data_type: column.data_type.clone(),
        }
    }

    pub fn primary_key_column(&self) -> Option<SqlColumn> {
        self.column_for_property(&self.primary_key)
            .map(|c| self.column_ref(c))
    }

    /// Alias under which `column` leaves a select list.
    pub fn output_name(&self, column: &EntityColumn) -> String {
        match &self.name {
            Some(name) => format!("{}_{}", name, column.column),
            None => column.column.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedExpr {
    pub name: Option<String>,
    pub expression: ExprRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryExpr {
    pub operator: BinaryOperator,
    pub left: ExprRef,
    pub right: ExprRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnaryExpr {
    pub operator: UnaryOperator,
    pub operand: ExprRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertExpr {
    pub operand: ExprRef,
    pub target_type: String,
    pub checked: bool,
    /// User-defined conversion routine, if any.
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewExpr {
    pub type_name: String,
    pub args: Vec<ExprRef>,
    pub members: Option<Vec<String>>,
}

/// A host-side method call with no SQL translation. It can only be evaluated
/// after the rows are read, so it survives solely in a terminal projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodCallExpr {
    pub object: Option<ExprRef>,
    pub method: String,
    pub args: Vec<ExprRef>,
    pub result_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<ExprRef>,
    pub result_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsNullExpr {
    pub expression: ExprRef,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationExpr {
    pub function: AggregateFunction,
    pub argument: Option<ExprRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupingSelectExpr {
    pub key: ExprRef,
    pub element: ExprRef,
    pub aggregations: Vec<ExprRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InExpr {
    pub item: ExprRef,
    pub statement: Arc<SqlStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SqlExpr {
    Literal(SqlLiteral),
    Column(SqlColumn),
    Entity(SqlEntity),
    Named(NamedExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Convert(ConvertExpr),
    New(NewExpr),
    MethodCall(MethodCallExpr),
    Function(FunctionCall),
    IsNull(IsNullExpr),
    Aggregation(AggregationExpr),
    GroupingSelect(GroupingSelectExpr),
    SubStatement(Arc<SqlStatement>),
    Exists(Arc<SqlStatement>),
    In(InExpr),
}

impl SqlExpr {
    pub fn literal(value: SqlLiteral) -> ExprRef {
        Arc::new(SqlExpr::Literal(value))
    }

    pub fn named(name: Option<String>, expression: ExprRef) -> ExprRef {
        Arc::new(SqlExpr::Named(NamedExpr { name, expression }))
    }

    pub fn binary(operator: BinaryOperator, left: ExprRef, right: ExprRef) -> ExprRef {
        Arc::new(SqlExpr::Binary(BinaryExpr {
            operator,
            left,
            right,
        }))
    }

    pub fn column(table: TableId, column: impl Into<String>, data_type: impl Into<String>) -> ExprRef {
        Arc::new(SqlExpr::Column(SqlColumn {
            table,
            column: column.into(),
            data_type: data_type.into(),
        }))
    }

    pub fn function(name: &str, args: Vec<ExprRef>, result_type: impl Into<String>) -> ExprRef {
        Arc::new(SqlExpr::Function(FunctionCall {
            name: name.to_string(),
            args,
            result_type: result_type.into(),
        }))
    }

    pub fn type_name(&self) -> String {
        match self {
            SqlExpr::Literal(lit) => lit.type_name().to_string(),
            SqlExpr::Column(col) => col.data_type.clone(),
            SqlExpr::Entity(entity) => entity.entity_type.clone(),
            SqlExpr::Named(named) => named.expression.type_name(),
            SqlExpr::Binary(bin) => {
                if bin.operator.is_comparison() || bin.operator.is_logical() {
                    BOOLEAN_TYPE.to_string()
                } else {
                    bin.left.type_name()
                }
            }
            SqlExpr::Unary(un) => match un.operator {
                UnaryOperator::Not => BOOLEAN_TYPE.to_string(),
                UnaryOperator::Negate => un.operand.type_name(),
            },
            SqlExpr::Convert(conv) => conv.target_type.clone(),
            SqlExpr::New(new) => new.type_name.clone(),
            SqlExpr::MethodCall(call) => call.result_type.clone(),
            SqlExpr::Function(func) => func.result_type.clone(),
            SqlExpr::IsNull(_) | SqlExpr::Exists(_) | SqlExpr::In(_) => BOOLEAN_TYPE.to_string(),
            SqlExpr::Aggregation(agg) => match (agg.function, &agg.argument) {
                (AggregateFunction::Count, _) => "int".to_string(),
                (AggregateFunction::Average, _) => "double".to_string(),
                (_, Some(arg)) => arg.type_name(),
                (_, None) => "object".to_string(),
            },
            SqlExpr::GroupingSelect(grouping) => format!(
                "grouping<{}, {}>",
                grouping.key.type_name(),
                grouping.element.type_name()
            ),
            SqlExpr::SubStatement(statement) => statement.data_info.element_type().to_string(),
        }
    }

    /// True for nodes that are SQL search conditions rather than values.
    pub fn is_predicate(&self) -> bool {
        match self {
            SqlExpr::Binary(bin) => bin.operator.is_comparison() || bin.operator.is_logical(),
            SqlExpr::Unary(un) => un.operator == UnaryOperator::Not,
            SqlExpr::IsNull(_) | SqlExpr::Exists(_) | SqlExpr::In(_) => true,
            SqlExpr::Named(named) => named.expression.is_predicate(),
            SqlExpr::Convert(conv) => conv.operand.is_predicate(),
            _ => false,
        }
    }

    /// Strips any chain of named wrappers.
    pub fn unwrap_named(expr: &ExprRef) -> &ExprRef {
        match expr.as_ref() {
            SqlExpr::Named(named) => SqlExpr::unwrap_named(&named.expression),
            _ => expr,
        }
    }

    /// Whether a host-side method call appears anywhere in this expression,
    /// not counting nested statements (those are checked when they are built).
    pub fn contains_in_memory_call(&self) -> bool {
        match self {
            SqlExpr::MethodCall(_) => true,
            SqlExpr::Named(named) => named.expression.contains_in_memory_call(),
            SqlExpr::Binary(bin) => {
                bin.left.contains_in_memory_call() || bin.right.contains_in_memory_call()
            }
            SqlExpr::Unary(un) => un.operand.contains_in_memory_call(),
            SqlExpr::Convert(conv) => conv.operand.contains_in_memory_call(),
            SqlExpr::New(new) => new.args.iter().any(|a| a.contains_in_memory_call()),
            SqlExpr::Function(func) => func.args.iter().any(|a| a.contains_in_memory_call()),
            SqlExpr::IsNull(is_null) => is_null.expression.contains_in_memory_call(),
            SqlExpr::Aggregation(agg) => agg
                .argument
                .as_ref()
                .is_some_and(|a| a.contains_in_memory_call()),
            SqlExpr::GroupingSelect(grouping) => {
                grouping.key.contains_in_memory_call()
                    || grouping.element.contains_in_memory_call()
                    || grouping
                        .aggregations
                        .iter()
                        .any(|a| a.contains_in_memory_call())
            }
            SqlExpr::In(in_expr) => in_expr.item.contains_in_memory_call(),
            SqlExpr::Literal(_)
            | SqlExpr::Column(_)
            | SqlExpr::Entity(_)
            | SqlExpr::SubStatement(_)
            | SqlExpr::Exists(_) => false,
        }
    }

    /// Collects every table this expression reads from, including tables read
    /// inside nested statements.
    pub fn collect_referenced_tables(&self, out: &mut BTreeSet<TableId>) {
        match self {
            SqlExpr::Column(col) => {
                out.insert(col.table);
            }
            SqlExpr::Entity(entity) => {
                out.insert(entity.table);
            }
            SqlExpr::Named(named) => named.expression.collect_referenced_tables(out),
            SqlExpr::Binary(bin) => {
                bin.left.collect_referenced_tables(out);
                bin.right.collect_referenced_tables(out);
            }
            SqlExpr::Unary(un) => un.operand.collect_referenced_tables(out),
            SqlExpr::Convert(conv) => conv.operand.collect_referenced_tables(out),
            SqlExpr::New(new) => new.args.iter().for_each(|a| a.collect_referenced_tables(out)),
            SqlExpr::MethodCall(call) => {
                if let Some(object) = &call.object {
                    object.collect_referenced_tables(out);
                }
                call.args.iter().for_each(|a| a.collect_referenced_tables(out));
            }
            SqlExpr::Function(func) => func.args.iter().for_each(|a| a.collect_referenced_tables(out)),
            SqlExpr::IsNull(is_null) => is_null.expression.collect_referenced_tables(out),
            SqlExpr::Aggregation(agg) => {
                if let Some(arg) = &agg.argument {
                    arg.collect_referenced_tables(out);
                }
            }
            SqlExpr::GroupingSelect(grouping) => {
                grouping.key.collect_referenced_tables(out);
                grouping.element.collect_referenced_tables(out);
                grouping
                    .aggregations
                    .iter()
                    .for_each(|a| a.collect_referenced_tables(out));
            }
            SqlExpr::SubStatement(statement) | SqlExpr::Exists(statement) => {
                statement.collect_referenced_tables(out)
            }
            SqlExpr::In(in_expr) => {
                in_expr.item.collect_referenced_tables(out);
                in_expr.statement.collect_referenced_tables(out);
            }
            SqlExpr::Literal(_) => {}
        }
    }
}
