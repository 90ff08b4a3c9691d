use serde::{Deserialize, Serialize};

use super::QueryModel;
use crate::statement_model::{AggregateFunction, BinaryOperator, SqlLiteral, UnaryOperator};

fn default_result_type() -> String {
    "object".to_string()
}

/// Front-end expression tree. References to from-clause items go through
/// [`QueryExpr::SourceRef`]; everything else is structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum QueryExpr {
    Constant {
        value: SqlLiteral,
    },
    SourceRef {
        name: String,
    },
    Member {
        expr: Box<QueryExpr>,
        member: String,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<QueryExpr>,
        right: Box<QueryExpr>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<QueryExpr>,
    },
    Convert {
        operand: Box<QueryExpr>,
        target_type: String,
        #[serde(default)]
        checked: bool,
        #[serde(default)]
        method: Option<String>,
    },
    New {
        type_name: String,
        args: Vec<QueryExpr>,
        #[serde(default)]
        members: Option<Vec<String>>,
    },
    MethodCall {
        #[serde(default)]
        object: Option<Box<QueryExpr>>,
        method: String,
        #[serde(default)]
        args: Vec<QueryExpr>,
        #[serde(default = "default_result_type")]
        result_type: String,
    },
    SubQuery {
        query: Box<QueryModel>,
    },
    /// Aggregate over the elements of a grouped source, e.g. `g.Sum(x => x.Price)`.
    Aggregate {
        function: AggregateFunction,
        source: Box<QueryExpr>,
        #[serde(default)]
        element_name: Option<String>,
        #[serde(default)]
        selector: Option<Box<QueryExpr>>,
    },
}

impl QueryExpr {
    pub fn source(name: impl Into<String>) -> Self {
        QueryExpr::SourceRef { name: name.into() }
    }

    pub fn constant(value: impl Into<SqlLiteral>) -> Self {
        QueryExpr::Constant {
            value: value.into(),
        }
    }

    pub fn null() -> Self {
        QueryExpr::Constant {
            value: SqlLiteral::Null,
        }
    }

    pub fn member(self, member: impl Into<String>) -> Self {
        QueryExpr::Member {
            expr: Box::new(self),
            member: member.into(),
        }
    }

    pub fn binary(operator: BinaryOperator, left: QueryExpr, right: QueryExpr) -> Self {
        QueryExpr::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equal(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(BinaryOperator::Equal, left, right)
    }

    pub fn not_equal(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(BinaryOperator::NotEqual, left, right)
    }

    pub fn greater_than(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(BinaryOperator::GreaterThan, left, right)
    }

    pub fn and(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(BinaryOperator::And, left, right)
    }

    pub fn or(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(BinaryOperator::Or, left, right)
    }

    pub fn not(operand: QueryExpr) -> Self {
        QueryExpr::Unary {
            operator: UnaryOperator::Not,
            operand: Box::new(operand),
        }
    }

    /// Instance method call on `self`.
    pub fn call(self, method: impl Into<String>, args: Vec<QueryExpr>) -> Self {
        QueryExpr::MethodCall {
            object: Some(Box::new(self)),
            method: method.into(),
            args,
            result_type: default_result_type(),
        }
    }

    pub fn static_call(method: impl Into<String>, args: Vec<QueryExpr>) -> Self {
        QueryExpr::MethodCall {
            object: None,
            method: method.into(),
            args,
            result_type: default_result_type(),
        }
    }

    pub fn convert(self, target_type: impl Into<String>) -> Self {
        QueryExpr::Convert {
            operand: Box::new(self),
            target_type: target_type.into(),
            checked: false,
            method: None,
        }
    }

    pub fn new_object(type_name: impl Into<String>, args: Vec<QueryExpr>) -> Self {
        QueryExpr::New {
            type_name: type_name.into(),
            args,
            members: None,
        }
    }

    /// Constructor whose arguments initialise named members, like an anonymous type.
    pub fn new_with_members(type_name: impl Into<String>, members: Vec<(&str, QueryExpr)>) -> Self {
        let (names, args): (Vec<String>, Vec<QueryExpr>) = members
            .into_iter()
            .map(|(name, arg)| (name.to_string(), arg))
            .unzip();
        QueryExpr::New {
            type_name: type_name.into(),
            args,
            members: Some(names),
        }
    }

    pub fn sub_query(query: QueryModel) -> Self {
        QueryExpr::SubQuery {
            query: Box::new(query),
        }
    }

    pub fn aggregate(function: AggregateFunction, group: QueryExpr) -> Self {
        QueryExpr::Aggregate {
            function,
            source: Box::new(group),
            element_name: None,
            selector: None,
        }
    }

    /// Aggregate over `selector`, evaluated with `element_name` bound to each group element.
    pub fn aggregate_with(
        function: AggregateFunction,
        group: QueryExpr,
        element_name: impl Into<String>,
        selector: QueryExpr,
    ) -> Self {
        QueryExpr::Aggregate {
            function,
            source: Box::new(group),
            element_name: Some(element_name.into()),
            selector: Some(Box::new(selector)),
        }
    }
}

impl From<&str> for SqlLiteral {
    fn from(value: &str) -> Self {
        SqlLiteral::String(value.to_string())
    }
}

impl From<String> for SqlLiteral {
    fn from(value: String) -> Self {
        SqlLiteral::String(value)
    }
}

impl From<i64> for SqlLiteral {
    fn from(value: i64) -> Self {
        SqlLiteral::Integer(value)
    }
}

impl From<i32> for SqlLiteral {
    fn from(value: i32) -> Self {
        SqlLiteral::Integer(value.into())
    }
}

impl From<f64> for SqlLiteral {
    fn from(value: f64) -> Self {
        SqlLiteral::Float(value)
    }
}

impl From<bool> for SqlLiteral {
    fn from(value: bool) -> Self {
        SqlLiteral::Boolean(value)
    }
}
