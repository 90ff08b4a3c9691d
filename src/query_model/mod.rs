//! Input query-clause tree.
//!
//! This is what a front end hands to the translator: a main source, body
//! clauses in source order, one terminal projection, and the result operators
//! applied after it. Every type deserializes from internally tagged JSON:
//!
//! ```json
//! {
//!   "main_from": { "item_name": "c", "item_type": "Cook",
//!                  "source": { "kind": "Table", "entity_type": "Cook" } },
//!   "body_clauses": [
//!     { "kind": "Where", "predicate": { "kind": "Binary", "operator": "Equal",
//!       "left":  { "kind": "Member", "expr": { "kind": "SourceRef", "name": "c" }, "member": "Name" },
//!       "right": { "kind": "Constant", "value": "Hugo" } } }
//!   ],
//!   "select": { "kind": "SourceRef", "name": "c" },
//!   "result_operators": [ { "kind": "First" } ]
//! }
//! ```

pub mod expr;

use serde::{Deserialize, Serialize};

pub use expr::QueryExpr;

use crate::statement_model::OrderByOrder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    pub main_from: FromClause,
    #[serde(default)]
    pub body_clauses: Vec<BodyClause>,
    pub select: QueryExpr,
    #[serde(default)]
    pub result_operators: Vec<ResultOperator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromClause {
    pub item_name: String,
    pub item_type: String,
    pub source: FromSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FromSource {
    Table { entity_type: String },
    SubQuery { query: Box<QueryModel> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOrdering {
    pub expr: QueryExpr,
    #[serde(default)]
    pub order: OrderByOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BodyClause {
    AdditionalFrom {
        clause: FromClause,
    },
    Where {
        predicate: QueryExpr,
    },
    OrderBy {
        orderings: Vec<QueryOrdering>,
    },
    /// Equi-join of a new source on `outer_key == inner_key`.
    Join {
        item_name: String,
        item_type: String,
        source: FromSource,
        outer_key: QueryExpr,
        inner_key: QueryExpr,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResultOperator {
    First {
        #[serde(default)]
        return_default_when_empty: bool,
    },
    Single {
        #[serde(default)]
        return_default_when_empty: bool,
    },
    Take {
        count: QueryExpr,
    },
    Distinct,
    Count,
    Sum,
    Min,
    Max,
    Average,
    Any,
    Contains {
        item: QueryExpr,
    },
    GroupBy {
        key: QueryExpr,
        element: QueryExpr,
    },
    Union {
        query: Box<QueryModel>,
    },
    Concat {
        query: Box<QueryModel>,
    },
}

impl ResultOperator {
    pub fn name(&self) -> &'static str {
        match self {
            ResultOperator::First { .. } => "First",
            ResultOperator::Single { .. } => "Single",
            ResultOperator::Take { .. } => "Take",
            ResultOperator::Distinct => "Distinct",
            ResultOperator::Count => "Count",
            ResultOperator::Sum => "Sum",
            ResultOperator::Min => "Min",
            ResultOperator::Max => "Max",
            ResultOperator::Average => "Average",
            ResultOperator::Any => "Any",
            ResultOperator::Contains { .. } => "Contains",
            ResultOperator::GroupBy { .. } => "GroupBy",
            ResultOperator::Union { .. } => "Union",
            ResultOperator::Concat { .. } => "Concat",
        }
    }
}

impl QueryModel {
    /// `from {item_name} in {entity_type} select {item_name}`
    pub fn from_table(item_name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        let item_name = item_name.into();
        let entity_type = entity_type.into();
        QueryModel {
            main_from: FromClause {
                item_name: item_name.clone(),
                item_type: entity_type.clone(),
                source: FromSource::Table { entity_type },
            },
            body_clauses: Vec::new(),
            select: QueryExpr::source(item_name),
            result_operators: Vec::new(),
        }
    }

    /// `from {item_name} in ({query}) select {item_name}`
    pub fn from_sub_query(item_name: impl Into<String>, query: QueryModel) -> Self {
        let item_name = item_name.into();
        QueryModel {
            main_from: FromClause {
                item_name: item_name.clone(),
                item_type: "object".to_string(),
                source: FromSource::SubQuery {
                    query: Box::new(query),
                },
            },
            body_clauses: Vec::new(),
            select: QueryExpr::source(item_name),
            result_operators: Vec::new(),
        }
    }

    pub fn additional_from_table(
        mut self,
        item_name: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        let entity_type = entity_type.into();
        self.body_clauses.push(BodyClause::AdditionalFrom {
            clause: FromClause {
                item_name: item_name.into(),
                item_type: entity_type.clone(),
                source: FromSource::Table { entity_type },
            },
        });
        self
    }

    pub fn additional_from_sub_query(mut self, item_name: impl Into<String>, query: QueryModel) -> Self {
        self.body_clauses.push(BodyClause::AdditionalFrom {
            clause: FromClause {
                item_name: item_name.into(),
                item_type: "object".to_string(),
                source: FromSource::SubQuery {
                    query: Box::new(query),
                },
            },
        });
        self
    }

    pub fn join_table(
        mut self,
        item_name: impl Into<String>,
        entity_type: impl Into<String>,
        outer_key: QueryExpr,
        inner_key: QueryExpr,
    ) -> Self {
        let entity_type = entity_type.into();
        self.body_clauses.push(BodyClause::Join {
            item_name: item_name.into(),
            item_type: entity_type.clone(),
            source: FromSource::Table { entity_type },
            outer_key,
            inner_key,
        });
        self
    }

    pub fn where_clause(mut self, predicate: QueryExpr) -> Self {
        self.body_clauses.push(BodyClause::Where { predicate });
        self
    }

    pub fn order_by(mut self, expr: QueryExpr, order: OrderByOrder) -> Self {
        self.body_clauses.push(BodyClause::OrderBy {
            orderings: vec![QueryOrdering { expr, order }],
        });
        self
    }

    pub fn select(mut self, select: QueryExpr) -> Self {
        self.select = select;
        self
    }

    pub fn with_result_operator(mut self, operator: ResultOperator) -> Self {
        self.result_operators.push(operator);
        self
    }
}
