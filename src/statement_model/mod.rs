//! Canonical SQL statement model.
//!
//! Every later stage reads and writes these structures: the preparer builds
//! them, the resolution stage rewrites them (always by constructing new nodes),
//! and the generator turns a finished tree into SQL text.
//!
//! # Structure
//!
//! ```text
//! SqlStatement
//! ├── data_info           Value | SingleValue | Sequence
//! ├── select_projection   ExprRef
//! ├── sql_tables          [SqlTable { id, info, join_semantics, join_condition }]
//! ├── where_condition     Option<ExprRef>
//! ├── group_by_expression / having_condition
//! ├── orderings           [OrderByItem]
//! ├── top_expression      Option<ExprRef>
//! └── set_operation_combinators [Union | Concat → SqlStatement]
//! ```

pub mod builder;
pub mod errors;
pub mod expr;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use builder::SqlStatementBuilder;
pub use expr::*;

/// Identity of a table within one translation. Assigned monotonically and
/// never reused; the generator maps it to a textual alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct TableIdGenerator {
    next: u32,
}

impl TableIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> TableId {
        let id = TableId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinSemantics {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableInfo {
    /// Symbolic source that has not been looked up in the catalog yet.
    Unresolved { entity_type: String },
    Resolved {
        table_name: String,
        entity_type: String,
    },
    SubStatement(Arc<SqlStatement>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlTable {
    pub id: TableId,
    pub info: TableInfo,
    pub join_semantics: JoinSemantics,
    pub join_condition: Option<ExprRef>,
}

impl SqlTable {
    pub fn unresolved(id: TableId, entity_type: impl Into<String>) -> Self {
        SqlTable {
            id,
            info: TableInfo::Unresolved {
                entity_type: entity_type.into(),
            },
            join_semantics: JoinSemantics::Inner,
            join_condition: None,
        }
    }

    pub fn is_sub_statement(&self) -> bool {
        matches!(self.info, TableInfo::SubStatement(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DataInfo {
    /// A single scalar, e.g. the result of an aggregate.
    Value { data_type: String },
    /// Exactly one row is expected.
    SingleValue {
        data_type: String,
        return_default_when_empty: bool,
    },
    Sequence { item_type: String },
}

impl DataInfo {
    pub fn element_type(&self) -> &str {
        match self {
            DataInfo::Value { data_type } | DataInfo::SingleValue { data_type, .. } => data_type,
            DataInfo::Sequence { item_type } => item_type,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, DataInfo::Sequence { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderByOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderByItem {
    pub expression: ExprRef,
    pub order: OrderByOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetOperation {
    Union,
    /// Union that keeps duplicates.
    Concat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetOperationCombinator {
    pub operation: SetOperation,
    pub statement: Arc<SqlStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlStatement {
    pub data_info: DataInfo,
    pub select_projection: ExprRef,
    pub sql_tables: Vec<SqlTable>,
    pub where_condition: Option<ExprRef>,
    pub group_by_expression: Option<ExprRef>,
    pub having_condition: Option<ExprRef>,
    pub orderings: Vec<OrderByItem>,
    pub top_expression: Option<ExprRef>,
    pub is_distinct: bool,
    pub set_operation_combinators: Vec<SetOperationCombinator>,
}

impl SqlStatement {
    /// Calls `visitor` for every table of this statement and of every
    /// statement nested in it, outer tables first.
    pub fn visit_tables(&self, visitor: &mut dyn FnMut(&SqlTable)) {
        for table in &self.sql_tables {
            visitor(table);
            if let TableInfo::SubStatement(sub) = &table.info {
                sub.visit_tables(visitor);
            }
            if let Some(condition) = &table.join_condition {
                for_each_nested_statement(condition, &mut |nested| nested.visit_tables(visitor));
            }
        }
        for expr in self.expressions() {
            for_each_nested_statement(expr, &mut |nested| nested.visit_tables(visitor));
        }
        for combinator in &self.set_operation_combinators {
            combinator.statement.visit_tables(visitor);
        }
    }

    /// Ids of the tables owned by this statement and every statement nested in it.
    pub fn collect_defined_tables(&self, out: &mut BTreeSet<TableId>) {
        self.visit_tables(&mut |table| {
            out.insert(table.id);
        });
    }

    pub fn collect_referenced_tables(&self, out: &mut BTreeSet<TableId>) {
        for table in &self.sql_tables {
            if let TableInfo::SubStatement(sub) = &table.info {
                sub.collect_referenced_tables(out);
            }
            if let Some(condition) = &table.join_condition {
                condition.collect_referenced_tables(out);
            }
        }
        for expr in self.expressions() {
            expr.collect_referenced_tables(out);
        }
        for combinator in &self.set_operation_combinators {
            combinator.statement.collect_referenced_tables(out);
        }
    }

    /// A statement is correlated when it reads a table it does not define.
    pub fn is_correlated(&self) -> bool {
        let mut defined = BTreeSet::new();
        let mut referenced = BTreeSet::new();
        self.collect_defined_tables(&mut defined);
        self.collect_referenced_tables(&mut referenced);
        referenced.iter().any(|id| !defined.contains(id))
    }

    /// A statement with nothing but a projection, such as the one produced by `Any`.
    pub fn is_projection_only(&self) -> bool {
        self.sql_tables.is_empty()
            && self.where_condition.is_none()
            && self.group_by_expression.is_none()
            && self.orderings.is_empty()
            && self.top_expression.is_none()
            && !self.is_distinct
            && self.set_operation_combinators.is_empty()
    }

    fn expressions(&self) -> impl Iterator<Item = &ExprRef> {
        std::iter::once(&self.select_projection)
            .chain(self.where_condition.iter())
            .chain(self.group_by_expression.iter())
            .chain(self.having_condition.iter())
            .chain(self.orderings.iter().map(|o| &o.expression))
            .chain(self.top_expression.iter())
    }
}

/// Calls `f` on each statement nested directly in `expr`.
fn for_each_nested_statement(expr: &ExprRef, f: &mut dyn FnMut(&SqlStatement)) {
    match expr.as_ref() {
        SqlExpr::SubStatement(statement) | SqlExpr::Exists(statement) => f(statement),
        SqlExpr::In(in_expr) => {
            for_each_nested_statement(&in_expr.item, f);
            f(&in_expr.statement);
        }
        SqlExpr::Named(named) => for_each_nested_statement(&named.expression, f),
        SqlExpr::Binary(bin) => {
            for_each_nested_statement(&bin.left, f);
            for_each_nested_statement(&bin.right, f);
        }
        SqlExpr::Unary(un) => for_each_nested_statement(&un.operand, f),
        SqlExpr::Convert(conv) => for_each_nested_statement(&conv.operand, f),
        SqlExpr::New(new) => new.args.iter().for_each(|a| for_each_nested_statement(a, f)),
        SqlExpr::MethodCall(call) => {
            if let Some(object) = &call.object {
                for_each_nested_statement(object, f);
            }
            call.args.iter().for_each(|a| for_each_nested_statement(a, f));
        }
        SqlExpr::Function(func) => func.args.iter().for_each(|a| for_each_nested_statement(a, f)),
        SqlExpr::IsNull(is_null) => for_each_nested_statement(&is_null.expression, f),
        SqlExpr::Aggregation(agg) => {
            if let Some(arg) = &agg.argument {
                for_each_nested_statement(arg, f);
            }
        }
        SqlExpr::GroupingSelect(grouping) => {
            for_each_nested_statement(&grouping.key, f);
            for_each_nested_statement(&grouping.element, f);
            grouping
                .aggregations
                .iter()
                .for_each(|a| for_each_nested_statement(a, f));
        }
        SqlExpr::Literal(_) | SqlExpr::Column(_) | SqlExpr::Entity(_) => {}
    }
}
