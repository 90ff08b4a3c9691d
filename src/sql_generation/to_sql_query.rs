use super::{SqlGenerator, ToSql};
use crate::errors::TranslationError;
use crate::resolution::errors::ResolutionError;
use crate::statement_model::{
    ExprRef, JoinSemantics, OrderByItem, OrderByOrder, SetOperation, SetOperationCombinator,
    SqlExpr, SqlStatement, SqlTable, TableId, TableInfo,
};

impl ToSql for SqlStatement {
    fn to_sql(&self, generator: &mut SqlGenerator) -> Result<(), TranslationError> {
        for table in &self.sql_tables {
            generator.register_table(table);
        }

        generator.command.append("SELECT ");
        if self.is_distinct {
            generator.command.append("DISTINCT ");
        }
        if let Some(top) = &self.top_expression {
            generator.command.append("TOP (");
            generator.emit_value(top)?;
            generator.command.append(") ");
        }
        generator.emit_select_list(&self.select_projection)?;

        for (index, table) in self.sql_tables.iter().enumerate() {
            generator.emit_table(table, index == 0)?;
        }

        if let Some(condition) = &self.where_condition {
            generator.command.append(" WHERE ");
            generator.emit_predicate(condition)?;
        }
        if let Some(group_by) = &self.group_by_expression {
            generator.command.append(" GROUP BY ");
            generator.emit_group_by(group_by)?;
        }
        if let Some(condition) = &self.having_condition {
            generator.command.append(" HAVING ");
            generator.emit_predicate(condition)?;
        }

        for combinator in &self.set_operation_combinators {
            combinator.to_sql(generator)?;
        }

        if !self.orderings.is_empty() {
            generator.command.append(" ORDER BY ");
            for (index, ordering) in self.orderings.iter().enumerate() {
                if index > 0 {
                    generator.command.append(", ");
                }
                ordering.to_sql(generator)?;
            }
        }
        Ok(())
    }
}

impl ToSql for SetOperationCombinator {
    fn to_sql(&self, generator: &mut SqlGenerator) -> Result<(), TranslationError> {
        generator.command.append(match self.operation {
            SetOperation::Union => " UNION (",
            SetOperation::Concat => " UNION ALL (",
        });
        self.statement.to_sql(generator)?;
        generator.command.append(")");
        Ok(())
    }
}

impl ToSql for OrderByItem {
    fn to_sql(&self, generator: &mut SqlGenerator) -> Result<(), TranslationError> {
        // SQL Server rejects a constant in ORDER BY; a scalar select is accepted.
        if let SqlExpr::Literal(_) = SqlExpr::unwrap_named(&self.expression).as_ref() {
            generator.command.append("(SELECT ");
            generator.emit_value(&self.expression)?;
            generator.command.append(")");
        } else {
            generator.emit_value(&self.expression)?;
        }
        generator.command.append(match self.order {
            OrderByOrder::Asc => " ASC",
            OrderByOrder::Desc => " DESC",
        });
        Ok(())
    }
}

impl SqlGenerator {
    fn emit_table(&mut self, table: &SqlTable, is_first: bool) -> Result<(), TranslationError> {
        if is_first {
            self.command.append(" FROM ");
            return self.emit_table_source(table);
        }

        match (&table.join_condition, table.is_sub_statement()) {
            (Some(condition), _) => {
                self.command.append(match table.join_semantics {
                    JoinSemantics::Inner => " INNER JOIN ",
                    JoinSemantics::Left => " LEFT OUTER JOIN ",
                });
                self.emit_table_source(table)?;
                self.command.append(" ON ");
                self.emit_predicate(condition)?;
            }
            (None, true) => {
                self.command.append(match table.join_semantics {
                    JoinSemantics::Inner => " CROSS APPLY ",
                    JoinSemantics::Left => " OUTER APPLY ",
                });
                self.emit_table_source(table)?;
            }
            (None, false) => {
                if table.join_semantics == JoinSemantics::Left {
                    return Err(TranslationError::UnsupportedShape(format!(
                        "Physical table {} cannot be left-joined without a join condition.",
                        table.id
                    )));
                }
                self.command.append(" CROSS JOIN ");
                self.emit_table_source(table)?;
            }
        }
        Ok(())
    }

    fn emit_table_source(&mut self, table: &SqlTable) -> Result<(), TranslationError> {
        let alias = self.alias(table.id)?;
        match &table.info {
            TableInfo::Resolved { table_name, .. } => {
                self.command.append_identifier(table_name);
            }
            TableInfo::SubStatement(statement) => {
                self.command.append("(");
                statement.to_sql(self)?;
                self.command.append(")");
            }
            TableInfo::Unresolved { entity_type } => {
                return Err(ResolutionError::UnresolvedReference {
                    original: format!("table source of entity type '{}'", entity_type),
                }
                .into());
            }
        }
        self.command.append(" AS ");
        self.command.append_identifier(&alias);
        Ok(())
    }

    /// Grouping keys are flattened: a constructed key groups by each argument,
    /// an entity key by each of its columns.
    fn emit_group_by(&mut self, expr: &ExprRef) -> Result<(), TranslationError> {
        let mut keys = Vec::new();
        flatten_group_key(expr, &mut keys);
        for (index, key) in keys.iter().enumerate() {
            if index > 0 {
                self.command.append(", ");
            }
            match key {
                GroupKey::Column { table, column } => {
                    let alias = self.alias(*table)?;
                    self.command.append_column(&alias, column);
                }
                GroupKey::Value(value) => self.emit_value(value)?,
            }
        }
        Ok(())
    }
}

enum GroupKey {
    Column {
        table: TableId,
        column: String,
    },
    Value(ExprRef),
}

fn flatten_group_key(expr: &ExprRef, out: &mut Vec<GroupKey>) {
    match expr.as_ref() {
        SqlExpr::Named(named) => flatten_group_key(&named.expression, out),
        SqlExpr::New(new) => new.args.iter().for_each(|arg| flatten_group_key(arg, out)),
        SqlExpr::Entity(entity) => out.extend(entity.columns.iter().map(|c| GroupKey::Column {
            table: entity.table,
            column: c.column.clone(),
        })),
        _ => out.push(GroupKey::Value(expr.clone())),
    }
}
