//! SQL text generation.
//!
//! Walks a fully resolved [`SqlStatement`] and emits parameterized SQL text.
//! Every literal becomes a parameter; identifiers are bracket-quoted.
//!
//! Table aliases come from one counter shared by both alias prefixes.
//! Sub-statement tables anywhere in the tree are numbered first, in table id
//! order; physical tables continue the count as their statements are emitted:
//!
//! ```text
//! SELECT [q0].[ID] FROM (SELECT TOP (@1) [t1].[ID] FROM [CookTable] AS [t1]) AS [q0]
//! ```
//!
//! Each alias is therefore unique across the whole text, so a correlated
//! reference to an outer table needs no extra qualification.

pub mod command_builder;
mod to_sql;
mod to_sql_query;

use std::collections::{BTreeSet, HashMap};

pub use command_builder::{CommandParameter, SqlCommand, SqlCommandBuilder};

use crate::config::TranslatorConfig;
use crate::errors::TranslationError;
use crate::resolution::errors::ResolutionError;
use crate::statement_model::{SqlStatement, SqlTable, TableId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlGenerationOptions {
    pub parameter_prefix: String,
    pub table_alias_prefix: String,
    pub sub_statement_alias_prefix: String,
}

impl Default for SqlGenerationOptions {
    fn default() -> Self {
        SqlGenerationOptions::from(&TranslatorConfig::default())
    }
}

impl From<&TranslatorConfig> for SqlGenerationOptions {
    fn from(config: &TranslatorConfig) -> Self {
        SqlGenerationOptions {
            parameter_prefix: config.parameter_prefix.clone(),
            table_alias_prefix: config.table_alias_prefix.clone(),
            sub_statement_alias_prefix: config.sub_statement_alias_prefix.clone(),
        }
    }
}

/// Statement-model pieces that can write themselves into a command.
pub trait ToSql {
    fn to_sql(&self, generator: &mut SqlGenerator) -> Result<(), TranslationError>;
}

/// Generation state for one command.
///
/// `next_alias` spans the whole text and does not restart inside nested
/// statements. Existing emitted-SQL fixtures depend on this numbering
/// (`[t0]` outside, `[t1]` inside a sub-query), so keep it global.
pub struct SqlGenerator {
    command: SqlCommandBuilder,
    aliases: HashMap<TableId, String>,
    next_alias: usize,
    options: SqlGenerationOptions,
}

impl SqlGenerator {
    pub fn new(options: SqlGenerationOptions) -> Self {
        SqlGenerator {
            command: SqlCommandBuilder::new(options.parameter_prefix.clone()),
            aliases: HashMap::new(),
            next_alias: 0,
            options,
        }
    }

    pub fn command(&mut self) -> &mut SqlCommandBuilder {
        &mut self.command
    }

    /// Numbers every sub-statement table of `statement` up front.
    fn register_sub_statement_aliases(&mut self, statement: &SqlStatement) {
        let mut sub_statement_tables = BTreeSet::new();
        statement.visit_tables(&mut |table| {
            if table.is_sub_statement() {
                sub_statement_tables.insert(table.id);
            }
        });
        for id in sub_statement_tables {
            let alias = format!("{}{}", self.options.sub_statement_alias_prefix, self.next_alias);
            self.next_alias += 1;
            self.aliases.insert(id, alias);
        }
    }

    /// Assigns the next alias to a table not yet seen. Called for a
    /// statement's own tables before any of its clauses are written.
    fn register_table(&mut self, table: &SqlTable) {
        if self.aliases.contains_key(&table.id) {
            return;
        }
        let alias = format!("{}{}", self.options.table_alias_prefix, self.next_alias);
        self.next_alias += 1;
        log::trace!("Table {} aliased as {}", table.id, alias);
        self.aliases.insert(table.id, alias);
    }

    fn alias(&self, id: TableId) -> Result<String, TranslationError> {
        self.aliases.get(&id).cloned().ok_or_else(|| {
            ResolutionError::UnresolvedReference {
                original: format!("table {}", id),
            }
            .into()
        })
    }

    pub fn finish(self) -> SqlCommand {
        self.command.get_command()
    }
}

/// Generates the command for a top-level statement.
pub fn generate_sql(
    statement: &SqlStatement,
    options: SqlGenerationOptions,
) -> Result<SqlCommand, TranslationError> {
    let mut generator = SqlGenerator::new(options);
    generator.register_sub_statement_aliases(statement);
    statement.to_sql(&mut generator)?;
    let command = generator.finish();

    log::debug!("Generated SQL: {}", command.text);
    crate::debug_print!("{:?}", command.parameters);
    Ok(command)
}
