//! Translation entry point: query model in, SQL command out.

use std::sync::Arc;

use crate::catalog::MappingCatalog;
use crate::config::TranslatorConfig;
use crate::errors::TranslationError;
use crate::preparation::{MethodCallTransformerRegistry, StatementPreparer};
use crate::query_model::QueryModel;
use crate::sql_generation::{generate_sql, SqlCommand, SqlGenerationOptions};
use crate::statement_model::SqlStatement;

/// Holds everything that stays fixed across translations. Each call to
/// [`QueryTranslator::translate`] starts with fresh table ids and parameters.
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    catalog: MappingCatalog,
    config: TranslatorConfig,
    method_call_transformers: MethodCallTransformerRegistry,
}

impl QueryTranslator {
    pub fn new(catalog: MappingCatalog) -> Self {
        QueryTranslator {
            catalog,
            config: TranslatorConfig::default(),
            method_call_transformers: MethodCallTransformerRegistry::create_default(),
        }
    }

    pub fn with_config(mut self, config: TranslatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &MappingCatalog {
        &self.catalog
    }

    /// Registry used to translate method calls; register custom transformers here.
    pub fn method_call_transformers_mut(&mut self) -> &mut MethodCallTransformerRegistry {
        &mut self.method_call_transformers
    }

    /// Runs preparation only and returns the resolved statement tree.
    pub fn prepare(&self, query: &QueryModel) -> Result<Arc<SqlStatement>, TranslationError> {
        let mut preparer = StatementPreparer::new(
            &self.catalog,
            &self.method_call_transformers,
            self.config.single_row_cap_policy(),
        );
        preparer.prepare(query)
    }

    pub fn translate(&self, query: &QueryModel) -> Result<SqlCommand, TranslationError> {
        let statement = self.prepare(query)?;
        log::trace!("Resolved statement: {:?}", statement);
        generate_sql(&statement, SqlGenerationOptions::from(&self.config))
    }
}
