//! relq - query-model to parameterized SQL translation
//!
//! This crate turns a composable query description into SQL text through:
//! - A scoped mapping resolution context tracking original → resolved nodes
//! - Name propagation through transparent expression wrappers
//! - Sub-query integration as tables or scalar sub-statements
//! - Statement preparation per nesting level
//! - Parameterized SQL generation

/// Debug print macro that only compiles in debug builds.
/// In release builds, this expands to nothing, so there's zero runtime cost.
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        eprintln!($($arg)*);
    };
}

/// Debug print macro for println-style output (only in debug builds)
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        println!($($arg)*);
    };
}

pub mod catalog;
pub mod config;
pub mod errors;
pub mod preparation;
pub mod query_model;
pub mod resolution;
pub mod sql_generation;
pub mod statement_model;
pub mod translator;

pub use catalog::MappingCatalog;
pub use config::TranslatorConfig;
pub use errors::{ErrorCategory, TranslationError};
pub use query_model::{QueryExpr, QueryModel};
pub use sql_generation::{CommandParameter, SqlCommand};
pub use translator::QueryTranslator;
