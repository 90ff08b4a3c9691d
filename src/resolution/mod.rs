//! Mapping resolution: scoped replacement tracking, name propagation and
//! sub-statement integration.

pub mod context;
pub mod errors;
pub mod named_expression_combiner;
pub mod sub_statement;

pub use context::{MappingKey, MappingResolutionContext};
pub use named_expression_combiner::{combine_names, NamedExpressionCombiner};
pub use sub_statement::{
    convert_to_scalar, convert_to_table, name_projection_for_table,
    resolve_sub_statement_reference, without_unlimited_orderings, SingleRowCapPolicy,
};
