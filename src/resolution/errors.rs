//! Error types for mapping resolution.
//!
//! Both variants signal a sequencing or correctness bug in a pipeline stage
//! rather than a problem with the caller's query.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolutionError {
    #[error("No mapping registered for {original} in the current scope.")]
    UnresolvedReference { original: String },

    #[error("{original} is already mapped to a different replacement ({existing}); cannot map it to {replacement}.")]
    DuplicateMapping {
        original: String,
        existing: String,
        replacement: String,
    },
}
