//! Caller-visible translation errors.
//!
//! A translation either yields complete SQL text with parameters or exactly one
//! of these errors; stage errors are wrapped without modification.

use std::fmt;

use thiserror::Error;

use crate::resolution::errors::ResolutionError;
use crate::statement_model::errors::StatementModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UnresolvedReference,
    DuplicateMapping,
    UnsupportedConstruct,
    UnsupportedShape,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::UnresolvedReference => "UnresolvedReferenceError",
            ErrorCategory::DuplicateMapping => "DuplicateMappingError",
            ErrorCategory::UnsupportedConstruct => "UnsupportedConstruct",
            ErrorCategory::UnsupportedShape => "UnsupportedShapeError",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    StatementModel(#[from] StatementModelError),

    #[error("{0}")]
    UnsupportedConstruct(String),

    #[error("{0}")]
    UnsupportedShape(String),
}

impl TranslationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::Resolution(ResolutionError::UnresolvedReference { .. }) => {
                ErrorCategory::UnresolvedReference
            }
            TranslationError::Resolution(ResolutionError::DuplicateMapping { .. }) => {
                ErrorCategory::DuplicateMapping
            }
            TranslationError::UnsupportedConstruct(_) => ErrorCategory::UnsupportedConstruct,
            // An incomplete statement is a malformed shape handed between stages.
            TranslationError::StatementModel(_) | TranslationError::UnsupportedShape(_) => {
                ErrorCategory::UnsupportedShape
            }
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        TranslationError::UnsupportedConstruct(message.into())
    }
}
