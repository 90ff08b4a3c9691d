use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {error}")]
    ReadError { error: String },
    #[error("Failed to parse catalog: {error}")]
    ParseError { error: String },
    #[error("Duplicate entity type: {entity_type}")]
    DuplicateEntity { entity_type: String },
    #[error("Entity `{entity_type}` declares primary key `{primary_key}` but has no such property")]
    MissingPrimaryKey {
        entity_type: String,
        primary_key: String,
    },
    #[error("Invalid catalog: {message}")]
    InvalidCatalog { message: String },
}
