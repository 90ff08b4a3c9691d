use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StatementModelError {
    #[error("Statement has no select projection.")]
    MissingSelectProjection,

    #[error("Statement has no data info.")]
    MissingDataInfo,
}
