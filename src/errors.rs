use thiserror::Error;

/// Error type for catalog, cache and query operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CatalogError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        CatalogError::Connection(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        CatalogError::Schema(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        CatalogError::Query(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        CatalogError::NotFound(msg.into())
    }

    pub fn invalid_argument<T: Into<String>>(msg: T) -> Self {
        CatalogError::InvalidArgument(msg.into())
    }
}
