//! Error taxonomy shared by the metadata store, the file store and the
//! catalog service.

use thiserror::Error;

/// Errors returned by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No record with this id exists in the metadata store.
    #[error("book not found: {0}")]
    NotFound(String),

    /// A record exists but its PDF is missing from the file store.
    #[error("file missing for book: {0}")]
    Gone(String),

    /// Request input rejected before reaching the stores.
    #[error("{0}")]
    Validation(String),

    /// The metadata document is missing or could not be decoded in full.
    #[error("metadata document unusable: {0}")]
    Unreadable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn not_found(id: &str) -> Self {
        CatalogError::NotFound(id.to_string())
    }

    pub fn gone(id: &str) -> Self {
        CatalogError::Gone(id.to_string())
    }

    /// True for failures of the underlying disk or encoding layer.
    pub fn is_io(&self) -> bool {
        matches!(self, CatalogError::Io(_) | CatalogError::Serialization(_))
    }
}
