//! File Storage Layer Abstraction
//!
//! This module provides an abstraction over where book PDFs live, allowing
//! the catalog to run against a local directory or an in-memory store
//! without affecting higher-level services. Every file is addressed by the
//! book id alone and named `<id>.pdf`.

pub mod local_store;
pub mod mock_store;


use crate::error::CatalogResult;
use std::path::PathBuf;

/// File name of the PDF stored for `id`
pub fn pdf_filename(id: &str) -> String {
    format!("{}.pdf", id)
}

/// Trait defining the file storage interface
pub trait FileStorage: Send + Sync {
    /// Write `content` as the PDF for `id`, replacing any previous file
    fn save(&self, id: &str, content: &[u8]) -> CatalogResult<PathBuf>;

    /// Whether a PDF for `id` is currently present
    fn exists(&self, id: &str) -> bool;

    /// Remove the PDF for `id`. Removing a missing file succeeds.
    fn delete(&self, id: &str) -> CatalogResult<()>;

    /// Location of the PDF for `id`; never touches the filesystem
    fn path(&self, id: &str) -> PathBuf;

    /// Full content of the PDF for `id`, `Gone` when it is missing
    fn read(&self, id: &str) -> CatalogResult<Vec<u8>>;

    /// Ids of every stored PDF
    fn list_ids(&self) -> CatalogResult<Vec<String>>;
}
