//! JSON file implementation of MetadataStorage trait
//!
//! The whole catalog lives in one pretty-printed JSON array. Saves go through
//! a temporary file in the same directory followed by a rename, so concurrent
//! readers see either the previous or the next document, never a torn one.

use crate::error::{CatalogError, CatalogResult};
use crate::metadata::{BookRecord, MetadataStorage};
use log::{debug, info, warn};
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Directory that holds `path`, with `.` standing in for a bare file name
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// JSON document implementation of MetadataStorage
pub struct JsonMetadataStore {
    path: PathBuf,
}

impl JsonMetadataStore {
    /// Create a store backed by the document at `path`. The document is
    /// created lazily on first load.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Using metadata document: {}", path.display());
        Self { path }
    }

    /// Stage `bytes` beside the document and rename it into place. Without
    /// `clobber` an existing document wins.
    fn write_document(&self, bytes: &[u8], clobber: bool) -> CatalogResult<()> {
        let dir = parent_dir(&self.path);
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        if clobber {
            tmp.persist(&self.path).map_err(|e| e.error)?;
        } else {
            tmp.persist_noclobber(&self.path).map_err(|e| e.error)?;
        }
        Ok(())
    }

    /// Write an empty array unless a writer got there first
    fn initialize(&self) {
        match self.write_document(b"[]", false) {
            Ok(()) => {}
            Err(CatalogError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Metadata document {} appeared during initialization", self.path.display());
            }
            Err(e) => warn!("Failed to initialize metadata document {}: {}", self.path.display(), e),
        }
    }

    /// Decode the document into its well-formed entries plus the number of
    /// entries that had to be skipped
    fn decode(&self, content: &str) -> CatalogResult<(Vec<BookRecord>, usize)> {
        let value: Value = serde_json::from_str(content).map_err(|e| {
            CatalogError::Unreadable(format!("{} is not valid JSON: {}", self.path.display(), e))
        })?;

        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(CatalogError::Unreadable(format!(
                    "{} is not an array (found {})",
                    self.path.display(),
                    type_name(&other)
                )))
            }
        };

        let mut records = Vec::with_capacity(items.len());
        let mut skipped = 0;
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<BookRecord>(item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping malformed metadata entry {}: {}", index, e);
                    skipped += 1;
                }
            }
        }
        Ok((records, skipped))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl MetadataStorage for JsonMetadataStore {
    fn load(&self) -> Vec<BookRecord> {
        if !self.path.exists() {
            info!("Metadata document {} not found, initializing empty catalog", self.path.display());
            self.initialize();
            return Vec::new();
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => match self.decode(&content) {
                Ok((records, _)) => records,
                Err(e) => {
                    warn!("{}, treating as empty", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Failed to read metadata document {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn load_strict(&self) -> CatalogResult<Vec<BookRecord>> {
        if !self.path.exists() {
            return Err(CatalogError::Unreadable(format!("{} does not exist", self.path.display())));
        }

        let content = fs::read_to_string(&self.path)?;
        let (records, skipped) = self.decode(&content)?;
        if skipped > 0 {
            return Err(CatalogError::Unreadable(format!(
                "{} has {} malformed entries",
                self.path.display(),
                skipped
            )));
        }
        Ok(records)
    }

    fn save(&self, records: &[BookRecord]) -> CatalogResult<()> {
        let document = serde_json::to_vec_pretty(records)?;
        self.write_document(&document, true)?;
        debug!("Saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}
