//! Mock implementation of FileStorage trait for testing

use crate::error::{CatalogError, CatalogResult};
use crate::storage::{pdf_filename, FileStorage};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// In-memory FileStorage keyed by book id
pub struct MockFileStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MockFileStore {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `save` fail with an I/O error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored files
    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for MockFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStorage for MockFileStore {
    fn save(&self, id: &str, content: &[u8]) -> CatalogResult<PathBuf> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CatalogError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "mock file store configured to fail",
            )));
        }
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), content.to_vec());
        Ok(self.path(id))
    }

    fn exists(&self, id: &str) -> bool {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).contains_key(id)
    }

    fn delete(&self, id: &str) -> CatalogResult<()> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).remove(id);
        Ok(())
    }

    fn path(&self, id: &str) -> PathBuf {
        PathBuf::from("memory").join(pdf_filename(id))
    }

    fn read(&self, id: &str) -> CatalogResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::gone(id))
    }

    fn list_ids(&self) -> CatalogResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        Ok(ids)
    }
}
