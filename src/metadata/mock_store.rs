//! Mock implementation of MetadataStorage trait for testing

use crate::error::{CatalogError, CatalogResult};
use crate::metadata::{BookRecord, MetadataStorage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// In-memory MetadataStorage with injectable save failures
pub struct MockMetadataStore {
    records: Mutex<Vec<BookRecord>>,
    fail_saves: AtomicBool,
    save_count: AtomicUsize,
}

impl MockMetadataStore {
    /// Create a new, empty mock metadata store
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_saves: AtomicBool::new(false),
            save_count: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent `save` fail with an I/O error
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

impl Default for MockMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStorage for MockMetadataStore {
    fn load(&self) -> Vec<BookRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn save(&self, records: &[BookRecord]) -> CatalogResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CatalogError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "mock metadata store configured to fail",
            )));
        }
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records.to_vec();
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
