//! Catalog service: keeps the metadata store and the file store consistent
//! across create, update and delete.
//!
//! Mutations run under a single lock for their whole load, mutate, save
//! cycle. File operations are staged before the metadata commit, so a failed
//! commit leaves at worst an orphan file, and deletes remove the file first
//! so a failed commit leaves at worst a record whose download reports Gone.

pub mod sweeper;

use crate::error::{CatalogError, CatalogResult};
use crate::metadata::{locate, BookChanges, BookFilter, BookRecord, MetadataStorage, NewBook};
use crate::storage::FileStorage;
use chrono::Utc;
use log::{debug, error, info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const ID_PREFIX: char = 'b';
const ID_RANDOM_LEN: usize = 8;

/// Random `b` + 8 alphanumeric token
fn random_id() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", ID_PREFIX, token)
}

/// A resolved download: the record plus the bytes of its PDF
#[derive(Debug, Clone)]
pub struct BookFile {
    pub record: BookRecord,
    pub path: PathBuf,
    pub content: Vec<u8>,
}

/// Composes the metadata and file stores into consistent operations
pub struct CatalogService {
    metadata: Arc<dyn MetadataStorage>,
    files: Arc<dyn FileStorage>,
    write_lock: Mutex<()>,
}

impl CatalogService {
    /// Create a new catalog service with injected storage backends
    pub fn new(metadata: Arc<dyn MetadataStorage>, files: Arc<dyn FileStorage>) -> Self {
        Self {
            metadata,
            files,
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh id, unique against `records` and against files already on disk
    fn generate_id(&self, records: &[BookRecord]) -> String {
        loop {
            let id = random_id();
            if locate(records, &id).is_none() && !self.files.exists(&id) {
                return id;
            }
            debug!("Generated id {} collided, regenerating", id);
        }
    }

    /// Records matching `filter`, in insertion order
    pub fn list(&self, filter: &BookFilter) -> Vec<BookRecord> {
        self.metadata.filter(filter)
    }

    pub fn get(&self, id: &str) -> CatalogResult<BookRecord> {
        self.metadata
            .find(id)
            .map(|(_, record)| record)
            .ok_or_else(|| CatalogError::not_found(id))
    }

    /// Resolve a record and its PDF. A record whose file has disappeared
    /// yields `Gone`, not `NotFound`.
    pub fn download(&self, id: &str) -> CatalogResult<BookFile> {
        let record = self.get(id)?;
        if !self.files.exists(id) {
            warn!("Book {} has metadata but its file is missing", id);
            return Err(CatalogError::gone(id));
        }
        let content = self.files.read(id)?;
        Ok(BookFile {
            path: self.files.path(id),
            record,
            content,
        })
    }

    /// Store `content` and register a new record for it
    pub fn create(&self, book: NewBook, content: &[u8]) -> CatalogResult<BookRecord> {
        let _guard = self.lock();
        let mut records = self.metadata.load();

        let id = self.generate_id(&records);
        self.files.save(&id, content)?;

        let record = BookRecord::new(&id, book);
        records.push(record.clone());

        if let Err(e) = self.metadata.save(&records) {
            error!("Failed to save metadata for new book {}: {}", id, e);
            if let Err(cleanup) = self.files.delete(&id) {
                error!("Orphan file left for book {} at {}: {}", id, self.files.path(&id).display(), cleanup);
            }
            return Err(e);
        }

        info!("Created book {} ({} bytes)", id, content.len());
        Ok(record)
    }

    /// Apply `changes` and optionally replace the PDF of an existing book
    pub fn update(&self, id: &str, changes: BookChanges, content: Option<&[u8]>) -> CatalogResult<BookRecord> {
        let _guard = self.lock();
        let mut records = self.metadata.load();
        let index = locate(&records, id).ok_or_else(|| CatalogError::not_found(id))?;

        if changes.is_empty() && content.is_none() {
            debug!("Update for book {} carries no changes, refreshing timestamp only", id);
        }

        if let Some(content) = content {
            self.files.delete(id)?;
            self.files.save(id, content)?;
            debug!("Replaced file for book {}", id);
        }

        let record = &mut records[index];
        record.apply(changes);
        record.uploaded_at = Utc::now();
        let updated = record.clone();

        if let Err(e) = self.metadata.save(&records) {
            error!("Failed to save metadata for updated book {}: {}", id, e);
            return Err(e);
        }

        info!("Updated book {}", id);
        Ok(updated)
    }

    /// Remove a book's file and then its record
    pub fn delete(&self, id: &str) -> CatalogResult<()> {
        let _guard = self.lock();
        let mut records = self.metadata.load();
        let index = locate(&records, id).ok_or_else(|| CatalogError::not_found(id))?;

        self.files.delete(id)?;
        records.remove(index);

        if let Err(e) = self.metadata.save(&records) {
            error!("Deleted file for book {} but failed to save metadata: {}", id, e);
            return Err(e);
        }

        info!("Deleted book {}", id);
        Ok(())
    }
}
