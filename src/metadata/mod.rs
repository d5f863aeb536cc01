//! Metadata Storage Layer Abstraction
//!
//! This module provides an abstraction over metadata storage backends.
//! The catalog's metadata is an ordered collection of book records that is
//! always read and written as a whole, so backends only need to implement
//! `load` and `save`; lookups and filtering are built on top of those.

pub mod json_store;
pub mod mock_store;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CatalogResult;
use crate::storage::pdf_filename;

/// Book identifier type
pub type BookId = String;

/// A single catalog entry describing one PDF
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookRecord {
    pub id: BookId,
    pub title: String,
    pub class: String,
    pub category: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Always `<id>.pdf`
    pub filename: String,
    #[serde(alias = "uploadedAt")]
    pub uploaded_at: DateTime<Utc>,
}

impl BookRecord {
    /// Build a fresh record for a newly generated id
    pub fn new(id: &str, book: NewBook) -> Self {
        Self {
            id: id.to_string(),
            title: book.title,
            class: book.class,
            category: book.category,
            author: book.author,
            filename: pdf_filename(id),
            uploaded_at: Utc::now(),
        }
    }

    /// Overwrite only the fields present in `changes`
    pub fn apply(&mut self, changes: BookChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(class) = changes.class {
            self.class = class;
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(author) = changes.author {
            self.author = author;
        }
    }
}

/// Descriptive fields supplied when a book is created
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub class: String,
    pub category: String,
    pub author: Option<String>,
}

/// Partial update. `None` keeps the stored value; `author: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub class: Option<String>,
    pub category: Option<String>,
    pub author: Option<Option<String>>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.class.is_none() && self.category.is_none() && self.author.is_none()
    }
}

/// AND-composed list filters
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BookFilter {
    /// Exact match on `class`
    pub class: Option<String>,
    /// Exact match on `category`
    pub category: Option<String>,
    /// Case-insensitive substring of `title` or `author`
    pub q: Option<String>,
}

impl BookFilter {
    pub fn matches(&self, record: &BookRecord) -> bool {
        if let Some(class) = &self.class {
            if &record.class != class {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &record.category != category {
                return false;
            }
        }
        if let Some(q) = &self.q {
            let needle = q.to_lowercase();
            let in_title = record.title.to_lowercase().contains(&needle);
            let in_author = record
                .author
                .as_deref()
                .map(|a| a.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_title && !in_author {
                return false;
            }
        }
        true
    }
}

/// Position of the record with `id` in a loaded snapshot.
pub fn locate(records: &[BookRecord], id: &str) -> Option<usize> {
    records.iter().position(|r| r.id == id)
}

/// Trait defining the metadata storage interface
pub trait MetadataStorage: Send + Sync {
    /// Read the whole collection. Missing or malformed documents yield an
    /// empty collection rather than an error.
    fn load(&self) -> Vec<BookRecord>;

    /// Read the whole collection, failing with `Unreadable` where `load`
    /// would have recovered: a missing or malformed document, or entries
    /// that do not decode.
    fn load_strict(&self) -> CatalogResult<Vec<BookRecord>> {
        Ok(self.load())
    }

    /// Replace the whole collection. Readers never observe a partial write.
    fn save(&self, records: &[BookRecord]) -> CatalogResult<()>;

    /// Find the first record with `id`
    fn find(&self, id: &str) -> Option<(usize, BookRecord)> {
        let records = self.load();
        locate(&records, id).map(|index| (index, records[index].clone()))
    }

    /// All records matching `filter`, in insertion order
    fn filter(&self, filter: &BookFilter) -> Vec<BookRecord> {
        self.load()
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect()
    }
}
