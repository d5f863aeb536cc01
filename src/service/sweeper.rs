//! Orphan sweep for reconciling the file store with the metadata store
//!
//! Files with no referencing record are removed; records whose file is
//! missing are reported but kept, since the metadata is the source of truth
//! and a later update can restore the file. The sweep refuses to run against
//! a metadata document it cannot read in full.

use crate::error::CatalogResult;
use crate::metadata::BookId;
use crate::service::CatalogService;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of a sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Ids whose unreferenced PDFs were deleted
    pub removed_files: Vec<BookId>,
    /// Ids of records that point at a missing PDF
    pub dangling_records: Vec<BookId>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.removed_files.is_empty() && self.dangling_records.is_empty()
    }
}

impl CatalogService {
    /// Reconcile the two stores under the write lock
    pub fn sweep_orphans(&self) -> CatalogResult<SweepReport> {
        let _guard = self.lock();
        let records = self.metadata.load_strict().map_err(|e| {
            warn!("Skipping orphan sweep: {}", e);
            e
        })?;
        let live: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();

        let mut report = SweepReport::default();

        for id in self.files.list_ids()? {
            if live.contains(id.as_str()) {
                continue;
            }
            match self.files.delete(&id) {
                Ok(()) => {
                    info!("Removed orphan file for {}", id);
                    report.removed_files.push(id);
                }
                Err(e) => warn!("Failed to remove orphan file for {}: {}", id, e),
            }
        }

        for record in &records {
            if !self.files.exists(&record.id) {
                warn!("Book {} references missing file {}", record.id, record.filename);
                report.dangling_records.push(record.id.clone());
            }
        }

        info!("Orphan sweep finished: {} files removed, {} dangling records",
              report.removed_files.len(), report.dangling_records.len());
        Ok(report)
    }
}
