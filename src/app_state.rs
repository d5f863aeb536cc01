//! Application State Management
//!
//! This module provides the application state that contains the catalog
//! service and its store backends, following the dependency injection pattern.

use std::sync::Arc;
use log::info;

use crate::config::{AppConfig, MetadataBackend, StorageBackend};
use crate::error::CatalogResult;
use crate::metadata::{json_store::JsonMetadataStore, mock_store::MockMetadataStore, MetadataStorage};
use crate::service::CatalogService;
use crate::storage::{local_store::LocalFileStore, mock_store::MockFileStore, FileStorage};

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub config: AppConfig,
}

impl AppState {
    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> CatalogResult<Self> {
        info!("Initializing application state with configuration");

        let files: Arc<dyn FileStorage> = match config.storage.backend {
            StorageBackend::Local => {
                info!("Using local file storage backend with pdf_dir: {}", config.storage.pdf_dir.display());
                Arc::new(LocalFileStore::new(&config.storage.pdf_dir)?)
            }
            StorageBackend::Mock => {
                info!("Using mock file storage backend");
                Arc::new(MockFileStore::new())
            }
        };

        let metadata: Arc<dyn MetadataStorage> = match config.metadata.backend {
            MetadataBackend::Json => {
                info!("Using JSON metadata backend with metadata_path: {}", config.metadata.metadata_path.display());
                Arc::new(JsonMetadataStore::new(&config.metadata.metadata_path))
            }
            MetadataBackend::Mock => {
                info!("Using mock metadata backend");
                Arc::new(MockMetadataStore::new())
            }
        };

        let catalog = Arc::new(CatalogService::new(metadata, files));

        info!("Application state initialized successfully");
        Ok(Self { catalog, config })
    }

    /// Create application state for testing with mock backends
    pub fn new_for_testing() -> Self {
        let metadata: Arc<dyn MetadataStorage> = Arc::new(MockMetadataStore::new());
        let files: Arc<dyn FileStorage> = Arc::new(MockFileStore::new());

        Self {
            catalog: Arc::new(CatalogService::new(metadata, files)),
            config: AppConfig::default(),
        }
    }
}
