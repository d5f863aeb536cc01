//! Local directory file storage implementation

use crate::error::{CatalogError, CatalogResult};
use crate::storage::{pdf_filename, FileStorage};
use log::{debug, info, warn};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Stores each book as `<dir>/<id>.pdf`
pub struct LocalFileStore {
    storage_path: PathBuf,
}

impl LocalFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> CatalogResult<Self> {
        let storage_path = dir.into();
        if !storage_path.exists() {
            fs::create_dir_all(&storage_path)?;
            info!("Created PDF directory: {}", storage_path.display());
        }
        info!("Using PDF directory: {}", storage_path.display());
        Ok(Self { storage_path })
    }
}

impl FileStorage for LocalFileStore {
    fn save(&self, id: &str, content: &[u8]) -> CatalogResult<PathBuf> {
        let target = self.path(id);

        // Staged next to the target so the rename stays on one filesystem
        let mut tmp = NamedTempFile::new_in(&self.storage_path)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;

        info!("Wrote {} bytes for book {} to {}", content.len(), id, target.display());
        Ok(target)
    }

    fn exists(&self, id: &str) -> bool {
        self.path(id).is_file()
    }

    fn delete(&self, id: &str) -> CatalogResult<()> {
        let target = self.path(id);
        match fs::remove_file(&target) {
            Ok(()) => {
                info!("Deleted file for book {}", id);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("File for book {} already absent", id);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", target.display(), e);
                Err(CatalogError::Io(e))
            }
        }
    }

    fn path(&self, id: &str) -> PathBuf {
        self.storage_path.join(pdf_filename(id))
    }

    fn read(&self, id: &str) -> CatalogResult<Vec<u8>> {
        match fs::read(self.path(id)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CatalogError::gone(id)),
            Err(e) => Err(CatalogError::Io(e)),
        }
    }

    fn list_ids(&self) -> CatalogResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.storage_path)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("pdf") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_local_file_store_basic_operations() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path().join("pdfs")).unwrap();
        let content = b"%PDF-1.4 hello";

        assert!(!store.exists("b1"));
        let path = store.save("b1", content).unwrap();
        assert_eq!(path, dir.path().join("pdfs").join("b1.pdf"));
        assert!(store.exists("b1"));
        assert_eq!(store.read("b1").unwrap(), content);

        // Replacement overwrites in place
        store.save("b1", b"%PDF-1.7 replaced").unwrap();
        assert_eq!(store.read("b1").unwrap(), b"%PDF-1.7 replaced");

        store.delete("b1").unwrap();
        assert!(!store.exists("b1"));
    }

    #[test]
    fn test_local_file_store_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path()).unwrap();

        store.delete("never-written").unwrap();
        store.save("b2", b"%PDF").unwrap();
        store.delete("b2").unwrap();
        store.delete("b2").unwrap();
    }

    #[test]
    fn test_local_file_store_read_missing_is_gone() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path()).unwrap();
        assert!(matches!(store.read("b404"), Err(CatalogError::Gone(id)) if id == "b404"));
    }

    #[test]
    fn test_path_does_not_touch_filesystem() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path()).unwrap();
        let path = store.path("bnothere");
        assert_eq!(path.file_name().unwrap(), "bnothere.pdf");
        assert!(!path.exists());
    }

    #[test]
    fn test_list_ids_ignores_other_files() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path()).unwrap();
        store.save("bB", b"%PDF").unwrap();
        store.save("bA", b"%PDF").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        assert_eq!(store.list_ids().unwrap(), vec!["bA", "bB"]);
    }
}
