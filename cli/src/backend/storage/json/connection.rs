//! File-system backend for the persisted aggregate.
//!
//! `JsonConnection` owns the data directory and the single blob file inside
//! it. Writes go through a temp file followed by a rename so a crash midway
//! never leaves a half-written blob behind.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::backend::storage::traits::{BlobStore, StoreError};

/// Fixed file name of the persisted aggregate, the file-system equivalent of
/// the single storage key earlier builds used in the browser.
const STORAGE_FILE: &str = "expense_tracker_data.json";

/// Manages the data directory and the blob file inside it.
#[derive(Debug, Clone)]
pub struct JsonConnection {
    base_directory: PathBuf,
}

impl JsonConnection {
    /// Create a connection rooted at `base_directory`, creating the directory
    /// if needed.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self, StoreError> {
        let base_path = base_directory.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Create a connection in the default data directory,
    /// `~/Documents/Nepali Wallet` (falling back to the home directory when
    /// there is no Documents folder).
    pub fn new_default() -> Result<Self, StoreError> {
        let documents = dirs::document_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StoreError::Backend("could not determine home directory".to_string()))?;
        let data_dir = documents.join("Nepali Wallet");
        info!("Using data directory: {}", data_dir.display());
        Self::new(data_dir)
    }

    /// The directory holding the blob file and auxiliary files (sync config).
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn blob_path(&self) -> PathBuf {
        self.base_directory.join(STORAGE_FILE)
    }
}

impl BlobStore for JsonConnection {
    fn read(&self) -> Result<Option<String>, StoreError> {
        let path = self.blob_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        Ok(Some(contents))
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        if !self.base_directory.exists() {
            fs::create_dir_all(&self.base_directory)?;
        }
        let path = self.blob_path();
        let tmp_path = self.base_directory.join(format!("{STORAGE_FILE}.tmp"));
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &path)?;
        debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let path = self.blob_path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
