//! In-memory blob storage.
//!
//! Used when the runtime has no persistence backend available (headless or
//! ephemeral contexts) and by tests. Data lives only as long as the process.

use std::sync::Mutex;

use super::traits::{BlobStore, StoreError};

/// A `BlobStore` holding the blob in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    contents: Mutex<Option<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.contents.lock().unwrap().clone())
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        *self.contents.lock().unwrap() = Some(contents.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.contents.lock().unwrap() = None;
        Ok(())
    }
}
