//! # Storage Traits
//!
//! This module defines the storage abstraction that lets the local store run
//! against different persistence backends (a JSON file on disk, plain memory
//! for runtimes without a filesystem, test doubles) without modification.

use thiserror::Error;

/// The single failure type returned by every store operation.
///
/// Earlier builds of the app swallowed persistence failures inside the store
/// and surfaced them nowhere, which left callers unable to tell "nothing to
/// do" from "write failed". Every operation now reports its outcome through
/// this type and the caller decides whether to log or propagate.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The persistence backend could not be reached or refused the request
    /// (missing directory, permissions, quota, ...).
    #[error("storage backend unavailable: {0}")]
    Backend(String),

    /// The in-memory aggregate could not be serialized for writing.
    #[error("failed to serialize data: {0}")]
    Serialize(String),

    /// A persisted blob declared a schema version this build cannot handle.
    #[error("cannot migrate data from schema version {from}: {reason}")]
    Migration { from: u32, reason: String },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// A place the serialized aggregate can live.
///
/// The store persists its entire state as one blob under one key, so the
/// backend contract is deliberately minimal: read it, replace it, erase it.
pub trait BlobStore: Send + Sync {
    /// Read the persisted blob, `None` when nothing has been written yet.
    fn read(&self) -> Result<Option<String>, StoreError>;

    /// Replace the persisted blob wholesale.
    fn write(&self, contents: &str) -> Result<(), StoreError>;

    /// Erase the persisted blob entirely.
    fn clear(&self) -> Result<(), StoreError>;
}
