//! # Storage Module
//!
//! Single-blob persistence for the wallet aggregate. The [`store::LocalStore`]
//! owns all persisted state and broadcasts change notifications; the
//! [`traits::BlobStore`] abstraction lets it run over a JSON file on disk, in
//! plain memory, or a test double.

pub mod json;
pub mod memory;
pub mod store;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

pub use json::JsonConnection;
pub use memory::MemoryBlobStore;
pub use store::{ListenerId, LocalStore};
pub use traits::{BlobStore, StoreError};
