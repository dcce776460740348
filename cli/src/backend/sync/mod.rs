//! # Cloud Sync Module
//!
//! One-shot save/restore of the entire aggregate against a per-user remote
//! document, gated by connectivity and sign-in state, plus the auto-sync
//! listener that uploads after local changes.

pub mod auto;
pub mod config;
pub mod connectivity;
pub mod remote;
pub mod service;

pub use auto::AutoSync;
pub use config::SyncConfig;
pub use connectivity::{ConnectivityObserver, StaticConnectivity};
pub use remote::{HttpRemoteStore, RemoteStore};
pub use service::{SyncService, SyncStatus};
