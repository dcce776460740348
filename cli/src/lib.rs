//! Nepali Wallet: local-first expense tracking.
//!
//! The backend module owns everything below the UI: the single-blob local
//! store with change notification, the per-entity domain services, the
//! dual-calendar helpers, CSV/TXT export, PDF report generation and the
//! whole-document cloud sync.

pub mod backend;
