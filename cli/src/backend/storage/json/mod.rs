//! # JSON File Storage
//!
//! File-based persistence for the wallet aggregate: one JSON document under
//! a fixed file name inside the application data directory.

pub mod connection;

pub use connection::JsonConnection;
