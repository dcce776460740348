//! Command and query shapes accepted by the domain services.

pub mod reports;
pub mod transactions;
