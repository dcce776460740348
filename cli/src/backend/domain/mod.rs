//! # Domain Module
//!
//! Per-entity services bridging callers to the local store, plus the pure
//! export/report generators and the dual-calendar helpers.

pub mod account_service;
pub mod calendar;
pub mod category_service;
pub mod commands;
pub mod export_service;
pub mod report_service;
pub mod settings_service;
pub mod transaction_service;

pub use account_service::AccountService;
pub use category_service::CategoryService;
pub use export_service::ExportService;
pub use report_service::ReportService;
pub use settings_service::SettingsService;
pub use transaction_service::TransactionService;
