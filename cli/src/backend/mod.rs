//! # Backend Module
//!
//! Wires the local store, domain services and cloud sync together for the
//! CLI frontend. All operations are synchronous; the only background work is
//! the auto-sync debounce worker.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

pub mod domain;
pub mod storage;
pub mod sync;

use domain::{
    AccountService, CategoryService, ExportService, ReportService, SettingsService,
    TransactionService,
};
use storage::{JsonConnection, LocalStore};
use sync::auto::DEFAULT_DEBOUNCE;
use sync::{AutoSync, HttpRemoteStore, RemoteStore, StaticConnectivity, SyncConfig, SyncService};

/// Main backend struct that orchestrates all services.
pub struct Backend {
    pub store: Arc<LocalStore>,
    pub transaction_service: TransactionService,
    pub category_service: CategoryService,
    pub account_service: AccountService,
    pub settings_service: SettingsService,
    pub export_service: ExportService,
    pub report_service: ReportService,
    pub sync_service: Arc<SyncService>,
    /// Keeps the change listener and debounce worker alive for the session.
    pub auto_sync: Option<AutoSync>,
    pub data_dir: PathBuf,
}

impl Backend {
    /// Create a backend over the default data directory.
    pub fn new() -> Result<Self> {
        Self::with_connection(JsonConnection::new_default()?)
    }

    /// Create a backend over an explicit data directory.
    pub fn with_connection(connection: JsonConnection) -> Result<Self> {
        let data_dir = connection.base_directory().to_path_buf();
        let store = Arc::new(LocalStore::new(Box::new(connection)));

        let sync_config = SyncConfig::load_or_default(&data_dir)?;
        let remote: Option<Arc<dyn RemoteStore>> = match &sync_config.base_url {
            Some(base_url) => Some(Arc::new(HttpRemoteStore::new(base_url.clone())?)),
            None => None,
        };
        let connectivity = Arc::new(StaticConnectivity::default());
        let sync_service = Arc::new(SyncService::new(
            store.clone(),
            remote,
            sync_config.user_id.clone(),
            connectivity,
        ));
        let auto_sync = Some(AutoSync::start(
            store.clone(),
            sync_service.clone(),
            DEFAULT_DEBOUNCE,
        ));

        Ok(Backend {
            transaction_service: TransactionService::new(store.clone()),
            category_service: CategoryService::new(store.clone()),
            account_service: AccountService::new(store.clone()),
            settings_service: SettingsService::new(store.clone()),
            export_service: ExportService::new(),
            report_service: ReportService::new(),
            sync_service,
            auto_sync,
            store,
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn backend_wires_services_over_one_store() {
        let temp_dir = TempDir::new().unwrap();
        let backend =
            Backend::with_connection(JsonConnection::new(temp_dir.path()).unwrap()).unwrap();

        // Sync is unconfigured until the user provides endpoint + user id.
        assert!(backend.sync_service.sync_data().is_err());
        assert_eq!(backend.settings_service.currency().unwrap(), "Rs");
        assert_eq!(backend.data_dir, temp_dir.path());
    }
}
