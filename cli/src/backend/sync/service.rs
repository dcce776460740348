//! Cloud sync service.
//!
//! Best-effort, whole-document synchronization of the local aggregate with a
//! per-user remote document. There is no merge, no conflict detection and no
//! partial sync: upload replaces the remote document (last writer wins), and
//! restore replaces the local aggregate. Two devices syncing concurrently
//! race and the later write wins with no warning to either party.
//!
//! Failures never touch local state; they surface as an error string in the
//! service status for the caller to render.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};

use shared::SyncDocument;

use crate::backend::storage::LocalStore;

use super::connectivity::{ConnectivityObserver, SubscriptionId};
use super::remote::RemoteStore;

/// Snapshot of the sync component's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub is_restoring: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
    pub is_online: bool,
}

#[derive(Default)]
struct SyncState {
    is_syncing: bool,
    is_restoring: bool,
    last_sync_time: Option<DateTime<Utc>>,
    sync_error: Option<String>,
}

pub struct SyncService {
    store: Arc<LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    user_id: Option<String>,
    connectivity: Arc<dyn ConnectivityObserver>,
    subscription: SubscriptionId,
    online: Arc<AtomicBool>,
    state: Mutex<SyncState>,
}

impl SyncService {
    /// Create the service and subscribe to connectivity changes for the
    /// lifetime of the session (the subscription is dropped on teardown).
    pub fn new(
        store: Arc<LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        user_id: Option<String>,
        connectivity: Arc<dyn ConnectivityObserver>,
    ) -> Self {
        let online = Arc::new(AtomicBool::new(connectivity.is_online()));
        let online_for_listener = online.clone();
        let subscription = connectivity.subscribe(Box::new(move |is_online| {
            online_for_listener.store(is_online, Ordering::SeqCst);
        }));
        Self {
            store,
            remote,
            user_id,
            connectivity,
            subscription,
            online,
            state: Mutex::new(SyncState::default()),
        }
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.state.lock().unwrap();
        SyncStatus {
            is_syncing: state.is_syncing,
            is_restoring: state.is_restoring,
            last_sync_time: state.last_sync_time,
            sync_error: state.sync_error.clone(),
            is_online: self.online.load(Ordering::SeqCst),
        }
    }

    /// Upload the entire local aggregate to the user's remote document.
    ///
    /// Refused when the local aggregate is entirely empty: a first launch
    /// must never wipe an existing cloud backup with emptiness.
    ///
    /// This path never calls `save_data`, so a store listener that triggers
    /// sync on change cannot loop.
    pub fn sync_data(&self) -> Result<()> {
        let result = self.try_sync();
        let mut state = self.state.lock().unwrap();
        state.is_syncing = false;
        match &result {
            Ok(()) => {
                state.last_sync_time = Some(Utc::now());
                state.sync_error = None;
            }
            Err(err) => state.sync_error = Some(err.to_string()),
        }
        result
    }

    fn try_sync(&self) -> Result<()> {
        let user_id = self
            .user_id
            .as_ref()
            .ok_or_else(|| anyhow!("cannot sync: not signed in"))?;
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| anyhow!("cannot sync: no remote configured"))?;
        if !self.online.load(Ordering::SeqCst) {
            return Err(anyhow!("cannot sync: device is offline"));
        }

        {
            let mut state = self.state.lock().unwrap();
            state.is_syncing = true;
            state.sync_error = None;
        }

        let data = self.store.get_data()?;
        if data.is_empty() {
            return Err(anyhow!("no data to sync"));
        }

        let document = SyncDocument {
            data,
            last_synced_at: Utc::now().to_rfc3339(),
            user_id: user_id.clone(),
            updated_at: None,
        };
        remote.save_document(user_id, &document)?;
        info!("Synced local data to cloud for user {user_id}");
        Ok(())
    }

    /// Replace the entire local aggregate with the user's remote document.
    ///
    /// Destructive by design: there is no merge and no backup-before-
    /// overwrite. The caller is responsible for obtaining explicit user
    /// confirmation first. When no remote document exists, local state is
    /// left untouched.
    pub fn restore_data(&self) -> Result<()> {
        let result = self.try_restore();
        let mut state = self.state.lock().unwrap();
        state.is_restoring = false;
        match &result {
            Ok(()) => state.sync_error = None,
            Err(err) => state.sync_error = Some(err.to_string()),
        }
        result
    }

    fn try_restore(&self) -> Result<()> {
        let user_id = self
            .user_id
            .as_ref()
            .ok_or_else(|| anyhow!("cannot restore: not signed in"))?;
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| anyhow!("cannot restore: no remote configured"))?;

        {
            let mut state = self.state.lock().unwrap();
            state.is_restoring = true;
            state.sync_error = None;
        }

        match remote.fetch_document(user_id)? {
            Some(document) => {
                self.store.save_data(&document.data)?;
                info!(
                    "Restored cloud data for user {user_id} (last synced {})",
                    document.last_synced_at
                );
                Ok(())
            }
            None => {
                warn!("No cloud data found for user {user_id}");
                Err(anyhow!("no data found in cloud to restore"))
            }
        }
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        self.connectivity.unsubscribe(self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sync::connectivity::StaticConnectivity;
    use crate::backend::sync::remote::test_support::MemoryRemoteStore;
    use chrono::NaiveDate;
    use shared::{NewTransaction, StorageData, TransactionType};

    struct Harness {
        store: Arc<LocalStore>,
        remote: Arc<MemoryRemoteStore>,
        connectivity: Arc<StaticConnectivity>,
        sync: SyncService,
    }

    fn harness() -> Harness {
        let store = Arc::new(LocalStore::without_persistence());
        let remote = Arc::new(MemoryRemoteStore::new());
        let connectivity = Arc::new(StaticConnectivity::default());
        let sync = SyncService::new(
            store.clone(),
            Some(remote.clone()),
            Some("u-1".to_string()),
            connectivity.clone(),
        );
        Harness {
            store,
            remote,
            connectivity,
            sync,
        }
    }

    fn add_sample_transaction(store: &LocalStore, amount: f64) {
        store
            .add_transaction(NewTransaction {
                transaction_type: TransactionType::Income,
                amount,
                category: "salary".to_string(),
                account: "cash".to_string(),
                description: "Pay".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            })
            .unwrap();
    }

    #[test]
    fn empty_local_aggregate_is_never_uploaded() {
        let h = harness();
        let err = h.sync.sync_data().unwrap_err();
        assert!(err.to_string().contains("no data to sync"));
        assert_eq!(h.remote.writes.load(Ordering::SeqCst), 0);
        assert_eq!(
            h.sync.status().sync_error.as_deref(),
            Some("no data to sync")
        );
        assert!(h.sync.status().last_sync_time.is_none());
    }

    #[test]
    fn sync_uploads_the_whole_aggregate() {
        let h = harness();
        add_sample_transaction(&h.store, 500.0);

        h.sync.sync_data().unwrap();

        let document = h.remote.get("u-1").unwrap();
        assert_eq!(document.user_id, "u-1");
        assert_eq!(document.data, h.store.get_data().unwrap());
        assert!(document.updated_at.is_some(), "server assigns updatedAt");
        let status = h.sync.status();
        assert!(status.last_sync_time.is_some());
        assert_eq!(status.sync_error, None);
        assert!(!status.is_syncing);
    }

    #[test]
    fn sync_requires_connectivity_user_and_remote() {
        let h = harness();
        add_sample_transaction(&h.store, 500.0);

        h.connectivity.set_online(false);
        let err = h.sync.sync_data().unwrap_err();
        assert!(err.to_string().contains("offline"));
        assert_eq!(h.remote.writes.load(Ordering::SeqCst), 0);
        assert!(!h.sync.status().is_online);
        h.connectivity.set_online(true);

        let signed_out = SyncService::new(
            h.store.clone(),
            Some(h.remote.clone()),
            None,
            h.connectivity.clone(),
        );
        assert!(signed_out.sync_data().is_err());

        let unconfigured = SyncService::new(
            h.store.clone(),
            None,
            Some("u-1".to_string()),
            h.connectivity.clone(),
        );
        assert!(unconfigured.sync_data().is_err());
        assert_eq!(h.remote.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn restore_is_a_total_overwrite_not_a_merge() {
        let h = harness();
        // Local data A.
        add_sample_transaction(&h.store, 111.0);

        // Remote data B, entirely different.
        let mut remote_data = StorageData::default();
        remote_data.settings.currency = "NPR".to_string();
        remote_data.custom_accounts.push(shared::Account {
            id: "custom-7".to_string(),
            name: "Esewa".to_string(),
            icon: "📱".to_string(),
        });
        h.remote.insert(
            "u-1",
            SyncDocument {
                data: remote_data.clone(),
                last_synced_at: "2024-01-01T00:00:00Z".to_string(),
                user_id: "u-1".to_string(),
                updated_at: None,
            },
        );

        h.sync.restore_data().unwrap();

        // Exactly B, never a merge of A and B.
        assert_eq!(h.store.get_data().unwrap(), remote_data);
    }

    #[test]
    fn restore_without_a_remote_document_leaves_local_data_alone() {
        let h = harness();
        add_sample_transaction(&h.store, 111.0);
        let before = h.store.get_data().unwrap();

        let err = h.sync.restore_data().unwrap_err();
        assert!(err.to_string().contains("no data found"));
        assert_eq!(h.store.get_data().unwrap(), before);
        assert!(h.sync.status().sync_error.is_some());
    }

    #[test]
    fn remote_failures_surface_as_sync_errors_and_leave_state_untouched() {
        let h = harness();
        add_sample_transaction(&h.store, 500.0);
        let before = h.store.get_data().unwrap();
        h.remote.fail_with("503 service unavailable");

        assert!(h.sync.sync_data().is_err());
        assert!(h.sync.restore_data().is_err());

        let status = h.sync.status();
        assert!(status.sync_error.unwrap().contains("503"));
        assert!(!status.is_syncing);
        assert!(!status.is_restoring);
        assert_eq!(h.store.get_data().unwrap(), before);
    }

    #[test]
    fn a_successful_sync_clears_the_previous_error() {
        let h = harness();
        assert!(h.sync.sync_data().is_err());
        assert!(h.sync.status().sync_error.is_some());

        add_sample_transaction(&h.store, 500.0);
        h.sync.sync_data().unwrap();
        assert_eq!(h.sync.status().sync_error, None);
    }
}
