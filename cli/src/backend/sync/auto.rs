//! Auto-sync wiring.
//!
//! Registers a store change listener that triggers an upload when auto-sync
//! is enabled and the device is online. Triggers are debounced on a worker
//! thread so a burst of edits becomes one upload. The sync path itself never
//! writes to the store, so change → sync cannot loop.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::backend::storage::{ListenerId, LocalStore};

use super::service::SyncService;

/// Debounce window matching the app's historical two-second batch.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

enum Event {
    Changed,
    Shutdown,
}

/// Handle owning the listener registration and the debounce worker. Dropping
/// it detaches auto-sync cleanly.
pub struct AutoSync {
    store: Arc<LocalStore>,
    listener_id: ListenerId,
    sender: mpsc::Sender<Event>,
    worker: Option<JoinHandle<()>>,
}

impl AutoSync {
    /// Start watching the store. Only changes made while
    /// `settings.auto_sync` is enabled schedule an upload.
    pub fn start(store: Arc<LocalStore>, sync: Arc<SyncService>, debounce: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::spawn(move || worker_loop(receiver, sync, debounce));

        let listener_sender = sender.clone();
        let listener_id = store.on_change(move |data| {
            if data.settings.auto_sync {
                let _ = listener_sender.send(Event::Changed);
            }
        });

        Self {
            store,
            listener_id,
            sender,
            worker: Some(worker),
        }
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        self.store.remove_listener(self.listener_id);
        let _ = self.sender.send(Event::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(receiver: mpsc::Receiver<Event>, sync: Arc<SyncService>, debounce: Duration) {
    loop {
        match receiver.recv() {
            Ok(Event::Changed) => {
                // Absorb further changes until the window goes quiet.
                let mut deadline = Instant::now() + debounce;
                loop {
                    let timeout = deadline.saturating_duration_since(Instant::now());
                    match receiver.recv_timeout(timeout) {
                        Ok(Event::Changed) => deadline = Instant::now() + debounce,
                        Ok(Event::Shutdown) => return,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }

                if !sync.status().is_online {
                    debug!("Skipping auto-sync: device is offline");
                    continue;
                }
                if let Err(err) = sync.sync_data() {
                    warn!("Auto-sync failed: {err}");
                }
            }
            Ok(Event::Shutdown) | Err(_) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sync::connectivity::StaticConnectivity;
    use crate::backend::sync::remote::test_support::MemoryRemoteStore;
    use chrono::NaiveDate;
    use shared::{NewTransaction, SettingsPatch, TransactionType};
    use std::sync::atomic::Ordering;

    fn add_transaction(store: &LocalStore, amount: f64) {
        store
            .add_transaction(NewTransaction {
                transaction_type: TransactionType::Expense,
                amount,
                category: "food".to_string(),
                account: "cash".to_string(),
                description: "Lunch".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            })
            .unwrap();
    }

    fn wiring() -> (Arc<LocalStore>, Arc<MemoryRemoteStore>, Arc<SyncService>) {
        let store = Arc::new(LocalStore::without_persistence());
        let remote = Arc::new(MemoryRemoteStore::new());
        let sync = Arc::new(SyncService::new(
            store.clone(),
            Some(remote.clone()),
            Some("u-1".to_string()),
            Arc::new(StaticConnectivity::default()),
        ));
        (store, remote, sync)
    }

    #[test]
    fn a_burst_of_changes_becomes_one_upload() {
        let (store, remote, sync) = wiring();
        store
            .update_settings(SettingsPatch {
                currency: None,
                auto_sync: Some(true),
            })
            .unwrap();

        let _auto = AutoSync::start(store.clone(), sync, Duration::from_millis(30));
        add_transaction(&store, 1.0);
        add_transaction(&store, 2.0);
        add_transaction(&store, 3.0);

        thread::sleep(Duration::from_millis(400));
        assert_eq!(remote.writes.load(Ordering::SeqCst), 1);

        // The upload itself does not feed back into another upload.
        thread::sleep(Duration::from_millis(200));
        assert_eq!(remote.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn changes_with_auto_sync_disabled_are_ignored() {
        let (store, remote, sync) = wiring();
        let _auto = AutoSync::start(store.clone(), sync, Duration::from_millis(10));
        add_transaction(&store, 1.0);

        thread::sleep(Duration::from_millis(150));
        assert_eq!(remote.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_the_handle_detaches_the_listener() {
        let (store, remote, sync) = wiring();
        store
            .update_settings(SettingsPatch {
                currency: None,
                auto_sync: Some(true),
            })
            .unwrap();

        let auto = AutoSync::start(store.clone(), sync, Duration::from_millis(10));
        drop(auto);
        add_transaction(&store, 1.0);

        thread::sleep(Duration::from_millis(150));
        assert_eq!(remote.writes.load(Ordering::SeqCst), 0);
    }
}
