//! Connectivity observation.
//!
//! The platform network API is an external collaborator; this module only
//! defines the observation contract the sync service consumes: the current
//! status plus a change-event stream. The default assumption is online until
//! proven otherwise.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Identifies a connectivity subscription so it can be removed on teardown.
pub type SubscriptionId = u64;

pub type StatusListener = Box<dyn Fn(bool) + Send + Sync>;

/// Current connectivity status plus a change-event stream. Subscribers must
/// unsubscribe when they are torn down.
pub trait ConnectivityObserver: Send + Sync {
    fn is_online(&self) -> bool;

    /// Register a callback invoked with the new status on every change.
    fn subscribe(&self, listener: StatusListener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// Process-local connectivity state. Real network observation lives outside
/// this crate; deployments flip the flag from whatever platform signal they
/// have, and tests drive it directly.
pub struct StaticConnectivity {
    online: AtomicBool,
    listeners: Mutex<Vec<(SubscriptionId, StatusListener)>>,
    next_id: AtomicU64,
}

impl StaticConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Update the status and notify subscribers when it changed.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous != online {
            for (_, listener) in self.listeners.lock().unwrap().iter() {
                listener(online);
            }
        }
    }
}

impl Default for StaticConnectivity {
    fn default() -> Self {
        // Online until proven otherwise.
        Self::new(true)
    }
}

impl ConnectivityObserver for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn subscribe(&self, listener: StatusListener) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().unwrap().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|(listener_id, _)| *listener_id != id);
    }
}
