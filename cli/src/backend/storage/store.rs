//! # Local Store
//!
//! Sole owner of persisted application state. The entire aggregate is read,
//! mutated as a copy, and written back wholesale on every operation; after a
//! successful write every registered change listener runs synchronously in
//! registration order.
//!
//! ## Schema versioning
//!
//! Persisted blobs carry a `schemaVersion` field. On load the raw JSON is
//! passed through a migration table keyed by source version before the typed
//! aggregate is exposed to callers, so shape changes never require manual
//! intervention. Blobs written before versioning existed load as version 0.
//!
//! ## Failure reporting
//!
//! Every operation returns `Result<_, StoreError>`. The one deliberate
//! exception to strictness: a malformed blob is logged and replaced with the
//! default aggregate rather than reported, matching how the app has always
//! treated unreadable local data.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use log::{error, info, warn};
use serde_json::Value;

use shared::{
    builtin_accounts, builtin_expense_categories, builtin_income_categories, Account, Category,
    NewAccount, NewCategory, NewTransaction, Settings, SettingsPatch, StorageData, Transaction,
    TransactionPatch, TransactionType, LOCAL_USER_ID, SCHEMA_VERSION,
};

use super::memory::MemoryBlobStore;
use super::traits::{BlobStore, StoreError};

/// Identifies a registered change listener so it can be removed later.
pub type ListenerId = u64;

type Listener = Box<dyn Fn(&StorageData) + Send + Sync>;

type MigrationFn = fn(Value) -> Result<Value, String>;

/// Migration table keyed by source schema version. Each entry lifts a blob
/// one version; they are applied in sequence until `SCHEMA_VERSION`.
const MIGRATIONS: &[(u32, MigrationFn)] = &[(0, migrate_v0_stamp_version)];

/// Version 0 blobs predate the `schemaVersion` field. Stamp the version and
/// backfill settings defaults that old builds omitted when the user never
/// touched them.
fn migrate_v0_stamp_version(mut value: Value) -> Result<Value, String> {
    let object = value
        .as_object_mut()
        .ok_or_else(|| "aggregate is not a JSON object".to_string())?;

    let settings = object
        .entry("settings")
        .or_insert_with(|| Value::Object(Default::default()));
    let settings = settings
        .as_object_mut()
        .ok_or_else(|| "settings is not a JSON object".to_string())?;
    settings
        .entry("currency")
        .or_insert_with(|| Value::String("Rs".to_string()));
    settings.entry("autoSync").or_insert(Value::Bool(false));

    object.insert("schemaVersion".to_string(), Value::from(1u32));
    Ok(value)
}

/// The single-blob store. One instance owns the persisted aggregate and the
/// listener registry; consumers receive it by reference (`Arc`), never
/// through global state.
pub struct LocalStore {
    backend: Box<dyn BlobStore>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
    /// Last issued record id. Ids are current-time-derived but strictly
    /// monotonic so back-to-back inserts on the single writer never collide.
    last_issued_id: AtomicU64,
}

impl LocalStore {
    /// Create a store over the given persistence backend.
    pub fn new(backend: Box<dyn BlobStore>) -> Self {
        Self {
            backend,
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            last_issued_id: AtomicU64::new(0),
        }
    }

    /// Create a store with no persistence backend. Data lives only in
    /// memory; used in non-interactive contexts and tests.
    pub fn without_persistence() -> Self {
        Self::new(Box::new(MemoryBlobStore::new()))
    }

    // ==================== Aggregate ====================

    /// Return the current aggregate, or the built-in default when nothing is
    /// persisted. Malformed data is logged and replaced with the default.
    pub fn get_data(&self) -> Result<StorageData, StoreError> {
        let Some(raw) = self.backend.read()? else {
            return Ok(StorageData::default());
        };
        match Self::parse_and_migrate(&raw) {
            Ok(data) => Ok(data),
            Err(ParseError::Malformed(reason)) => {
                warn!("Persisted data is malformed ({reason}); starting from defaults");
                Ok(StorageData::default())
            }
            Err(ParseError::VersionAhead(version)) => Err(StoreError::Migration {
                from: version,
                reason: format!(
                    "blob was written by a newer build (supported up to {SCHEMA_VERSION})"
                ),
            }),
            Err(ParseError::MigrationFailed { from, reason }) => {
                Err(StoreError::Migration { from, reason })
            }
        }
    }

    /// Persist the full aggregate, then notify every listener. A panicking
    /// listener is caught and logged; the write has already completed and the
    /// remaining listeners still run.
    pub fn save_data(&self, data: &StorageData) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(data).map_err(|err| StoreError::Serialize(err.to_string()))?;
        self.backend.write(&json)?;
        self.notify_listeners(data);
        Ok(())
    }

    /// Erase the entire aggregate (not merely transactions) and notify
    /// listeners with the post-clear default state.
    pub fn clear_all_data(&self) -> Result<(), StoreError> {
        self.backend.clear()?;
        info!("Cleared all persisted data");
        self.notify_listeners(&StorageData::default());
        Ok(())
    }

    // ==================== Transactions ====================

    /// Create a transaction: assigns an id, the local user id placeholder and
    /// both timestamps, appends and persists. Returns the stored record.
    pub fn add_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        let mut data = self.get_data()?;
        let now = Utc::now();
        let transaction = Transaction {
            id: self.next_record_id().to_string(),
            user_id: LOCAL_USER_ID.to_string(),
            transaction_type: new.transaction_type,
            amount: new.amount,
            category: new.category,
            account: new.account,
            description: new.description,
            date: new.date,
            created_at: now,
            updated_at: now,
        };
        data.transactions.push(transaction.clone());
        self.save_data(&data)?;
        Ok(transaction)
    }

    /// Merge `patch` into the transaction with the given id, refreshing
    /// `updated_at`. Returns `None` when the id is unknown (nothing is
    /// persisted in that case).
    pub fn update_transaction(
        &self,
        id: &str,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>, StoreError> {
        let mut data = self.get_data()?;
        let Some(transaction) = data.transactions.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        if let Some(transaction_type) = patch.transaction_type {
            transaction.transaction_type = transaction_type;
        }
        if let Some(amount) = patch.amount {
            transaction.amount = amount;
        }
        if let Some(category) = patch.category {
            transaction.category = category;
        }
        if let Some(account) = patch.account {
            transaction.account = account;
        }
        if let Some(description) = patch.description {
            transaction.description = description;
        }
        if let Some(date) = patch.date {
            transaction.date = date;
        }
        transaction.updated_at = Utc::now();

        let updated = transaction.clone();
        self.save_data(&data)?;
        Ok(Some(updated))
    }

    /// Remove a transaction by id. Returns whether a record was removed.
    pub fn delete_transaction(&self, id: &str) -> Result<bool, StoreError> {
        let mut data = self.get_data()?;
        let before = data.transactions.len();
        data.transactions.retain(|t| t.id != id);
        if data.transactions.len() == before {
            return Ok(false);
        }
        self.save_data(&data)?;
        Ok(true)
    }

    /// Remove every transaction referencing the given category in a single
    /// persisted write. Returns whether the set changed.
    pub fn delete_transactions_by_category(&self, category_id: &str) -> Result<bool, StoreError> {
        let mut data = self.get_data()?;
        let before = data.transactions.len();
        data.transactions.retain(|t| t.category != category_id);
        if data.transactions.len() == before {
            return Ok(false);
        }
        self.save_data(&data)?;
        Ok(true)
    }

    /// Remove every transaction referencing the given account in a single
    /// persisted write. Returns whether the set changed.
    pub fn delete_transactions_by_account(&self, account_id: &str) -> Result<bool, StoreError> {
        let mut data = self.get_data()?;
        let before = data.transactions.len();
        data.transactions.retain(|t| t.account != account_id);
        if data.transactions.len() == before {
            return Ok(false);
        }
        self.save_data(&data)?;
        Ok(true)
    }

    /// All transactions, newest first (date descending, creation time as the
    /// tie-breaker).
    pub fn get_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        let mut transactions = self.get_data()?.transactions;
        transactions.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(transactions)
    }

    /// Transactions whose date falls within `[start, end]`, in stored order.
    pub fn get_transactions_by_date_range(
        &self,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Result<Vec<Transaction>, StoreError> {
        let data = self.get_data()?;
        Ok(data
            .transactions
            .into_iter()
            .filter(|t| t.date >= start && t.date <= end)
            .collect())
    }

    // ==================== Categories ====================

    /// Add a custom category with a generated `custom-` prefixed id.
    pub fn add_custom_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let mut data = self.get_data()?;
        let category = Category {
            id: format!("custom-{}", self.next_record_id()),
            name: new.name,
            icon: new.icon,
            color: new.color,
            category_type: new.category_type,
        };
        data.custom_categories.insert(0, category.clone());
        self.save_data(&data)?;
        Ok(category)
    }

    /// Remove a custom category by id. Built-ins are not part of the custom
    /// collection and can never be deleted through this path. Dependent
    /// transactions are left untouched; cascading is the caller's job.
    pub fn delete_custom_category(&self, id: &str) -> Result<bool, StoreError> {
        let mut data = self.get_data()?;
        let before = data.custom_categories.len();
        data.custom_categories.retain(|c| c.id != id);
        if data.custom_categories.len() == before {
            return Ok(false);
        }
        self.save_data(&data)?;
        Ok(true)
    }

    /// Built-in categories of the given type followed by the matching custom
    /// entries. Built-ins are never persisted, so they exist identically on
    /// every device.
    pub fn get_all_categories(
        &self,
        category_type: TransactionType,
    ) -> Result<Vec<Category>, StoreError> {
        let data = self.get_data()?;
        let mut categories = match category_type {
            TransactionType::Expense => builtin_expense_categories(),
            TransactionType::Income => builtin_income_categories(),
        };
        categories.extend(
            data.custom_categories
                .into_iter()
                .filter(|c| c.category_type == category_type),
        );
        Ok(categories)
    }

    // ==================== Accounts ====================

    /// Add a custom account with a generated `custom-` prefixed id.
    pub fn add_custom_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut data = self.get_data()?;
        let account = Account {
            id: format!("custom-{}", self.next_record_id()),
            name: new.name,
            icon: new.icon,
        };
        data.custom_accounts.insert(0, account.clone());
        self.save_data(&data)?;
        Ok(account)
    }

    /// Remove a custom account by id. Same contract as
    /// [`delete_custom_category`](Self::delete_custom_category).
    pub fn delete_custom_account(&self, id: &str) -> Result<bool, StoreError> {
        let mut data = self.get_data()?;
        let before = data.custom_accounts.len();
        data.custom_accounts.retain(|a| a.id != id);
        if data.custom_accounts.len() == before {
            return Ok(false);
        }
        self.save_data(&data)?;
        Ok(true)
    }

    /// Built-in accounts followed by every custom account.
    pub fn get_all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let data = self.get_data()?;
        let mut accounts = builtin_accounts();
        accounts.extend(data.custom_accounts);
        Ok(accounts)
    }

    // ==================== Settings ====================

    /// Shallow-merge `patch` into the settings singleton.
    pub fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, StoreError> {
        let mut data = self.get_data()?;
        if let Some(currency) = patch.currency {
            data.settings.currency = currency;
        }
        if let Some(auto_sync) = patch.auto_sync {
            data.settings.auto_sync = auto_sync;
        }
        let settings = data.settings.clone();
        self.save_data(&data)?;
        Ok(settings)
    }

    pub fn get_settings(&self) -> Result<Settings, StoreError> {
        Ok(self.get_data()?.settings)
    }

    // ==================== Backup ====================

    /// Pretty-printed JSON dump of the whole aggregate.
    pub fn export_json(&self) -> Result<String, StoreError> {
        let data = self.get_data()?;
        serde_json::to_string_pretty(&data).map_err(|err| StoreError::Serialize(err.to_string()))
    }

    /// Import a previously exported aggregate, replacing current state.
    /// Returns `false` (without touching anything) when the payload does not
    /// look like an aggregate. Legacy exports migrate on the way in.
    pub fn import_json(&self, json: &str) -> Result<bool, StoreError> {
        let data = match Self::parse_and_migrate(json) {
            Ok(data) => data,
            Err(ParseError::Malformed(reason)) => {
                warn!("Rejected import: {reason}");
                return Ok(false);
            }
            Err(ParseError::VersionAhead(version)) => {
                warn!("Rejected import from newer schema version {version}");
                return Ok(false);
            }
            Err(ParseError::MigrationFailed { from, reason }) => {
                return Err(StoreError::Migration { from, reason });
            }
        };
        self.save_data(&data)?;
        Ok(true)
    }

    // ==================== Change notification ====================

    /// Register a listener invoked after every successful `save_data` /
    /// `clear_all_data`. Listeners run synchronously in registration order;
    /// no deduplication. Listeners must not call back into the listener
    /// registry from inside the callback.
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StorageData) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap()
            .push((id, Box::new(listener)));
        id
    }

    /// Unregister a listener. Returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn notify_listeners(&self, data: &StorageData) {
        let listeners = self.listeners.lock().unwrap();
        for (id, listener) in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(data))).is_err() {
                error!("Storage listener {id} panicked; remaining listeners still run");
            }
        }
    }

    // ==================== Internals ====================

    /// Current-time-derived record id, bumped past the last issued id so two
    /// inserts within the same millisecond stay distinct.
    fn next_record_id(&self) -> u64 {
        let now_ms = Utc::now().timestamp_millis().max(0) as u64;
        loop {
            let last = self.last_issued_id.load(Ordering::Relaxed);
            let candidate = now_ms.max(last + 1);
            if self
                .last_issued_id
                .compare_exchange(last, candidate, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return candidate;
            }
        }
    }

    fn parse_and_migrate(raw: &str) -> Result<StorageData, ParseError> {
        let mut value: Value = serde_json::from_str(raw)
            .map_err(|err| ParseError::Malformed(format!("invalid JSON: {err}")))?;

        if !value
            .get("transactions")
            .map(Value::is_array)
            .unwrap_or(false)
        {
            return Err(ParseError::Malformed(
                "missing transactions array".to_string(),
            ));
        }

        let mut version = value
            .get("schemaVersion")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
        if version > SCHEMA_VERSION {
            return Err(ParseError::VersionAhead(version));
        }

        while version < SCHEMA_VERSION {
            let migration = MIGRATIONS
                .iter()
                .find(|(from, _)| *from == version)
                .map(|(_, migration)| migration)
                .ok_or(ParseError::MigrationFailed {
                    from: version,
                    reason: "no migration registered for this version".to_string(),
                })?;
            value = migration(value).map_err(|reason| ParseError::MigrationFailed {
                from: version,
                reason,
            })?;
            let migrated_to = value
                .get("schemaVersion")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32;
            if migrated_to <= version {
                return Err(ParseError::MigrationFailed {
                    from: version,
                    reason: "migration did not advance the schema version".to_string(),
                });
            }
            info!("Migrated persisted data from schema version {version} to {migrated_to}");
            version = migrated_to;
        }

        serde_json::from_value(value)
            .map_err(|err| ParseError::Malformed(format!("unexpected shape: {err}")))
    }
}

enum ParseError {
    Malformed(String),
    VersionAhead(u32),
    MigrationFailed { from: u32, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn store() -> LocalStore {
        LocalStore::without_persistence()
    }

    fn new_transaction(
        transaction_type: TransactionType,
        amount: f64,
        category: &str,
        account: &str,
        date: &str,
    ) -> NewTransaction {
        NewTransaction {
            transaction_type,
            amount,
            category: category.to_string(),
            account: account.to_string(),
            description: format!("{category} {amount}"),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        }
    }

    /// A backend whose writes always fail, for error propagation tests.
    struct FailingBlobStore;

    impl BlobStore for FailingBlobStore {
        fn read(&self) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
        fn write(&self, _contents: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk full".to_string()))
        }
        fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk full".to_string()))
        }
    }

    #[test]
    fn get_data_without_a_write_returns_the_default_aggregate() {
        let store = store();
        let data = store.get_data().unwrap();
        assert_eq!(data, StorageData::default());
        assert_eq!(data.settings.currency, "Rs");
        assert!(!data.settings.auto_sync);
    }

    #[test]
    fn get_data_is_idempotent_between_writes() {
        let store = store();
        store
            .add_transaction(new_transaction(
                TransactionType::Income,
                100.0,
                "salary",
                "cash",
                "2024-01-10",
            ))
            .unwrap();

        let first = store.get_data().unwrap();
        let second = store.get_data().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn save_then_get_round_trips_the_aggregate() {
        let store = store();
        let mut data = StorageData::default();
        data.settings.currency = "NPR".to_string();
        data.custom_accounts.push(Account {
            id: "custom-9".to_string(),
            name: "Wallet".to_string(),
            icon: "👛".to_string(),
        });

        store.save_data(&data).unwrap();
        assert_eq!(store.get_data().unwrap(), data);
    }

    #[test]
    fn every_listener_runs_once_even_when_one_panics() {
        let store = store();
        let calls = Arc::new(AtomicUsize::new(0));

        let before = calls.clone();
        store.on_change(move |_| {
            before.fetch_add(1, Ordering::SeqCst);
        });
        store.on_change(|_| panic!("listener bug"));
        let after = calls.clone();
        store.on_change(move |_| {
            after.fetch_add(1, Ordering::SeqCst);
        });

        store.save_data(&StorageData::default()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removed_listeners_are_no_longer_notified() {
        let store = store();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = store.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.save_data(&StorageData::default()).unwrap();
        assert!(store.remove_listener(id));
        store.save_data(&StorageData::default()).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!store.remove_listener(id));
    }

    #[test]
    fn added_transaction_comes_back_first_with_generated_fields() {
        let store = store();
        store
            .add_transaction(new_transaction(
                TransactionType::Expense,
                40.0,
                "food",
                "cash",
                "2024-01-10",
            ))
            .unwrap();
        let created = store
            .add_transaction(NewTransaction {
                transaction_type: TransactionType::Income,
                amount: 500.0,
                category: "salary".to_string(),
                account: "cash".to_string(),
                description: "January salary".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            })
            .unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(created.user_id, LOCAL_USER_ID);
        assert_eq!(created.created_at, created.updated_at);

        let transactions = store.get_transactions().unwrap();
        assert_eq!(transactions.len(), 2);
        // Newest date first.
        assert_eq!(transactions[0].id, created.id);
        assert_eq!(transactions[0].amount, 500.0);
    }

    #[test]
    fn record_ids_are_unique_even_within_one_millisecond() {
        let store = store();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let tx = store
                .add_transaction(new_transaction(
                    TransactionType::Expense,
                    1.0,
                    "food",
                    "cash",
                    "2024-01-10",
                ))
                .unwrap();
            ids.push(tx.id.parse::<u64>().unwrap());
        }
        for pair in ids.windows(2) {
            assert!(pair[1] > pair[0], "ids must be strictly increasing");
        }
    }

    #[test]
    fn update_merges_fields_and_refreshes_updated_at() {
        let store = store();
        let created = store
            .add_transaction(new_transaction(
                TransactionType::Expense,
                40.0,
                "food",
                "cash",
                "2024-01-10",
            ))
            .unwrap();

        let updated = store
            .update_transaction(
                &created.id,
                TransactionPatch {
                    amount: Some(45.0),
                    description: Some("Dinner".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.amount, 45.0);
        assert_eq!(updated.description, "Dinner");
        assert_eq!(updated.category, "food");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn updating_an_unknown_id_is_a_no_op() {
        let store = store();
        let result = store
            .update_transaction("missing", TransactionPatch::default())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn delete_reports_whether_a_record_was_removed() {
        let store = store();
        let created = store
            .add_transaction(new_transaction(
                TransactionType::Expense,
                40.0,
                "food",
                "cash",
                "2024-01-10",
            ))
            .unwrap();

        assert!(store.delete_transaction(&created.id).unwrap());
        assert!(!store.delete_transaction(&created.id).unwrap());
    }

    #[test]
    fn cascade_delete_by_category_removes_exactly_the_dependents() {
        let store = store();
        let custom = store
            .add_custom_category(NewCategory {
                name: "Pets".to_string(),
                icon: "🐾".to_string(),
                color: "bg-amber-500".to_string(),
                category_type: TransactionType::Expense,
            })
            .unwrap();

        store
            .add_transaction(new_transaction(
                TransactionType::Expense,
                10.0,
                &custom.id,
                "cash",
                "2024-01-10",
            ))
            .unwrap();
        store
            .add_transaction(new_transaction(
                TransactionType::Expense,
                20.0,
                &custom.id,
                "card",
                "2024-01-11",
            ))
            .unwrap();
        let keeper = store
            .add_transaction(new_transaction(
                TransactionType::Expense,
                30.0,
                "food",
                "cash",
                "2024-01-12",
            ))
            .unwrap();

        assert!(store.delete_custom_category(&custom.id).unwrap());
        assert!(store.delete_transactions_by_category(&custom.id).unwrap());

        let remaining = store.get_transactions().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0], keeper);
        // A second cascade finds nothing to remove.
        assert!(!store.delete_transactions_by_category(&custom.id).unwrap());
    }

    #[test]
    fn deleting_an_account_without_cascading_leaves_dangling_references() {
        let store = store();
        let custom = store
            .add_custom_account(NewAccount {
                name: "Esewa".to_string(),
                icon: "📱".to_string(),
            })
            .unwrap();

        store
            .add_transaction(new_transaction(
                TransactionType::Expense,
                10.0,
                "food",
                &custom.id,
                "2024-01-10",
            ))
            .unwrap();
        store
            .add_transaction(new_transaction(
                TransactionType::Income,
                50.0,
                "salary",
                &custom.id,
                "2024-01-11",
            ))
            .unwrap();

        assert!(store.delete_custom_account(&custom.id).unwrap());

        let accounts = store.get_all_accounts().unwrap();
        assert!(accounts.iter().all(|a| a.id != custom.id));

        // The store does not enforce referential integrity: both
        // transactions survive with the now-dangling account id.
        let transactions = store.get_transactions().unwrap();
        assert_eq!(transactions.len(), 2);
        assert!(transactions.iter().all(|t| t.account == custom.id));
    }

    #[test]
    fn built_ins_come_first_and_cannot_be_deleted() {
        let store = store();
        store
            .add_custom_category(NewCategory {
                name: "Pets".to_string(),
                icon: "🐾".to_string(),
                color: "bg-amber-500".to_string(),
                category_type: TransactionType::Expense,
            })
            .unwrap();

        let categories = store.get_all_categories(TransactionType::Expense).unwrap();
        assert_eq!(categories[0].id, "food");
        assert_eq!(categories.last().unwrap().name, "Pets");

        // Built-ins are not part of the custom collection.
        assert!(!store.delete_custom_category("food").unwrap());
        assert!(!store.delete_custom_account("cash").unwrap());
        assert_eq!(
            store
                .get_all_categories(TransactionType::Expense)
                .unwrap()
                .len(),
            categories.len()
        );
    }

    #[test]
    fn custom_categories_are_filtered_by_type() {
        let store = store();
        store
            .add_custom_category(NewCategory {
                name: "Freelance".to_string(),
                icon: "💻".to_string(),
                color: "bg-sky-500".to_string(),
                category_type: TransactionType::Income,
            })
            .unwrap();

        let expense = store.get_all_categories(TransactionType::Expense).unwrap();
        assert!(expense.iter().all(|c| c.name != "Freelance"));
        let income = store.get_all_categories(TransactionType::Income).unwrap();
        assert!(income.iter().any(|c| c.name == "Freelance"));
    }

    #[test]
    fn settings_update_is_a_shallow_merge() {
        let store = store();
        store
            .update_settings(SettingsPatch {
                currency: Some("NPR".to_string()),
                auto_sync: None,
            })
            .unwrap();
        store
            .update_settings(SettingsPatch {
                currency: None,
                auto_sync: Some(true),
            })
            .unwrap();

        let settings = store.get_settings().unwrap();
        assert_eq!(settings.currency, "NPR");
        assert!(settings.auto_sync);
    }

    #[test]
    fn clear_erases_everything_and_notifies() {
        let store = store();
        store
            .add_transaction(new_transaction(
                TransactionType::Expense,
                40.0,
                "food",
                "cash",
                "2024-01-10",
            ))
            .unwrap();
        store
            .update_settings(SettingsPatch {
                currency: Some("NPR".to_string()),
                auto_sync: None,
            })
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        store.on_change(move |data| {
            assert!(data.is_empty());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.clear_all_data().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_data().unwrap(), StorageData::default());
    }

    #[test]
    fn date_range_filter_is_inclusive() {
        let store = store();
        for (amount, date) in [(1.0, "2024-01-01"), (2.0, "2024-01-15"), (3.0, "2024-02-01")] {
            store
                .add_transaction(new_transaction(
                    TransactionType::Expense,
                    amount,
                    "food",
                    "cash",
                    date,
                ))
                .unwrap();
        }

        let in_january = store
            .get_transactions_by_date_range(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(in_january.len(), 2);
    }

    #[test]
    fn legacy_version_zero_blob_migrates_on_load() {
        let store = store();
        let legacy = r#"{
            "transactions": [{
                "id": "1700000000000",
                "userId": "local-user",
                "type": "income",
                "amount": 500.0,
                "category": "salary",
                "account": "cash",
                "description": "Pay",
                "date": "2024-01-15",
                "createdAt": "2024-01-15T10:30:00Z",
                "updatedAt": "2024-01-15T10:30:00Z"
            }],
            "customCategories": [],
            "customAccounts": [],
            "settings": { "currency": "Rs" }
        }"#;
        store.backend.write(legacy).unwrap();

        let data = store.get_data().unwrap();
        assert_eq!(data.schema_version, SCHEMA_VERSION);
        assert_eq!(data.transactions.len(), 1);
        assert_eq!(data.transactions[0].amount, 500.0);
        // The migration backfills the setting old builds omitted.
        assert!(!data.settings.auto_sync);
    }

    #[test]
    fn malformed_blob_falls_back_to_the_default() {
        let store = store();
        store.backend.write("not json at all {{{").unwrap();
        assert_eq!(store.get_data().unwrap(), StorageData::default());

        store.backend.write(r#"{"unexpected": true}"#).unwrap();
        assert_eq!(store.get_data().unwrap(), StorageData::default());
    }

    #[test]
    fn blob_from_a_newer_build_is_an_error_not_a_wipe() {
        let store = store();
        store
            .backend
            .write(r#"{"schemaVersion": 99, "transactions": []}"#)
            .unwrap();
        let err = store.get_data().unwrap_err();
        assert!(matches!(err, StoreError::Migration { from: 99, .. }));
    }

    #[test]
    fn export_import_round_trips() {
        let store = store();
        store
            .add_transaction(new_transaction(
                TransactionType::Income,
                500.0,
                "salary",
                "cash",
                "2024-01-15",
            ))
            .unwrap();
        let dump = store.export_json().unwrap();

        let other = LocalStore::without_persistence();
        assert!(other.import_json(&dump).unwrap());
        assert_eq!(other.get_data().unwrap(), store.get_data().unwrap());
    }

    #[test]
    fn import_rejects_payloads_that_are_not_an_aggregate() {
        let store = store();
        assert!(!store.import_json("[1, 2, 3]").unwrap());
        assert!(!store.import_json(r#"{"transactions": "nope"}"#).unwrap());
        assert!(!store.import_json("garbage").unwrap());
        assert_eq!(store.get_data().unwrap(), StorageData::default());
    }

    #[test]
    fn backend_write_failures_surface_as_store_errors() {
        let store = LocalStore::new(Box::new(FailingBlobStore));
        let err = store
            .add_transaction(new_transaction(
                TransactionType::Expense,
                40.0,
                "food",
                "cash",
                "2024-01-10",
            ))
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
