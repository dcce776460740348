//! Test utilities for storage-backed tests.
//!
//! Provides RAII-based cleanup so test data is removed even when a test
//! panics: the temporary directory lives exactly as long as the environment.

use tempfile::TempDir;

use super::json::JsonConnection;
use super::store::LocalStore;
use super::traits::StoreError;

/// A disk-backed store rooted in a temporary directory that is deleted when
/// the environment is dropped.
pub struct TestEnvironment {
    pub store: LocalStore,
    pub connection: JsonConnection,
    pub base_path: std::path::PathBuf,
    _temp_dir: TempDir, // keep alive until drop
}

impl TestEnvironment {
    pub fn new() -> Result<Self, StoreError> {
        let temp_dir = TempDir::new()?;
        let connection = JsonConnection::new(temp_dir.path())?;
        let store = LocalStore::new(Box::new(connection.clone()));
        Ok(Self {
            store,
            connection,
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::{NewTransaction, TransactionType};

    #[test]
    fn data_persists_across_store_instances_on_the_same_directory() {
        let env = TestEnvironment::new().unwrap();
        env.store
            .add_transaction(NewTransaction {
                transaction_type: TransactionType::Income,
                amount: 500.0,
                category: "salary".to_string(),
                account: "cash".to_string(),
                description: "Pay".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            })
            .unwrap();

        let reopened = LocalStore::new(Box::new(env.connection.clone()));
        assert_eq!(reopened.get_transactions().unwrap().len(), 1);
    }
}
