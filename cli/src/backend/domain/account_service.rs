//! Account service domain logic.
//!
//! Same contract as the category service, scoped to accounts: cached list
//! reloaded after every mutation, deletes never cascade on their own.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::info;

use shared::{Account, NewAccount};

use crate::backend::storage::LocalStore;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<LocalStore>,
    cache: Arc<Mutex<Option<Vec<Account>>>>,
}

impl AccountService {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Built-in accounts followed by custom ones.
    pub fn accounts(&self) -> Result<Vec<Account>> {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(accounts) = cache.as_ref() {
                return Ok(accounts.clone());
            }
        }
        self.reload()?;
        Ok(self
            .cache
            .lock()
            .unwrap()
            .as_ref()
            .expect("cache populated by reload")
            .clone())
    }

    pub fn add_account(&self, new: NewAccount) -> Result<Account> {
        let created = self.store.add_custom_account(new)?;
        info!("Added custom account {} ({})", created.name, created.id);
        self.reload()?;
        Ok(created)
    }

    /// Delete a custom account. Transactions referencing it are left behind
    /// with a dangling id unless the caller also cascades.
    pub fn delete_account(&self, id: &str) -> Result<bool> {
        let removed = self.store.delete_custom_account(id)?;
        if removed {
            self.reload()?;
        }
        Ok(removed)
    }

    /// The explicit cascade for account deletion.
    pub fn delete_transactions_by_account(&self, id: &str) -> Result<bool> {
        Ok(self.store.delete_transactions_by_account(id)?)
    }

    fn reload(&self) -> Result<()> {
        *self.cache.lock().unwrap() = Some(self.store.get_all_accounts()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_delete_round_trip() {
        let service = AccountService::new(Arc::new(LocalStore::without_persistence()));
        let created = service
            .add_account(NewAccount {
                name: "Esewa".to_string(),
                icon: "📱".to_string(),
            })
            .unwrap();

        let accounts = service.accounts().unwrap();
        assert_eq!(accounts[0].id, "cash");
        assert!(accounts.iter().any(|a| a.id == created.id));

        assert!(service.delete_account(&created.id).unwrap());
        assert!(service.accounts().unwrap().iter().all(|a| a.id != created.id));
    }
}
