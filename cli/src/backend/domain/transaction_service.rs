//! Transaction service domain logic.
//!
//! Bridges callers to the local store for everything transaction-shaped:
//! boundary validation, creation, filtered listing, updates and cascade
//! deletes. The service keeps a locally cached copy of the collection,
//! patched optimistically on single-record mutations and reloaded wholesale
//! after bulk ones.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::Local;
use log::info;

use shared::{validate_new_transaction, NewTransaction, Transaction};

use crate::backend::domain::calendar;
use crate::backend::domain::commands::transactions::{
    CreateTransactionCommand, TransactionListQuery, TransactionListResult,
    UpdateTransactionCommand,
};
use crate::backend::storage::LocalStore;

#[derive(Clone)]
pub struct TransactionService {
    store: Arc<LocalStore>,
    /// Cached collection, newest first. `None` until first load.
    cache: Arc<Mutex<Option<Vec<Transaction>>>>,
}

impl TransactionService {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Validate and create a transaction. Validation failures never reach
    /// the store.
    pub fn create_transaction(&self, command: CreateTransactionCommand) -> Result<Transaction> {
        let new = NewTransaction {
            transaction_type: command.transaction_type,
            amount: command.amount,
            category: command.category,
            account: command.account,
            description: command.description,
            date: command
                .date
                .unwrap_or_else(|| Local::now().date_naive()),
        };
        validate_new_transaction(&new).map_err(|errors| {
            anyhow!(
                "invalid transaction: {}",
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            )
        })?;

        let created = self.store.add_transaction(new)?;
        info!(
            "Created {} transaction {} ({} {})",
            created.transaction_type, created.id, created.amount, created.category
        );

        // Optimistic cache insert; the store ordering puts newest first.
        let mut cache = self.cache.lock().unwrap();
        if let Some(transactions) = cache.as_mut() {
            let position = transactions
                .iter()
                .position(|t| {
                    (t.date, t.created_at) < (created.date, created.created_at)
                })
                .unwrap_or(transactions.len());
            transactions.insert(position, created.clone());
        }
        Ok(created)
    }

    /// Apply the query filters over the cached collection and return the
    /// matches together with their income/expense totals.
    pub fn list_transactions(&self, query: TransactionListQuery) -> Result<TransactionListResult> {
        let mut transactions = self.cached_transactions()?;

        if let Some(transaction_type) = query.transaction_type {
            transactions.retain(|t| t.transaction_type == transaction_type);
        }
        if let Some(category) = &query.category {
            transactions.retain(|t| &t.category == category);
        }
        if let Some(account) = &query.account {
            transactions.retain(|t| &t.account == account);
        }
        if let Some(search) = &query.search {
            let needle = search.to_lowercase();
            transactions.retain(|t| t.description.to_lowercase().contains(&needle));
        }
        if query.year.is_some() || query.month.is_some() {
            let mut filtered = Vec::with_capacity(transactions.len());
            for transaction in transactions {
                let (year, month) = calendar::year_month(transaction.date, query.calendar)?;
                if query.year.is_some_and(|y| y != year) {
                    continue;
                }
                if query.month.is_some_and(|m| m != month) {
                    continue;
                }
                filtered.push(transaction);
            }
            transactions = filtered;
        }

        if query.sort_ascending {
            transactions.sort_by(|a, b| {
                a.date
                    .cmp(&b.date)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            });
        }

        let total_income = transactions
            .iter()
            .filter(|t| t.transaction_type == shared::TransactionType::Income)
            .map(|t| t.amount)
            .sum();
        let total_expense = transactions
            .iter()
            .filter(|t| t.transaction_type == shared::TransactionType::Expense)
            .map(|t| t.amount)
            .sum();

        Ok(TransactionListResult {
            transactions,
            total_income,
            total_expense,
        })
    }

    /// Merge a patch into an existing transaction. Returns `None` when the
    /// id is unknown.
    pub fn update_transaction(
        &self,
        command: UpdateTransactionCommand,
    ) -> Result<Option<Transaction>> {
        let updated = self.store.update_transaction(&command.id, command.patch)?;
        if let Some(updated) = &updated {
            let mut cache = self.cache.lock().unwrap();
            if let Some(transactions) = cache.as_mut() {
                if let Some(slot) = transactions.iter_mut().find(|t| t.id == updated.id) {
                    *slot = updated.clone();
                }
            }
        }
        Ok(updated)
    }

    /// Delete a transaction by id. Returns whether a record was removed.
    pub fn delete_transaction(&self, id: &str) -> Result<bool> {
        let removed = self.store.delete_transaction(id)?;
        if removed {
            let mut cache = self.cache.lock().unwrap();
            if let Some(transactions) = cache.as_mut() {
                transactions.retain(|t| t.id != id);
            }
        }
        Ok(removed)
    }

    /// Bulk-remove every transaction referencing a category, then reconcile
    /// the cache against the store.
    pub fn delete_transactions_by_category(&self, category_id: &str) -> Result<bool> {
        let changed = self.store.delete_transactions_by_category(category_id)?;
        self.reload()?;
        Ok(changed)
    }

    /// Bulk-remove every transaction referencing an account, then reconcile.
    pub fn delete_transactions_by_account(&self, account_id: &str) -> Result<bool> {
        let changed = self.store.delete_transactions_by_account(account_id)?;
        self.reload()?;
        Ok(changed)
    }

    /// Drop the cache and reload from the store.
    pub fn reload(&self) -> Result<()> {
        let fresh = self.store.get_transactions()?;
        *self.cache.lock().unwrap() = Some(fresh);
        Ok(())
    }

    fn cached_transactions(&self) -> Result<Vec<Transaction>> {
        let mut cache = self.cache.lock().unwrap();
        if cache.is_none() {
            *cache = Some(self.store.get_transactions()?);
        }
        Ok(cache.as_ref().expect("cache populated above").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::{CalendarSystem, TransactionPatch, TransactionType};

    fn service() -> TransactionService {
        TransactionService::new(Arc::new(LocalStore::without_persistence()))
    }

    fn create(
        service: &TransactionService,
        transaction_type: TransactionType,
        amount: f64,
        category: &str,
        date: &str,
    ) -> Transaction {
        service
            .create_transaction(CreateTransactionCommand {
                transaction_type,
                amount,
                category: category.to_string(),
                account: "cash".to_string(),
                description: format!("{category} {amount}"),
                date: Some(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
            })
            .unwrap()
    }

    #[test]
    fn create_rejects_invalid_input_before_the_store() {
        let service = service();
        let err = service
            .create_transaction(CreateTransactionCommand {
                transaction_type: TransactionType::Expense,
                amount: -5.0,
                category: "food".to_string(),
                account: "cash".to_string(),
                description: "bad".to_string(),
                date: None,
            })
            .unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
        assert!(service
            .list_transactions(TransactionListQuery::default())
            .unwrap()
            .transactions
            .is_empty());
    }

    #[test]
    fn list_defaults_to_newest_first_with_totals() {
        let service = service();
        create(&service, TransactionType::Income, 100.0, "salary", "2024-01-01");
        create(&service, TransactionType::Expense, 40.0, "food", "2024-01-05");
        create(&service, TransactionType::Income, 10.0, "salary", "2024-01-03");

        let result = service
            .list_transactions(TransactionListQuery::default())
            .unwrap();
        assert_eq!(result.transactions[0].amount, 40.0);
        assert_eq!(result.total_income, 110.0);
        assert_eq!(result.total_expense, 40.0);
    }

    #[test]
    fn filters_combine() {
        let service = service();
        create(&service, TransactionType::Income, 100.0, "salary", "2024-01-01");
        create(&service, TransactionType::Expense, 40.0, "food", "2024-01-05");
        create(&service, TransactionType::Expense, 20.0, "food", "2024-02-05");

        let result = service
            .list_transactions(TransactionListQuery {
                transaction_type: Some(TransactionType::Expense),
                category: Some("food".to_string()),
                year: Some(2024),
                month: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(result.transactions.len(), 1);
        assert_eq!(result.transactions[0].amount, 40.0);
    }

    #[test]
    fn month_filter_follows_the_selected_calendar() {
        let service = service();
        // 2024-04-12 is Chaitra (month 12) of BS 2080; 2024-04-13 is
        // Baisakh (month 1) of BS 2081.
        create(&service, TransactionType::Expense, 1.0, "food", "2024-04-12");
        create(&service, TransactionType::Expense, 2.0, "food", "2024-04-13");

        let ad_april = service
            .list_transactions(TransactionListQuery {
                year: Some(2024),
                month: Some(4),
                calendar: CalendarSystem::Ad,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ad_april.transactions.len(), 2);

        let bs_baisakh = service
            .list_transactions(TransactionListQuery {
                year: Some(2081),
                month: Some(1),
                calendar: CalendarSystem::Bs,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(bs_baisakh.transactions.len(), 1);
        assert_eq!(bs_baisakh.transactions[0].amount, 2.0);
    }

    #[test]
    fn search_matches_descriptions_case_insensitively() {
        let service = service();
        service
            .create_transaction(CreateTransactionCommand {
                transaction_type: TransactionType::Expense,
                amount: 12.0,
                category: "food".to_string(),
                account: "cash".to_string(),
                description: "Momo with friends".to_string(),
                date: Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            })
            .unwrap();

        let result = service
            .list_transactions(TransactionListQuery {
                search: Some("MOMO".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(result.transactions.len(), 1);
    }

    #[test]
    fn update_and_delete_keep_the_cache_in_step_with_the_store() {
        let service = service();
        let first = create(&service, TransactionType::Expense, 40.0, "food", "2024-01-05");
        let second = create(&service, TransactionType::Expense, 9.0, "food", "2024-01-06");

        service
            .update_transaction(UpdateTransactionCommand {
                id: first.id.clone(),
                patch: TransactionPatch {
                    amount: Some(45.0),
                    ..Default::default()
                },
            })
            .unwrap()
            .unwrap();
        assert!(service.delete_transaction(&second.id).unwrap());

        let listed = service
            .list_transactions(TransactionListQuery::default())
            .unwrap();
        assert_eq!(listed.transactions.len(), 1);
        assert_eq!(listed.transactions[0].amount, 45.0);

        // The cache must agree with a cold reload.
        service.reload().unwrap();
        let reloaded = service
            .list_transactions(TransactionListQuery::default())
            .unwrap();
        assert_eq!(reloaded.transactions, listed.transactions);
    }

    #[test]
    fn bulk_delete_reconciles_from_the_store() {
        let service = service();
        create(&service, TransactionType::Expense, 40.0, "food", "2024-01-05");
        create(&service, TransactionType::Expense, 9.0, "food", "2024-01-06");
        create(&service, TransactionType::Income, 100.0, "salary", "2024-01-07");

        assert!(service.delete_transactions_by_category("food").unwrap());
        let listed = service
            .list_transactions(TransactionListQuery::default())
            .unwrap();
        assert_eq!(listed.transactions.len(), 1);
        assert_eq!(listed.transactions[0].category, "salary");
    }
}
