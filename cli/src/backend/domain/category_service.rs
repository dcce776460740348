//! Category service domain logic.
//!
//! Thin façade over the store for category reads and custom-category
//! mutations. The cached lists are reloaded wholesale after every mutation
//! rather than patched in place; the collections are small and built-ins
//! never change.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::info;

use shared::{Category, NewCategory, TransactionType};

use crate::backend::storage::LocalStore;

#[derive(Clone)]
pub struct CategoryService {
    store: Arc<LocalStore>,
    cache: Arc<Mutex<Option<CategoryLists>>>,
}

#[derive(Clone)]
struct CategoryLists {
    expense: Vec<Category>,
    income: Vec<Category>,
}

impl CategoryService {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Built-ins plus custom expense categories, built-ins first.
    pub fn expense_categories(&self) -> Result<Vec<Category>> {
        Ok(self.loaded()?.expense)
    }

    /// Built-ins plus custom income categories, built-ins first.
    pub fn income_categories(&self) -> Result<Vec<Category>> {
        Ok(self.loaded()?.income)
    }

    /// Every category of both types, used for name lookups.
    pub fn all_categories(&self) -> Result<Vec<Category>> {
        let lists = self.loaded()?;
        let mut all = lists.expense;
        all.extend(lists.income);
        Ok(all)
    }

    /// Only the user-created categories of the given type.
    pub fn custom_categories(&self, category_type: TransactionType) -> Result<Vec<Category>> {
        let data = self.store.get_data()?;
        Ok(data
            .custom_categories
            .into_iter()
            .filter(|c| c.category_type == category_type)
            .collect())
    }

    pub fn add_category(&self, new: NewCategory) -> Result<Category> {
        let created = self.store.add_custom_category(new)?;
        info!("Added custom category {} ({})", created.name, created.id);
        self.reload()?;
        Ok(created)
    }

    /// Delete a custom category. Dependent transactions are left in place;
    /// callers that want a cascade must also call
    /// [`delete_transactions_by_category`](Self::delete_transactions_by_category).
    pub fn delete_category(&self, id: &str) -> Result<bool> {
        let removed = self.store.delete_custom_category(id)?;
        if removed {
            self.reload()?;
        }
        Ok(removed)
    }

    /// The explicit cascade: bulk-remove every transaction referencing the
    /// category.
    pub fn delete_transactions_by_category(&self, id: &str) -> Result<bool> {
        Ok(self.store.delete_transactions_by_category(id)?)
    }

    fn reload(&self) -> Result<()> {
        let lists = CategoryLists {
            expense: self.store.get_all_categories(TransactionType::Expense)?,
            income: self.store.get_all_categories(TransactionType::Income)?,
        };
        *self.cache.lock().unwrap() = Some(lists);
        Ok(())
    }

    fn loaded(&self) -> Result<CategoryLists> {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(lists) = cache.as_ref() {
                return Ok(lists.clone());
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
}
