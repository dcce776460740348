//! Settings service domain logic.

use std::sync::Arc;

use anyhow::Result;

use shared::{Settings, SettingsPatch};

use crate::backend::storage::LocalStore;

#[derive(Clone)]
pub struct SettingsService {
    store: Arc<LocalStore>,
}

impl SettingsService {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(self.store.get_settings()?)
    }

    /// Shallow-merge the patch into the settings singleton and return the
    /// merged result.
    pub fn update(&self, patch: SettingsPatch) -> Result<Settings> {
        Ok(self.store.update_settings(patch)?)
    }

    /// The currency symbol used by exports and reports.
    pub fn currency(&self) -> Result<String> {
        Ok(self.settings()?.currency)
    }
}
