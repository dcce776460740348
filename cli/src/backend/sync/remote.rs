//! Remote document store.
//!
//! One document per user holds the whole aggregate. The store contract is
//! deliberately as small as the local one: replace the document, fetch it,
//! check for its existence. The HTTP implementation talks to the backup
//! service's REST surface; tests use an in-memory double.

use anyhow::{bail, Context, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;

use shared::SyncDocument;

/// Whole-document operations against the per-user remote backup.
pub trait RemoteStore: Send + Sync {
    /// Unconditionally replace the user's remote document (last writer
    /// wins; there is no precondition).
    fn save_document(&self, user_id: &str, document: &SyncDocument) -> Result<()>;

    /// Fetch the user's remote document, `None` when it does not exist.
    fn fetch_document(&self, user_id: &str) -> Result<Option<SyncDocument>>;

    /// Whether the user has a remote document at all.
    fn has_document(&self, user_id: &str) -> Result<bool> {
        Ok(self.fetch_document(user_id)?.is_some())
    }
}

/// HTTP implementation over the backup service. Documents live under
/// `{base_url}/users/{user_id}/data/wallet`; the server assigns `updatedAt`
/// on write.
pub struct HttpRemoteStore {
    base_url: String,
    client: Client,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn document_url(&self, user_id: &str) -> String {
        format!("{}/users/{}/data/wallet", self.base_url, user_id)
    }
}

impl RemoteStore for HttpRemoteStore {
    fn save_document(&self, user_id: &str, document: &SyncDocument) -> Result<()> {
        let url = self.document_url(user_id);
        debug!("PUT {url}");
        let response = self
            .client
            .put(&url)
            .json(document)
            .send()
            .context("sync request failed")?;
        if !response.status().is_success() {
            bail!("sync rejected by server: {}", response.status());
        }
        Ok(())
    }

    fn fetch_document(&self, user_id: &str) -> Result<Option<SyncDocument>> {
        let url = self.document_url(user_id);
        debug!("GET {url}");
        let response = self.client.get(&url).send().context("restore request failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            bail!("restore rejected by server: {}", response.status());
        }
        let document = response
            .json::<SyncDocument>()
            .context("remote document has an unexpected shape")?;
        Ok(Some(document))
    }
}
