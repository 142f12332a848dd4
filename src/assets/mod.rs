//! Versioned offline snapshot of the static web shell
//!
//! A snapshot is a set of cached responses named by version. Installing
//! fetches the whole manifest before writing anything, and the version is
//! registered only after every entry is stored, so a failed install leaves
//! nothing visible. Activating purges every other registered version.
//!
//! Key layout in the `assets` keyspace:
//! - `asset:{version}:{url}` → [`AssetResponse`]
//! - `index:{version}` → urls stored under that version
//! - `snapshots` → registered versions

use std::path::Path;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::AssetsConfig;
use crate::storage::Store;
use crate::{MeteoError, Result};

pub mod fetch;
pub mod router;

pub use fetch::{AssetFetcher, HttpAssetFetcher};
pub use router::{AssetRequest, AssetRouter, ResponseSource, RoutedResponse, Strategy};

const SNAPSHOTS_KEY: &str = "snapshots";

/// A stored or fetched HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl AssetResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.map(String::from),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Snapshot store for one configured version and manifest
pub struct AssetCache {
    store: Store,
    version: String,
    origin: String,
    manifest: Vec<String>,
    index_lock: Mutex<()>,
}

fn asset_key(version: &str, url: &str) -> String {
    format!("asset:{version}:{url}")
}

fn index_key(version: &str) -> String {
    format!("index:{version}")
}

impl AssetCache {
    pub fn open(path: impl AsRef<Path>, config: &AssetsConfig) -> anyhow::Result<Self> {
        let store = Store::open(path, "assets")?;
        Ok(Self {
            store,
            version: config.version.clone(),
            origin: config.origin.trim_end_matches('/').to_string(),
            manifest: config.manifest.clone(),
            index_lock: Mutex::new(()),
        })
    }

    /// Same store under another version and manifest
    #[must_use]
    pub fn reconfigured(self, config: &AssetsConfig) -> Self {
        Self {
            version: config.version.clone(),
            origin: config.origin.trim_end_matches('/').to_string(),
            manifest: config.manifest.clone(),
            ..self
        }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Absolute url for a shell path
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    /// Absolute urls of every manifest entry
    #[must_use]
    pub fn manifest_urls(&self) -> Vec<String> {
        self.manifest.iter().map(|path| self.url_for(path)).collect()
    }

    /// Versions currently registered
    pub async fn snapshot_names(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .get::<Vec<String>>(SNAPSHOTS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Urls stored under `version`
    pub async fn entries(&self, version: &str) -> Result<Vec<String>> {
        Ok(self
            .store
            .get::<Vec<String>>(&index_key(version))
            .await?
            .unwrap_or_default())
    }

    async fn is_registered(&self) -> Result<bool> {
        Ok(self.snapshot_names().await?.contains(&self.version))
    }

    async fn register(&self) -> Result<()> {
        let mut names = self.snapshot_names().await?;
        if !names.contains(&self.version) {
            names.push(self.version.clone());
            self.store.put(SNAPSHOTS_KEY, &names).await?;
        }
        Ok(())
    }

    /// Fetch the whole manifest and store it as the current version.
    ///
    /// Any transport failure or non-success status aborts before anything
    /// is written.
    #[instrument(skip(self, fetcher), fields(version = %self.version))]
    pub async fn install(&self, fetcher: &dyn AssetFetcher) -> Result<usize> {
        let urls = self.manifest_urls();
        info!("Installing {} assets", urls.len());

        let responses = try_join_all(urls.iter().map(|url| async move {
            let response = fetcher.fetch(&AssetRequest::get(url.as_str())).await?;
            if !response.is_success() {
                return Err(MeteoError::transport(format!(
                    "Failed to cache {url}: status {}",
                    response.status
                )));
            }
            Ok::<_, MeteoError>((url.clone(), response))
        }))
        .await?;

        let _guard = self.index_lock.lock().await;
        for (url, response) in &responses {
            self.store.put(&asset_key(&self.version, url), response).await?;
        }

        let mut index = self.entries(&self.version).await?;
        for (url, _) in &responses {
            if !index.contains(url) {
                index.push(url.clone());
            }
        }
        self.store.put(&index_key(&self.version), &index).await?;
        self.register().await?;

        info!("Snapshot {} installed with {} assets", self.version, responses.len());
        Ok(responses.len())
    }

    /// Purge every registered snapshot except the current version. Returns
    /// the purged version names.
    #[instrument(skip(self), fields(version = %self.version))]
    pub async fn activate(&self) -> Result<Vec<String>> {
        let _guard = self.index_lock.lock().await;
        let names = self.snapshot_names().await?;
        let (keep, purge): (Vec<String>, Vec<String>) =
            names.into_iter().partition(|name| *name == self.version);

        for name in &purge {
            info!("Deleting old snapshot {}", name);
            for url in self.entries(name).await? {
                self.store.remove(&asset_key(name, &url)).await?;
            }
            self.store.remove(&index_key(name)).await?;
        }

        self.store.put(SNAPSHOTS_KEY, &keep).await?;
        Ok(purge)
    }

    /// Cached response for `url` in the current snapshot
    pub async fn lookup(&self, url: &str) -> Result<Option<AssetResponse>> {
        if !self.is_registered().await? {
            debug!("Snapshot {} not installed", self.version);
            return Ok(None);
        }
        Ok(self.store.get(&asset_key(&self.version, url)).await?)
    }

    /// Add one response to the current snapshot, creating it if needed
    pub async fn put(&self, url: &str, response: &AssetResponse) -> Result<()> {
        if !response.is_success() {
            warn!("Refusing to cache {} with status {}", url, response.status);
            return Ok(());
        }

        let _guard = self.index_lock.lock().await;
        self.store.put(&asset_key(&self.version, url), response).await?;

        let mut index = self.entries(&self.version).await?;
        if !index.iter().any(|entry| entry == url) {
            index.push(url.to_string());
            self.store.put(&index_key(&self.version), &index).await?;
        }
        self.register().await?;
        debug!("Cached {}", url);
        Ok(())
    }
}
