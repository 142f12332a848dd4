//! Request routing between the snapshot and the network

use std::sync::Arc;

use reqwest::Url;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::{AssetCache, AssetFetcher, AssetResponse};
use crate::config::AssetsConfig;

const OFFLINE_API_MESSAGE: &str = "No internet connection";
const OFFLINE_ASSET_MESSAGE: &str = "Content not available offline";

/// An intercepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub method: String,
    pub url: String,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl AssetRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            accept: None,
            content_type: None,
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    #[must_use]
    pub fn accepts_html(&self) -> bool {
        self.accept
            .as_deref()
            .is_some_and(|accept| accept.contains("text/html"))
    }
}

/// How a request is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Not intercepted: non-GET or non-http(s)
    PassThrough,
    /// API traffic, never cached
    NetworkOnly,
    /// Snapshot first, network on miss
    CacheFirst,
}

/// Where a routed response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// Root document served in place of an unreachable page
    OfflineDocument,
    /// Synthesized 503
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedResponse {
    pub source: ResponseSource,
    pub response: AssetResponse,
}

impl RoutedResponse {
    fn new(source: ResponseSource, response: AssetResponse) -> Self {
        Self { source, response }
    }
}

pub struct AssetRouter {
    cache: Arc<AssetCache>,
    fetcher: Arc<dyn AssetFetcher>,
    network_only_hosts: Vec<String>,
    root_document_url: String,
}

impl AssetRouter {
    pub fn new(cache: Arc<AssetCache>, fetcher: Arc<dyn AssetFetcher>, config: &AssetsConfig) -> Self {
        let root_document_url = cache.url_for(&config.root_document);
        Self {
            cache,
            fetcher,
            network_only_hosts: config.network_only_hosts.clone(),
            root_document_url,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }

    #[must_use]
    pub fn strategy(&self, request: &AssetRequest) -> Strategy {
        if !request.method.eq_ignore_ascii_case("GET") {
            return Strategy::PassThrough;
        }

        let Ok(url) = Url::parse(&request.url) else {
            return Strategy::PassThrough;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return Strategy::PassThrough;
        }

        let host = url.host_str().unwrap_or_default();
        if self
            .network_only_hosts
            .iter()
            .any(|fragment| host.contains(fragment.as_str()))
        {
            Strategy::NetworkOnly
        } else {
            Strategy::CacheFirst
        }
    }

    /// Answer one request. Never fails; offline conditions become 503s.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn handle(&self, request: &AssetRequest) -> RoutedResponse {
        let strategy = self.strategy(request);
        debug!("Routing with {:?}", strategy);

        match strategy {
            Strategy::PassThrough => self.pass_through(request).await,
            Strategy::NetworkOnly => self.network_only(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
        }
    }

    async fn pass_through(&self, request: &AssetRequest) -> RoutedResponse {
        match self.fetcher.fetch(request).await {
            Ok(response) => RoutedResponse::new(ResponseSource::Network, response),
            Err(e) => {
                warn!("Upstream unreachable: {}", e);
                RoutedResponse::new(
                    ResponseSource::Unavailable,
                    AssetResponse::new(502, Some("text/plain"), "Bad gateway"),
                )
            }
        }
    }

    async fn network_only(&self, request: &AssetRequest) -> RoutedResponse {
        match self.fetcher.fetch(request).await {
            Ok(response) => RoutedResponse::new(ResponseSource::Network, response),
            Err(e) => {
                warn!("API request failed: {}", e);
                let body = json!({ "error": OFFLINE_API_MESSAGE }).to_string();
                RoutedResponse::new(
                    ResponseSource::Unavailable,
                    AssetResponse::new(503, Some("application/json"), body),
                )
            }
        }
    }

    async fn cache_first(&self, request: &AssetRequest) -> RoutedResponse {
        match self.cache.lookup(&request.url).await {
            Ok(Some(cached)) => return RoutedResponse::new(ResponseSource::Cache, cached),
            Ok(None) => {}
            Err(e) => warn!("Snapshot lookup failed: {}", e),
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    if let Err(e) = self.cache.put(&request.url, &response).await {
                        warn!("Could not cache {}: {}", request.url, e);
                    }
                }
                RoutedResponse::new(ResponseSource::Network, response)
            }
            Err(e) => {
                info!("Network unavailable for asset: {}", e);
                if request.accepts_html() {
                    if let Ok(Some(document)) = self.cache.lookup(&self.root_document_url).await {
                        return RoutedResponse::new(ResponseSource::OfflineDocument, document);
                    }
                }
                RoutedResponse::new(
                    ResponseSource::Unavailable,
                    AssetResponse::new(503, Some("text/plain; charset=utf-8"), OFFLINE_ASSET_MESSAGE),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MeteoError, Result};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct OfflineFetcher;

    #[async_trait]
    impl AssetFetcher for OfflineFetcher {
        async fn fetch(&self, _request: &AssetRequest) -> Result<AssetResponse> {
            Err(MeteoError::transport("offline"))
        }
    }

    fn router(dir: &TempDir) -> AssetRouter {
        let config = AssetsConfig::default();
        let cache = Arc::new(AssetCache::open(dir.path(), &config).unwrap());
        AssetRouter::new(cache, Arc::new(OfflineFetcher), &config)
    }

    #[tokio::test]
    async fn test_strategy_selection() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);

        let api = AssetRequest::get("https://api.open-meteo.com/v1/forecast?latitude=1");
        assert_eq!(router.strategy(&api), Strategy::NetworkOnly);

        let geo = AssetRequest::get("https://geocoding-api.example.org/v1/search");
        assert_eq!(router.strategy(&geo), Strategy::NetworkOnly);

        let asset = AssetRequest::get("http://127.0.0.1:8081/Meteo/style.css");
        assert_eq!(router.strategy(&asset), Strategy::CacheFirst);

        let post = AssetRequest {
            method: "POST".to_string(),
            ..AssetRequest::get("http://127.0.0.1:8081/Meteo/")
        };
        assert_eq!(router.strategy(&post), Strategy::PassThrough);

        let extension = AssetRequest::get("chrome-extension://abc/script.js");
        assert_eq!(router.strategy(&extension), Strategy::PassThrough);
    }

    #[tokio::test]
    async fn test_offline_api_returns_json_503() {
        let dir = TempDir::new().unwrap();
        let routed = router(&dir)
            .handle(&AssetRequest::get("https://api.open-meteo.com/v1/forecast"))
            .await;
        assert_eq!(routed.source, ResponseSource::Unavailable);
        assert_eq!(routed.response.status, 503);
        let body: serde_json::Value = serde_json::from_slice(&routed.response.body).unwrap();
        assert_eq!(body["error"], "No internet connection");
    }

    #[tokio::test]
    async fn test_offline_asset_miss_returns_plaintext_503() {
        let dir = TempDir::new().unwrap();
        let routed = router(&dir)
            .handle(&AssetRequest::get("http://127.0.0.1:8081/Meteo/style.css"))
            .await;
        assert_eq!(routed.response.status, 503);
        assert_eq!(routed.response.body, b"Content not available offline");
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_root_document() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);
        let index = AssetResponse::new(200, Some("text/html"), "<h1>Meteo</h1>");
        router
            .cache()
            .put("http://127.0.0.1:8081/Meteo/index.html", &index)
            .await
            .unwrap();

        let request =
            AssetRequest::get("http://127.0.0.1:8081/Meteo/forecast").with_accept("text/html,*/*");
        let routed = router.handle(&request).await;
        assert_eq!(routed.source, ResponseSource::OfflineDocument);
        assert_eq!(routed.response, index);
    }
}
