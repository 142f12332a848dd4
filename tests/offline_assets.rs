//! Snapshot lifecycle and offline routing of the web shell

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use meteo::MeteoError;
use meteo::assets::{
    AssetCache, AssetFetcher, AssetRequest, AssetResponse, AssetRouter, ResponseSource,
};
use meteo::config::AssetsConfig;

/// Serves every shell path while online, counts requests
struct ShellOrigin {
    online: AtomicBool,
    requests: AtomicUsize,
}

impl ShellOrigin {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
            requests: AtomicUsize::new(0),
        })
    }

    fn go_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssetFetcher for ShellOrigin {
    async fn fetch(&self, request: &AssetRequest) -> meteo::Result<AssetResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(MeteoError::transport("connection refused"));
        }
        if request.url.contains("open-meteo.com") {
            return Ok(AssetResponse::new(200, Some("application/json"), "{}"));
        }
        let content_type = if request.url.ends_with(".css") {
            "text/css"
        } else {
            "text/html"
        };
        Ok(AssetResponse::new(
            200,
            Some(content_type),
            format!("body of {}", request.url),
        ))
    }
}

fn config(version: &str) -> AssetsConfig {
    AssetsConfig {
        version: version.to_string(),
        origin: "http://shell.test".to_string(),
        manifest: vec!["/Meteo/index.html".to_string(), "/Meteo/style.css".to_string()],
        ..AssetsConfig::default()
    }
}

#[tokio::test]
async fn test_new_version_purges_old_snapshot() {
    let dir = TempDir::new().unwrap();
    let origin = ShellOrigin::new();

    let v1 = AssetCache::open(dir.path(), &config("meteo-pwa-v1")).unwrap();
    assert_eq!(v1.install(origin.as_ref()).await.unwrap(), 2);
    assert!(v1.activate().await.unwrap().is_empty());

    let v2 = v1.reconfigured(&config("meteo-pwa-v2"));
    v2.install(origin.as_ref()).await.unwrap();
    assert_eq!(v2.activate().await.unwrap(), ["meteo-pwa-v1"]);

    assert_eq!(v2.snapshot_names().await.unwrap(), ["meteo-pwa-v2"]);
    assert!(v2.entries("meteo-pwa-v1").await.unwrap().is_empty());
    assert_eq!(v2.entries("meteo-pwa-v2").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_offline_shell_is_served_from_snapshot() {
    let dir = TempDir::new().unwrap();
    let origin = ShellOrigin::new();
    let assets = config("meteo-pwa-v1");

    let cache = AssetCache::open(dir.path(), &assets).unwrap();
    cache.install(origin.as_ref()).await.unwrap();
    cache.activate().await.unwrap();

    let router = AssetRouter::new(Arc::new(cache), origin.clone(), &assets);
    origin.go_offline();
    let before = origin.requests.load(Ordering::SeqCst);

    let css = router
        .handle(&AssetRequest::get("http://shell.test/Meteo/style.css"))
        .await;
    assert_eq!(css.source, ResponseSource::Cache);
    assert_eq!(css.response.content_type.as_deref(), Some("text/css"));
    assert_eq!(origin.requests.load(Ordering::SeqCst), before);

    let page = router
        .handle(
            &AssetRequest::get("http://shell.test/Meteo/favorites").with_accept("text/html"),
        )
        .await;
    assert_eq!(page.source, ResponseSource::OfflineDocument);
    assert_eq!(page.response.body, b"body of http://shell.test/Meteo/index.html");

    let image = router
        .handle(&AssetRequest::get("http://shell.test/Meteo/icons/icon-72.png"))
        .await;
    assert_eq!(image.response.status, 503);
    assert_eq!(image.response.body, b"Content not available offline");

    let api = router
        .handle(&AssetRequest::get(
            "https://api.open-meteo.com/v1/forecast?latitude=1&longitude=2",
        ))
        .await;
    assert_eq!(api.response.status, 503);
    assert_eq!(api.response.content_type.as_deref(), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&api.response.body).unwrap();
    assert_eq!(body["error"], "No internet connection");
}

#[tokio::test]
async fn test_api_responses_are_never_cached() {
    let dir = TempDir::new().unwrap();
    let origin = ShellOrigin::new();
    let assets = config("meteo-pwa-v1");
    let cache = Arc::new(AssetCache::open(dir.path(), &assets).unwrap());
    let router = AssetRouter::new(cache.clone(), origin.clone(), &assets);

    let url = "https://geocoding-api.open-meteo.com/v1/search?name=Paris";
    let online = router.handle(&AssetRequest::get(url)).await;
    assert_eq!(online.source, ResponseSource::Network);
    assert!(cache.lookup(url).await.unwrap().is_none());

    let page = router
        .handle(&AssetRequest::get("http://shell.test/Meteo/about.html"))
        .await;
    assert_eq!(page.source, ResponseSource::Network);
    assert!(
        cache
            .lookup("http://shell.test/Meteo/about.html")
            .await
            .unwrap()
            .is_some()
    );
}
