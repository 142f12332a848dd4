//! `meteo serve`: HTTP front for the offline shell
//!
//! Every request goes through the [`AssetRouter`]. `/api/geocoding/*` and
//! `/api/weather/*` map onto the API bases; everything else maps onto the
//! shell origin.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::assets::{AssetRequest, AssetRouter, ResponseSource};
use crate::config::{AssetsConfig, WeatherConfig};

/// Header telling clients where a response came from
pub const SOURCE_HEADER: &str = "x-meteo-source";

/// Upstream bases requests are mapped onto
#[derive(Debug, Clone)]
pub struct Upstreams {
    pub geocoding: String,
    pub weather: String,
    pub shell: String,
}

impl Upstreams {
    pub fn new(weather: &WeatherConfig, assets: &AssetsConfig) -> Self {
        Self {
            geocoding: weather.geocoding_base_url.trim_end_matches('/').to_string(),
            weather: weather.forecast_base_url.trim_end_matches('/').to_string(),
            shell: assets.origin.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute upstream url for a local path and query
    #[must_use]
    pub fn resolve(&self, path_and_query: &str) -> String {
        if let Some(rest) = api_rest(path_and_query, "/api/geocoding") {
            format!("{}{}", self.geocoding, rest)
        } else if let Some(rest) = api_rest(path_and_query, "/api/weather") {
            format!("{}{}", self.weather, rest)
        } else {
            format!("{}{}", self.shell, path_and_query)
        }
    }
}

/// Remainder after `prefix` when it ends on a path segment boundary
fn api_rest<'a>(path_and_query: &'a str, prefix: &str) -> Option<&'a str> {
    path_and_query
        .strip_prefix(prefix)
        .filter(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
}

struct WebState {
    router: Arc<AssetRouter>,
    upstreams: Upstreams,
}

pub fn router(asset_router: Arc<AssetRouter>, upstreams: Upstreams) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = Arc::new(WebState {
        router: asset_router,
        upstreams,
    });

    Router::new()
        .fallback(proxy)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn proxy(
    State(state): State<Arc<WebState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let request = AssetRequest {
        method: method.as_str().to_string(),
        url: state.upstreams.resolve(path_and_query),
        accept: header_string(&headers, header::ACCEPT),
        content_type: header_string(&headers, header::CONTENT_TYPE),
        body: body.to_vec(),
    };

    let routed = state.router.handle(&request).await;
    let status = StatusCode::from_u16(routed.response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut response = (status, routed.response.body).into_response();
    if let Some(content_type) = routed
        .response
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response.headers_mut().insert(
        SOURCE_HEADER,
        HeaderValue::from_static(source_name(routed.source)),
    );
    response
}

fn source_name(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Network => "network",
        ResponseSource::Cache => "cache",
        ResponseSource::OfflineDocument => "offline-document",
        ResponseSource::Unavailable => "unavailable",
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Bind `listen` and serve until interrupted
pub async fn run(listen: &str, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    tracing::info!("Offline front running at http://{}", listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetCache, AssetFetcher, AssetResponse};
    use crate::{MeteoError, Result};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct OfflineFetcher;

    #[async_trait]
    impl AssetFetcher for OfflineFetcher {
        async fn fetch(&self, _request: &AssetRequest) -> Result<AssetResponse> {
            Err(MeteoError::transport("offline"))
        }
    }

    fn upstreams() -> Upstreams {
        Upstreams::new(&WeatherConfig::default(), &AssetsConfig::default())
    }

    #[test]
    fn test_resolve_upstream() {
        let upstreams = upstreams();
        assert_eq!(
            upstreams.resolve("/api/geocoding/search?name=Paris"),
            "https://geocoding-api.open-meteo.com/v1/search?name=Paris"
        );
        assert_eq!(
            upstreams.resolve("/api/weather/forecast?latitude=1"),
            "https://api.open-meteo.com/v1/forecast?latitude=1"
        );
        assert_eq!(
            upstreams.resolve("/Meteo/style.css"),
            "http://127.0.0.1:8081/Meteo/style.css"
        );
    }

    #[test]
    fn test_api_prefix_ends_on_segment_boundary() {
        let upstreams = upstreams();
        assert_eq!(
            upstreams.resolve("/api/geocodingfoo/search"),
            "http://127.0.0.1:8081/api/geocodingfoo/search"
        );
        assert_eq!(
            upstreams.resolve("/api/weatherman"),
            "http://127.0.0.1:8081/api/weatherman"
        );
        assert_eq!(
            upstreams.resolve("/api/weather?latitude=1"),
            "https://api.open-meteo.com/v1?latitude=1"
        );
    }

    #[tokio::test]
    async fn test_cached_asset_is_served_offline() {
        let dir = TempDir::new().unwrap();
        let config = AssetsConfig::default();
        let cache = Arc::new(AssetCache::open(dir.path(), &config).unwrap());
        cache
            .put(
                "http://127.0.0.1:8081/Meteo/style.css",
                &AssetResponse::new(200, Some("text/css"), "body{}"),
            )
            .await
            .unwrap();

        let asset_router = Arc::new(AssetRouter::new(cache, Arc::new(OfflineFetcher), &config));
        let app = router(asset_router, upstreams());

        let response = app
            .clone()
            .oneshot(Request::get("/Meteo/style.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[SOURCE_HEADER], "cache");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

        let response = app
            .oneshot(
                Request::get("/api/weather/forecast?latitude=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
