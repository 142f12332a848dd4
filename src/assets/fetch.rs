//! Network side of the asset router

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use tracing::{debug, warn};

use super::{AssetRequest, AssetResponse};
use crate::{MeteoError, Result};

/// Performs one network request.
///
/// `Err` means the request never got an answer. Any HTTP status, including
/// errors, comes back as `Ok`.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| MeteoError::validation(format!("Invalid method {}: {e}", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        if let Some(accept) = &request.accept {
            builder = builder.header(ACCEPT, accept);
        }
        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Network request to {} failed: {}", request.url, e);
            MeteoError::transport(format!("Request to {} failed: {e}", request.url))
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response
            .bytes()
            .await
            .map_err(|e| MeteoError::transport(format!("Reading {} failed: {e}", request.url)))?;

        debug!("{} {} -> {}", request.method, request.url, status);
        Ok(AssetResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}
