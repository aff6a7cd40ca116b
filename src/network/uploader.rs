// Copyright 2025 the spatial-telemetry authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// HTTP batch uploader

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use super::classify::classify_reqwest_error;
use crate::cache::CacheDelegate;
use crate::config::NetworkConfig;
use crate::error::SendError;

/// Capability interface for delivering one serialized batch.
///
/// Recorders and the cache coordinator depend on this trait, not on a
/// concrete client, so tests inject their own implementations.
#[async_trait]
pub trait BatchUploader: Send + Sync {
    /// POST `body` to `url`. Ok(()) means confirmed backend delivery;
    /// errors carry the classification that decides cache-versus-retry.
    async fn upload(&self, url: &str, body: &[u8]) -> Result<(), SendError>;
}

/// reqwest-backed uploader with pooled connections and an optional
/// captive-portal marker check on response bodies.
pub struct HttpUploader {
    client: reqwest::Client,
    response_marker: Option<String>,
}

impl HttpUploader {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let mut builder = reqwest::ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(config.timeout_seconds));

        if let Some(key) = &config.api_key {
            let mut headers = reqwest::header::HeaderMap::new();
            let auth_value = format!("APIKEY:DATA {}", key);
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&auth_value).context("Invalid API key")?,
            );
            builder = builder.default_headers(headers);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            response_marker: config.response_marker.clone(),
        })
    }

    /// Whether a 2xx response body carries the expected backend marker.
    /// Captive portals frequently return 200 with their own content.
    fn body_is_valid(&self, body: &[u8]) -> bool {
        match &self.response_marker {
            Some(marker) => String::from_utf8_lossy(body).contains(marker.as_str()),
            None => true,
        }
    }

    /// Perform the POST and return the raw (status, body) exchange
    /// without judging application-level success.
    async fn exchange(&self, url: &str, body: &[u8]) -> Result<(u16, Bytes), SendError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status().as_u16();
        let response_body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        Ok((status, response_body))
    }
}

#[async_trait]
impl BatchUploader for HttpUploader {
    async fn upload(&self, url: &str, body: &[u8]) -> Result<(), SendError> {
        let (status, response_body) = self.exchange(url, body).await?;
        if !(200..300).contains(&status) {
            return Err(SendError::Http { status });
        }
        if !self.body_is_valid(&response_body) {
            warn!("Response from {} lacked the backend marker", url);
            return Err(SendError::InvalidResponse);
        }

        debug!("Delivered {} bytes to {}", body.len(), url);
        Ok(())
    }
}

/// The uploader doubles as the cache coordinator's replay delegate; a
/// replay counts as delivered only when `is_valid_response` accepts
/// the exchange.
#[async_trait]
impl CacheDelegate for HttpUploader {
    async fn upload_cached_request(&self, url: &str, body: &[u8]) -> bool {
        match self.exchange(url, body).await {
            Ok((status, response_body)) => self.is_valid_response(status, &response_body),
            Err(e) => {
                debug!("Cached replay to {} failed: {}", url, e);
                false
            }
        }
    }

    fn is_valid_response(&self, status: u16, body: &[u8]) -> bool {
        (200..300).contains(&status) && self.body_is_valid(body)
    }
}
