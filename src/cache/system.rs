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

// Cache coordinator
//
// Single owner of the dual-file log. Every operation takes the state
// mutex, so concurrent callers never interleave file writes. The
// delegate performs the actual network upload of cached entries; the
// coordinator never constructs HTTP requests itself.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::file::{CachedRequest, DualFileCache, DEFAULT_CAPACITY_BYTES};
use crate::error::CacheSystemError;

/// Callback surface the HTTP client layer supplies for replaying
/// cached entries.
#[async_trait]
pub trait CacheDelegate: Send + Sync {
    /// Upload one cached request. Returns true on confirmed delivery.
    async fn upload_cached_request(&self, url: &str, body: &[u8]) -> bool;

    /// Whether an HTTP response should count as a real backend success.
    /// Guards against captive portals that answer 200 for everything.
    fn is_valid_response(&self, status: u16, body: &[u8]) -> bool;
}

struct CacheState {
    log: Option<DualFileCache>,
    /// Replay failures of the entry currently at the front. Cleared
    /// whenever the front entry changes, so a newly cached entry gets
    /// its own full allotment.
    front_retry: Option<FrontRetry>,
}

struct FrontRetry {
    entry: CachedRequest,
    failures: u32,
}

/// Coordinator owning the offline cache and the send-or-cache policy.
pub struct DataCacheSystem {
    state: Mutex<CacheState>,
    delegate: RwLock<Option<Arc<dyn CacheDelegate>>>,
    capacity: u64,
    /// Drop a front entry after this many failed replays; 0 = never.
    max_replay_attempts: u32,
}

impl Default for DataCacheSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCacheSystem {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_CAPACITY_BYTES, 0)
    }

    pub fn with_settings(capacity: u64, max_replay_attempts: u32) -> Self {
        Self {
            state: Mutex::new(CacheState {
                log: None,
                front_retry: None,
            }),
            delegate: RwLock::new(None),
            capacity,
            max_replay_attempts,
        }
    }

    /// Lazily construct the dual-file log at the given directory.
    /// Replaces (and closes) any previously opened log.
    pub async fn set_cache_path(&self, path: &Path) -> Result<(), CacheSystemError> {
        let log = DualFileCache::open_with_capacity(path, self.capacity)
            .map_err(CacheSystemError::from)?;

        let mut state = self.state.lock().await;
        if let Some(mut old) = state.log.take() {
            old.close();
        }
        state.front_retry = None;
        state.log = Some(log);
        info!("Cache path set to {}", path.display());
        Ok(())
    }

    /// Register the network delegate used for uploads and replay.
    pub async fn set_delegate(&self, delegate: Arc<dyn CacheDelegate>) {
        *self.delegate.write().await = Some(delegate);
    }

    /// Append one failed request to the log. Returns false when the
    /// entry could not be durably cached (no log, closed, capacity, or
    /// I/O failure); the caller must then keep its data in memory.
    pub async fn cache_request(&self, url: &str, body: &[u8]) -> bool {
        let mut state = self.state.lock().await;
        let Some(log) = state.log.as_mut() else {
            warn!("cache_request with no cache path configured, caller keeps the data");
            return false;
        };
        let written = log.write_content(url, body);
        if written {
            debug!("Cached {} bytes for {}", body.len(), url);
        }
        written
    }

    /// Attempt the request immediately through the delegate; cache it
    /// on failure. Returns whether the attempt itself succeeded.
    pub async fn handle_request(&self, url: &str, body: &[u8]) -> bool {
        let delegate = self.delegate.read().await.clone();
        let Some(delegate) = delegate else {
            warn!("handle_request with no delegate registered, caching directly");
            self.cache_request(url, body).await;
            return false;
        };

        if delegate.upload_cached_request(url, body).await {
            return true;
        }
        self.cache_request(url, body).await;
        false
    }

    /// Drain the log most-recent-first: peek, upload, pop on success.
    /// Stops at the first failed upload so a still-down network is not
    /// spun against; remaining entries keep their order for the next
    /// drain. An entry failing `max_replay_attempts` consecutive drains
    /// is dropped with a warning.
    pub async fn upload_cached_content(&self) {
        let delegate = self.delegate.read().await.clone();
        let Some(delegate) = delegate else {
            warn!("upload_cached_content with no delegate registered");
            return;
        };

        let mut state = self.state.lock().await;
        let CacheState { log, front_retry } = &mut *state;
        let Some(log) = log.as_mut() else {
            return;
        };

        let mut uploaded = 0usize;
        loop {
            let Some(entry) = log.peek_content() else {
                *front_retry = None;
                break;
            };

            if delegate
                .upload_cached_request(&entry.destination, &entry.body)
                .await
            {
                log.pop_content();
                *front_retry = None;
                uploaded += 1;
                continue;
            }

            let failures = match front_retry {
                // Still the same front entry as last failure
                Some(retry) if retry.entry == entry => {
                    retry.failures += 1;
                    retry.failures
                }
                _ => {
                    *front_retry = Some(FrontRetry {
                        entry: entry.clone(),
                        failures: 1,
                    });
                    1
                }
            };
            if self.max_replay_attempts > 0 && failures >= self.max_replay_attempts {
                warn!(
                    "Dropping cached entry for {} after {} failed replays",
                    entry.destination, failures
                );
                log.pop_content();
                *front_retry = None;
                continue;
            }
            debug!(
                "Cache drain stopped: upload to {} failed ({} remaining)",
                entry.destination,
                log.number_of_batches()
            );
            break;
        }

        if uploaded > 0 {
            info!(
                "Replayed {} cached batches, {} remaining",
                uploaded,
                log.number_of_batches()
            );
        }
    }

    /// Pop every entry without sending. Used for deliberate resets.
    pub async fn clear_cache(&self) {
        let mut state = self.state.lock().await;
        state.front_retry = None;
        let Some(log) = state.log.as_mut() else {
            return;
        };
        let dropped = log.number_of_batches();
        while log.has_content() {
            log.pop_content();
        }
        if dropped > 0 {
            info!("Cleared {} cached batches", dropped);
        }
    }

    /// Close the underlying log; later writes fail gracefully.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if let Some(log) = state.log.as_mut() {
            log.close();
        }
    }

    pub async fn has_content(&self) -> bool {
        let state = self.state.lock().await;
        state.log.as_ref().is_some_and(DualFileCache::has_content)
    }

    pub async fn number_of_batches(&self) -> usize {
        let state = self.state.lock().await;
        state
            .log
            .as_ref()
            .map_or(0, DualFileCache::number_of_batches)
    }

    /// Fill fraction of the underlying log, 0.0 when unconfigured.
    pub async fn fill_amount(&self) -> f64 {
        let state = self.state.lock().await;
        state.log.as_ref().map_or(0.0, DualFileCache::fill_amount)
    }
}
