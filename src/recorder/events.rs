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

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::batch::BatchDispatcher;
use super::session::SessionProperties;
use crate::cache::DataCacheSystem;
use crate::config::BatchPolicy;
use crate::network::BatchUploader;

/// One application event (user action, scene marker, custom event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    /// Unix seconds with fractional part
    pub time: f64,
    pub point: [f64; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

/// Batches application events for delivery.
pub struct EventRecorder {
    dispatcher: Arc<BatchDispatcher<EventRecord>>,
}

impl EventRecorder {
    pub fn new(
        base_url: &str,
        policy: BatchPolicy,
        uploader: Arc<dyn BatchUploader>,
        cache: Arc<DataCacheSystem>,
        session: Arc<SessionProperties>,
    ) -> Self {
        let endpoint = session.endpoint(base_url, "events");
        Self {
            dispatcher: Arc::new(BatchDispatcher::new(
                "events", endpoint, policy, uploader, cache, session,
            )),
        }
    }

    pub async fn record_event(&self, event: EventRecord) {
        self.dispatcher.record(event).await;
    }

    /// Immediate-priority events bypass batching and go out as a
    /// singleton batch right away.
    pub async fn record_immediate(&self, event: EventRecord) {
        self.dispatcher.record_immediate(event).await;
    }

    pub async fn send_all_pending_events(&self) {
        self.dispatcher.flush().await;
    }

    pub async fn send_data_before_scene_change(&self) {
        self.dispatcher.flush().await;
    }

    pub async fn end_session(&self) {
        self.dispatcher.flush().await;
    }

    pub async fn pending_len(&self) -> usize {
        self.dispatcher.pending_len().await
    }

    pub async fn part(&self) -> u64 {
        self.dispatcher.part().await
    }

    pub fn dispatcher(&self) -> &Arc<BatchDispatcher<EventRecord>> {
        &self.dispatcher
    }
}
