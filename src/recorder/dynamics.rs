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

/// Registration of a dynamic object before its transforms stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicManifestEntry {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
}

/// One transform sample of a registered dynamic object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicSnapshot {
    pub id: String,
    /// Unix seconds with fractional part
    pub time: f64,
    pub position: [f64; 3],
    /// Rotation quaternion (x, y, z, w)
    pub rotation: [f64; 4],
}

/// Manifest entries and snapshots share one batch so registrations
/// always reach the backend no later than the transforms they describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicRecord {
    Manifest(DynamicManifestEntry),
    Snapshot(DynamicSnapshot),
}

/// Batches dynamic-object data for delivery.
pub struct DynamicDataManager {
    dispatcher: Arc<BatchDispatcher<DynamicRecord>>,
}

impl DynamicDataManager {
    pub fn new(
        base_url: &str,
        policy: BatchPolicy,
        uploader: Arc<dyn BatchUploader>,
        cache: Arc<DataCacheSystem>,
        session: Arc<SessionProperties>,
    ) -> Self {
        let endpoint = session.endpoint(base_url, "dynamics");
        Self {
            dispatcher: Arc::new(BatchDispatcher::new(
                "dynamics", endpoint, policy, uploader, cache, session,
            )),
        }
    }

    pub async fn register_object(&self, entry: DynamicManifestEntry) {
        self.dispatcher.record(DynamicRecord::Manifest(entry)).await;
    }

    pub async fn record_snapshot(&self, snapshot: DynamicSnapshot) {
        self.dispatcher.record(DynamicRecord::Snapshot(snapshot)).await;
    }

    pub async fn send_all_pending_snapshots(&self) {
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

    pub fn dispatcher(&self) -> &Arc<BatchDispatcher<DynamicRecord>> {
        &self.dispatcher
    }
}
