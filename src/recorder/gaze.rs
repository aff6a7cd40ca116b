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

/// One gaze sample: where the user looked and where the headset was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazeRecord {
    /// Unix seconds with fractional part
    pub time: f64,
    /// World-space gaze point
    pub gaze: [f64; 3],
    /// Headset position
    pub position: [f64; 3],
    /// Headset rotation quaternion (x, y, z, w)
    pub rotation: [f64; 4],
    /// Id of the dynamic object hit by the gaze, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

/// Batches gaze samples for delivery.
pub struct GazeDataManager {
    dispatcher: Arc<BatchDispatcher<GazeRecord>>,
}

impl GazeDataManager {
    pub fn new(
        base_url: &str,
        policy: BatchPolicy,
        uploader: Arc<dyn BatchUploader>,
        cache: Arc<DataCacheSystem>,
        session: Arc<SessionProperties>,
    ) -> Self {
        let endpoint = session.endpoint(base_url, "gaze");
        Self {
            dispatcher: Arc::new(BatchDispatcher::new(
                "gaze", endpoint, policy, uploader, cache, session,
            )),
        }
    }

    pub async fn record_gaze(&self, sample: GazeRecord) {
        self.dispatcher.record(sample).await;
    }

    pub async fn send_all_pending_gaze(&self) {
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

    pub fn dispatcher(&self) -> &Arc<BatchDispatcher<GazeRecord>> {
        &self.dispatcher
    }
}
