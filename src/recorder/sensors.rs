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

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::batch::BatchDispatcher;
use super::session::SessionProperties;
use crate::cache::DataCacheSystem;
use crate::config::BatchPolicy;
use crate::network::BatchUploader;

/// One named scalar sensor reading (heart rate, framerate, comfort...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorRecord {
    pub name: String,
    /// Unix seconds with fractional part
    pub time: f64,
    pub value: f64,
}

/// Batches sensor readings for delivery.
pub struct SensorRecorder {
    dispatcher: Arc<BatchDispatcher<SensorRecord>>,
}

impl SensorRecorder {
    pub fn new(
        base_url: &str,
        policy: BatchPolicy,
        uploader: Arc<dyn BatchUploader>,
        cache: Arc<DataCacheSystem>,
        session: Arc<SessionProperties>,
    ) -> Self {
        let endpoint = session.endpoint(base_url, "sensors");
        Self {
            dispatcher: Arc::new(BatchDispatcher::new(
                "sensors", endpoint, policy, uploader, cache, session,
            )),
        }
    }

    pub async fn record_sensor(&self, record: SensorRecord) {
        self.dispatcher.record(record).await;
    }

    /// Convenience wrapper stamping the reading with the current time.
    pub async fn record_value(&self, name: impl Into<String>, value: f64) {
        let now = Utc::now();
        let time = now.timestamp() as f64 + f64::from(now.timestamp_subsec_millis()) / 1000.0;
        self.record_sensor(SensorRecord {
            name: name.into(),
            time,
            value,
        })
        .await;
    }

    pub async fn send_all_pending_sensors(&self) {
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

    pub fn dispatcher(&self) -> &Arc<BatchDispatcher<SensorRecord>> {
        &self.dispatcher
    }
}
