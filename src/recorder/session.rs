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

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire format version stamped into every batch envelope and URL.
pub const FORMAT_VERSION: &str = "1.0";

/// Identity shared by all batches of one recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProperties {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub scene_id: String,
    pub scene_version: u32,
    /// Unix seconds at session start
    pub session_timestamp: i64,
}

impl SessionProperties {
    pub fn new(scene_id: impl Into<String>, scene_version: u32) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            user_id: None,
            scene_id: scene_id.into(),
            scene_version,
            session_timestamp: Utc::now().timestamp(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Destination URL for one record kind, carrying the scene id and
    /// version the backend uses to place the data.
    pub fn endpoint(&self, base_url: &str, kind: &str) -> String {
        format!(
            "{}/v{}/{}/{}?version={}",
            base_url.trim_end_matches('/'),
            FORMAT_VERSION,
            kind,
            self.scene_id,
            self.scene_version
        )
    }
}
