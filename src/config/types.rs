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

// Configuration types for spatial-telemetry

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub batching: BatchingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Substring a genuine backend response must contain; 200s without
    /// it are treated as failures (captive portal detection).
    #[serde(default)]
    pub response_marker: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_seconds: default_timeout(),
            response_marker: None,
        }
    }
}

/// Offline cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_directory")]
    pub directory: String,

    /// Combined on-disk budget for the index and data files
    #[serde(default = "default_cache_capacity")]
    pub capacity_bytes: u64,

    /// Drop a cached entry after this many failed replays (0 = never)
    #[serde(default)]
    pub max_replay_attempts: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            capacity_bytes: default_cache_capacity(),
            max_replay_attempts: 0,
        }
    }
}

/// Per-recorder flush policy: a flush triggers when either the record
/// count reaches `batch_size` or `interval_seconds` has elapsed since
/// the last send, whichever comes first.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchPolicy {
    pub batch_size: usize,
    pub interval_seconds: u64,
}

impl BatchPolicy {
    pub fn new(batch_size: usize, interval_seconds: u64) -> Self {
        Self {
            batch_size,
            interval_seconds,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Flush policies for the four recorders
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchingConfig {
    #[serde(default = "default_event_policy")]
    pub events: BatchPolicy,

    #[serde(default = "default_gaze_policy")]
    pub gaze: BatchPolicy,

    #[serde(default = "default_sensor_policy")]
    pub sensors: BatchPolicy,

    #[serde(default = "default_dynamic_policy")]
    pub dynamics: BatchPolicy,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            events: default_event_policy(),
            gaze: default_gaze_policy(),
            sensors: default_sensor_policy(),
            dynamics: default_dynamic_policy(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://data.spatial-telemetry.io".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_cache_directory() -> String {
    "telemetry_cache".to_string()
}
fn default_cache_capacity() -> u64 {
    100 * 1024 * 1024
}
fn default_event_policy() -> BatchPolicy {
    BatchPolicy::new(64, 10)
}
fn default_gaze_policy() -> BatchPolicy {
    BatchPolicy::new(128, 10)
}
fn default_sensor_policy() -> BatchPolicy {
    BatchPolicy::new(128, 10)
}
fn default_dynamic_policy() -> BatchPolicy {
    BatchPolicy::new(128, 10)
}
fn default_log_level() -> String {
    "info".to_string()
}
