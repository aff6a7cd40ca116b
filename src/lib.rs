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

// Resilient client-side telemetry pipeline for spatial analytics
//
// This SDK-side subsystem:
// - Batches event/gaze/sensor/dynamic-object records in memory
// - Flushes batches based on size or time thresholds
// - Delivers batches over HTTP with monotonic part numbering
// - Caches batches that fail on a network-transient error into a
//   disk-backed dual-file LIFO log
// - Replays the cache (newest first) when connectivity returns

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod network;
pub mod recorder;

// Re-export main types
pub use cache::{CacheDelegate, CachedRequest, DataCacheSystem, DualFileCache};
pub use config::{load_config, load_config_with_env, BatchPolicy, TelemetryConfig};
pub use connectivity::{
    CallbackToken, ConnectionType, ConnectionWatcher, ConnectivityMonitor, SyncCoordinator,
};
pub use error::{CacheError, CacheSystemError, SendError, TransportError};
pub use network::{BatchUploader, HttpUploader};
pub use recorder::{
    DynamicDataManager, DynamicManifestEntry, DynamicRecord, DynamicSnapshot, EventRecord,
    EventRecorder, GazeDataManager, GazeRecord, SensorRecord, SensorRecorder, SessionProperties,
};
