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

// Recorder batching engines
//
// Four recorders (events, gaze, sensors, dynamic objects) share one
// batching engine: records accumulate in memory, a flush triggers on
// size or elapsed time, and failed sends are classified: transient
// transport failures hand the serialized batch to the cache
// coordinator, everything else restores the batch for the next cycle.

pub mod batch;
pub mod dynamics;
pub mod events;
pub mod gaze;
pub mod sensors;
pub mod session;

pub use batch::BatchDispatcher;
pub use dynamics::{DynamicDataManager, DynamicManifestEntry, DynamicRecord, DynamicSnapshot};
pub use events::{EventRecord, EventRecorder};
pub use gaze::{GazeDataManager, GazeRecord};
pub use sensors::{SensorRecord, SensorRecorder};
pub use session::SessionProperties;
