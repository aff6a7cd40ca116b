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

// Offline cache module
//
// Provides the disk-backed LIFO log of failed outbound requests and the
// coordinator that owns it. Recorders never touch the cache files
// directly; all access goes through DataCacheSystem, which serializes
// every operation against the single underlying log.

pub mod file;
pub mod system;

pub use file::{CachedRequest, DualFileCache, DEFAULT_CAPACITY_BYTES};
pub use system::{CacheDelegate, DataCacheSystem};
