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

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use spatial_telemetry::{
    CacheDelegate, ConnectionType, ConnectionWatcher, DataCacheSystem, SyncCoordinator,
};
use tempfile::TempDir;

struct SwitchableDelegate {
    online: AtomicBool,
    uploads: AtomicUsize,
}

impl SwitchableDelegate {
    fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            uploads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CacheDelegate for SwitchableDelegate {
    async fn upload_cached_request(&self, _url: &str, _body: &[u8]) -> bool {
        if self.online.load(Ordering::SeqCst) {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    fn is_valid_response(&self, status: u16, _body: &[u8]) -> bool {
        (200..300).contains(&status)
    }
}

async fn wait_for_empty(system: &DataCacheSystem) -> bool {
    for _ in 0..100 {
        if !system.has_content().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reconnect_drains_the_cache() {
    let dir = TempDir::new().unwrap();
    let system = Arc::new(DataCacheSystem::new());
    system.set_cache_path(dir.path()).await.unwrap();

    let delegate = Arc::new(SwitchableDelegate::new(true));
    system.set_delegate(delegate.clone()).await;

    system.cache_request("https://x/a", b"1").await;
    system.cache_request("https://x/b", b"2").await;

    let watcher = Arc::new(ConnectionWatcher::new());
    let _sync = SyncCoordinator::new(system.clone(), watcher.clone());

    watcher.set_status(true, ConnectionType::Wifi);

    assert!(wait_for_empty(&system).await, "cache never drained");
    assert_eq!(delegate.uploads.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn going_offline_does_not_trigger_a_drain() {
    let dir = TempDir::new().unwrap();
    let system = Arc::new(DataCacheSystem::new());
    system.set_cache_path(dir.path()).await.unwrap();

    let delegate = Arc::new(SwitchableDelegate::new(true));
    system.set_delegate(delegate.clone()).await;
    system.cache_request("https://x/a", b"1").await;

    let watcher = Arc::new(ConnectionWatcher::new());
    let _sync = SyncCoordinator::new(system.clone(), watcher.clone());

    // Report a connected transition first so the offline transition
    // below is a real change; this one drains the first entry.
    watcher.set_status(true, ConnectionType::Wifi);
    assert!(wait_for_empty(&system).await);

    system.cache_request("https://x/b", b"2").await;
    watcher.set_status(false, ConnectionType::Unknown);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(system.number_of_batches().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn drain_retries_on_next_reconnect() {
    let dir = TempDir::new().unwrap();
    let system = Arc::new(DataCacheSystem::new());
    system.set_cache_path(dir.path()).await.unwrap();

    // Network reachable per the OS, but uploads still failing
    let delegate = Arc::new(SwitchableDelegate::new(false));
    system.set_delegate(delegate.clone()).await;
    system.cache_request("https://x/a", b"1").await;

    let watcher = Arc::new(ConnectionWatcher::new());
    let _sync = SyncCoordinator::new(system.clone(), watcher.clone());

    watcher.set_status(true, ConnectionType::Cellular);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(system.number_of_batches().await, 1);

    // Backend comes back; the next transition drains the rest
    delegate.online.store(true, Ordering::SeqCst);
    watcher.set_status(false, ConnectionType::Unknown);
    watcher.set_status(true, ConnectionType::Wifi);

    assert!(wait_for_empty(&system).await, "cache never drained");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_coordinator_unsubscribes() {
    let dir = TempDir::new().unwrap();
    let system = Arc::new(DataCacheSystem::new());
    system.set_cache_path(dir.path()).await.unwrap();

    let delegate = Arc::new(SwitchableDelegate::new(true));
    system.set_delegate(delegate.clone()).await;
    system.cache_request("https://x/a", b"1").await;

    let watcher = Arc::new(ConnectionWatcher::new());
    {
        let _sync = SyncCoordinator::new(system.clone(), watcher.clone());
    }

    watcher.set_status(true, ConnectionType::Wifi);
    tokio::time::sleep(Duration::from_millis(100)).await;
    // Nobody listening anymore; the cache stays put
    assert_eq!(system.number_of_batches().await, 1);
}
