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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use spatial_telemetry::{CacheDelegate, DataCacheSystem};
use tempfile::TempDir;

/// Delegate recording every upload; fails calls whose index appears in
/// `fail_on`.
struct RecordingDelegate {
    calls: Mutex<Vec<(String, Vec<u8>)>>,
    counter: AtomicUsize,
    fail_on: Vec<usize>,
}

impl RecordingDelegate {
    fn new(fail_on: Vec<usize>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            fail_on,
        }
    }

    fn bodies(&self) -> Vec<Vec<u8>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

#[async_trait]
impl CacheDelegate for RecordingDelegate {
    async fn upload_cached_request(&self, url: &str, body: &[u8]) -> bool {
        let call = self.counter.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), body.to_vec()));
        !self.fail_on.contains(&call)
    }

    fn is_valid_response(&self, status: u16, _body: &[u8]) -> bool {
        (200..300).contains(&status)
    }
}

async fn seeded_system(dir: &TempDir) -> Arc<DataCacheSystem> {
    let system = Arc::new(DataCacheSystem::new());
    system.set_cache_path(dir.path()).await.unwrap();
    system.cache_request("https://x/a", b"1").await;
    system.cache_request("https://x/b", b"2").await;
    system.cache_request("https://x/c", b"3").await;
    system
}

#[tokio::test]
async fn drain_pops_exactly_one_when_second_upload_fails() {
    let dir = TempDir::new().unwrap();
    let system = seeded_system(&dir).await;

    // First upload (the most recent entry, "3") succeeds, second fails
    let delegate = Arc::new(RecordingDelegate::new(vec![1]));
    system.set_delegate(delegate.clone()).await;
    system.upload_cached_content().await;

    assert_eq!(system.number_of_batches().await, 2);
    assert_eq!(delegate.bodies(), vec![b"3".to_vec(), b"2".to_vec()]);

    // A later drain picks up where it left off, preserving order
    let retry = Arc::new(RecordingDelegate::new(vec![]));
    system.set_delegate(retry.clone()).await;
    system.upload_cached_content().await;

    assert_eq!(system.number_of_batches().await, 0);
    assert_eq!(retry.bodies(), vec![b"2".to_vec(), b"1".to_vec()]);
}

#[tokio::test]
async fn drain_replays_newest_first() {
    let dir = TempDir::new().unwrap();
    let system = seeded_system(&dir).await;

    let delegate = Arc::new(RecordingDelegate::new(vec![]));
    system.set_delegate(delegate.clone()).await;
    system.upload_cached_content().await;

    assert_eq!(
        delegate.bodies(),
        vec![b"3".to_vec(), b"2".to_vec(), b"1".to_vec()]
    );
    assert!(!system.has_content().await);
}

#[tokio::test]
async fn cached_entries_survive_a_new_coordinator() {
    let dir = TempDir::new().unwrap();
    {
        let system = seeded_system(&dir).await;
        system.close().await;
    }

    // Simulates an app restart: fresh coordinator, same directory
    let system = DataCacheSystem::new();
    system.set_cache_path(dir.path()).await.unwrap();
    assert_eq!(system.number_of_batches().await, 3);

    let delegate = Arc::new(RecordingDelegate::new(vec![]));
    system.set_delegate(delegate.clone()).await;
    system.upload_cached_content().await;
    assert_eq!(
        delegate.bodies(),
        vec![b"3".to_vec(), b"2".to_vec(), b"1".to_vec()]
    );
}

#[tokio::test]
async fn handle_request_reports_attempt_outcome_not_cache_outcome() {
    let dir = TempDir::new().unwrap();
    let system = Arc::new(DataCacheSystem::new());
    system.set_cache_path(dir.path()).await.unwrap();

    let failing = Arc::new(RecordingDelegate::new(vec![0, 1, 2, 3]));
    system.set_delegate(failing).await;

    // Attempt fails, entry is cached, return value reflects the attempt
    assert!(!system.handle_request("https://x/a", b"1").await);
    assert_eq!(system.number_of_batches().await, 1);

    let ok = Arc::new(RecordingDelegate::new(vec![]));
    system.set_delegate(ok).await;
    assert!(system.handle_request("https://x/b", b"2").await);
    // The earlier failure is still cached, the success was not added
    assert_eq!(system.number_of_batches().await, 1);
}

#[tokio::test]
async fn fill_amount_tracks_cached_data() {
    let dir = TempDir::new().unwrap();
    let system = DataCacheSystem::with_settings(10_000, 0);
    system.set_cache_path(dir.path()).await.unwrap();

    assert_eq!(system.fill_amount().await, 0.0);
    system.cache_request("https://x/a", &[0u8; 1000]).await;
    let fill = system.fill_amount().await;
    assert!(fill > 0.09 && fill < 0.2, "unexpected fill {fill}");

    system.clear_cache().await;
    assert_eq!(system.fill_amount().await, 0.0);
}

#[tokio::test]
async fn concurrent_cache_requests_do_not_interleave() {
    let dir = TempDir::new().unwrap();
    let system = Arc::new(DataCacheSystem::new());
    system.set_cache_path(dir.path()).await.unwrap();

    let mut handles = Vec::new();
    for task in 0..8 {
        let system = system.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..10 {
                let body = format!("task-{task}-entry-{i}");
                assert!(system.cache_request("https://x/c", body.as_bytes()).await);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(system.number_of_batches().await, 80);

    // Every entry must read back intact
    let delegate = Arc::new(RecordingDelegate::new(vec![]));
    system.set_delegate(delegate.clone()).await;
    system.upload_cached_content().await;
    let bodies = delegate.bodies();
    assert_eq!(bodies.len(), 80);
    for body in bodies {
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("task-"), "corrupt entry: {text}");
    }
}
