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

// Connectivity monitor and sync coordinator
//
// The monitor is observer-only: it never touches cache or recorder
// state. Reachability transitions fan out to registered callbacks; the
// sync coordinator subscribes and asks the cache coordinator to drain
// when the network comes back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cache::DataCacheSystem;

/// Kind of link the device currently has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Wifi,
    Cellular,
    Wired,
    Unknown,
}

/// Callback invoked on reachability transitions.
pub type ConnectionCallback = Box<dyn Fn(bool, ConnectionType) + Send + Sync>;

/// Handle for unregistering a connection callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackToken(u64);

/// Reachability signal source the core subscribes to. Platform code
/// supplies the actual detection; the pipeline only consumes
/// transitions.
pub trait ConnectivityMonitor: Send + Sync {
    fn add_connection_callback(&self, callback: ConnectionCallback) -> CallbackToken;
    fn remove_connection_callback(&self, token: CallbackToken);
}

/// Callback registry fed by the host application's reachability probe
/// via `set_status`. Callbacks fire only on actual transitions.
pub struct ConnectionWatcher {
    callbacks: DashMap<u64, ConnectionCallback>,
    next_token: AtomicU64,
    status: Mutex<(bool, ConnectionType)>,
}

impl Default for ConnectionWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionWatcher {
    pub fn new() -> Self {
        Self {
            callbacks: DashMap::new(),
            next_token: AtomicU64::new(1),
            status: Mutex::new((false, ConnectionType::Unknown)),
        }
    }

    /// Push a new reachability status. No-op unless it differs from
    /// the last observed status.
    pub fn set_status(&self, connected: bool, kind: ConnectionType) {
        {
            let mut status = self
                .status
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if *status == (connected, kind) {
                return;
            }
            *status = (connected, kind);
        }
        debug!(
            "Connectivity changed: connected={} type={:?}",
            connected, kind
        );
        for entry in &self.callbacks {
            entry.value()(connected, kind);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .0
    }
}

impl ConnectivityMonitor for ConnectionWatcher {
    fn add_connection_callback(&self, callback: ConnectionCallback) -> CallbackToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.callbacks.insert(token, callback);
        CallbackToken(token)
    }

    fn remove_connection_callback(&self, token: CallbackToken) {
        self.callbacks.remove(&token.0);
    }
}

/// Bridges reachability transitions to cache drains. Registers one
/// callback on construction; unregisters and stops the drain task on
/// drop. It only ever calls the cache coordinator's public surface.
pub struct SyncCoordinator {
    monitor: Arc<dyn ConnectivityMonitor>,
    token: CallbackToken,
    drain_task: tokio::task::JoinHandle<()>,
}

impl SyncCoordinator {
    pub fn new(cache: Arc<DataCacheSystem>, monitor: Arc<dyn ConnectivityMonitor>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let token = monitor.add_connection_callback(Box::new(move |connected, _kind| {
            if connected {
                let _ = tx.send(());
            }
        }));

        let drain_task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Collapse bursts of transitions into one drain
                while rx.try_recv().is_ok() {}
                if cache.has_content().await {
                    info!("Network reachable, draining offline cache");
                    cache.upload_cached_content().await;
                }
            }
        });

        Self {
            monitor,
            token,
            drain_task,
        }
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.monitor.remove_connection_callback(self.token);
        self.drain_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn callbacks_fire_only_on_transition() {
        let watcher = ConnectionWatcher::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_clone = fired.clone();
        watcher.add_connection_callback(Box::new(move |_connected, _kind| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        watcher.set_status(true, ConnectionType::Wifi);
        watcher.set_status(true, ConnectionType::Wifi); // duplicate
        watcher.set_status(false, ConnectionType::Wifi);

        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(!watcher.is_connected());
    }

    #[test]
    fn removed_callbacks_stop_firing() {
        let watcher = ConnectionWatcher::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_clone = fired.clone();
        let token = watcher.add_connection_callback(Box::new(move |_c, _k| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        watcher.set_status(true, ConnectionType::Cellular);
        watcher.remove_connection_callback(token);
        watcher.set_status(false, ConnectionType::Cellular);

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
