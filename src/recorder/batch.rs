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

// Shared batching engine
//
// One dispatcher per recorder. Records accumulate under the state
// mutex; a flush takes the whole batch, releases the lock, performs
// the send, then reacquires the lock to apply the outcome. The
// is_sending guard keeps at most one batch in flight per recorder so
// part numbers reach the backend as a contiguous sequence.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::cache::DataCacheSystem;
use crate::config::BatchPolicy;
use crate::error::SendError;
use crate::network::BatchUploader;
use crate::recorder::session::{SessionProperties, FORMAT_VERSION};

/// JSON envelope wrapping every outbound batch.
#[derive(Serialize)]
struct BatchEnvelope<'a, R: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    userid: Option<&'a str>,
    timestamp: i64,
    sessionid: &'a str,
    part: u64,
    formatversion: &'static str,
    data: &'a [R],
}

struct DispatchState<R> {
    pending: Vec<R>,
    /// Last part number confirmed by the backend; the next batch is
    /// tagged part + 1 and the counter advances only on success.
    part: u64,
    next_send: Instant,
    is_sending: bool,
}

/// Batching/retry engine shared by the four recorders.
pub struct BatchDispatcher<R> {
    name: &'static str,
    endpoint: String,
    policy: BatchPolicy,
    uploader: Arc<dyn BatchUploader>,
    cache: Arc<DataCacheSystem>,
    session: Arc<SessionProperties>,
    state: Mutex<DispatchState<R>>,
}

impl<R: Serialize + Send + Sync> BatchDispatcher<R> {
    pub fn new(
        name: &'static str,
        endpoint: String,
        policy: BatchPolicy,
        uploader: Arc<dyn BatchUploader>,
        cache: Arc<DataCacheSystem>,
        session: Arc<SessionProperties>,
    ) -> Self {
        let interval = policy.interval();
        Self {
            name,
            endpoint,
            policy,
            uploader,
            cache,
            session,
            state: Mutex::new(DispatchState {
                pending: Vec::new(),
                part: 0,
                next_send: Instant::now() + interval,
                is_sending: false,
            }),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Append a record; flushes when the batch reaches the configured
    /// size or the send interval has elapsed, whichever came first.
    pub async fn record(&self, record: R) {
        let due = {
            let mut state = self.state.lock().await;
            state.pending.push(record);
            state.pending.len() >= self.policy.batch_size || Instant::now() >= state.next_send
        };
        if due {
            self.flush().await;
        }
    }

    /// Send one record right away as a singleton batch, bypassing the
    /// pending buffer. Falls back to the buffer when a send is already
    /// in flight.
    pub async fn record_immediate(&self, record: R) {
        let part = {
            let mut state = self.state.lock().await;
            if state.is_sending {
                state.pending.push(record);
                return;
            }
            state.is_sending = true;
            state.part + 1
        };
        let batch = vec![record];
        let outcome = self.deliver(&batch, part).await;
        self.apply_outcome(batch, part, outcome).await;
    }

    /// Flush the pending batch now. Used by the size/time triggers and
    /// by lifecycle boundaries (scene change, session end). No-op when
    /// empty or when a send is already outstanding.
    pub async fn flush(&self) {
        let (batch, part) = {
            let mut state = self.state.lock().await;
            if state.is_sending || state.pending.is_empty() {
                return;
            }
            state.is_sending = true;
            (std::mem::take(&mut state.pending), state.part + 1)
        };
        let outcome = self.deliver(&batch, part).await;
        self.apply_outcome(batch, part, outcome).await;
    }

    /// Serialize and upload one batch. On a transient transport failure
    /// the serialized body is returned for caching.
    async fn deliver(&self, batch: &[R], part: u64) -> Result<(), (SendError, Option<Vec<u8>>)> {
        let envelope = BatchEnvelope {
            userid: self.session.user_id.as_deref(),
            timestamp: self.session.session_timestamp,
            sessionid: &self.session.session_id,
            part,
            formatversion: FORMAT_VERSION,
            data: batch,
        };
        let body = serde_json::to_vec(&envelope).map_err(|e| (SendError::from(e), None))?;

        match self.uploader.upload(&self.endpoint, &body).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_transient() => Err((e, Some(body))),
            Err(e) => Err((e, None)),
        }
    }

    /// Apply a send outcome under the lock: commit the part number,
    /// cache the body, or restore the batch for the next cycle.
    async fn apply_outcome(
        &self,
        batch: Vec<R>,
        part: u64,
        outcome: Result<(), (SendError, Option<Vec<u8>>)>,
    ) {
        // Cache outside the state lock; the coordinator serializes
        // its own file access.
        let (restore, sent) = match outcome {
            Ok(()) => {
                debug!("{}: sent part {} ({} records)", self.name, part, batch.len());
                (None, true)
            }
            Err((e, Some(body))) => {
                warn!("{}: transient send failure ({}), caching batch", self.name, e);
                if self.cache.cache_request(&self.endpoint, &body).await {
                    (None, false)
                } else {
                    // Could not durably cache; keep the records in memory
                    warn!("{}: cache rejected batch, keeping it in memory", self.name);
                    (Some(batch), false)
                }
            }
            Err((e, None)) => {
                warn!("{}: send failed ({}), retrying next cycle", self.name, e);
                (Some(batch), false)
            }
        };

        let mut state = self.state.lock().await;
        state.is_sending = false;
        state.next_send = Instant::now() + self.policy.interval();
        if sent {
            // A failed-and-cached batch does not consume a part number
            state.part = part;
        }
        if let Some(mut records) = restore {
            // Restored records go back to the front so arrival order
            // is preserved across the retry.
            records.append(&mut state.pending);
            state.pending = records;
        }
    }

    /// Count of buffered, not-yet-sent records.
    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Last backend-confirmed part number.
    pub async fn part(&self) -> u64 {
        self.state.lock().await.part
    }

    /// Periodic time-based flush driver. The returned handle is
    /// aborted wholesale at session end; an outstanding send is not
    /// awaited, the cache write is atomic either way.
    pub fn spawn_interval_flush(self: &Arc<Self>) -> tokio::task::JoinHandle<()>
    where
        R: 'static,
    {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(dispatcher.policy.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately; skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                dispatcher.flush().await;
            }
        })
    }

    /// Remaining time until the next scheduled time-based flush.
    pub async fn time_until_due(&self) -> Duration {
        let state = self.state.lock().await;
        state.next_send.saturating_duration_since(Instant::now())
    }
}
