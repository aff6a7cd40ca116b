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

// Error taxonomy for the caching and delivery pipeline

use thiserror::Error;

/// Errors raised while opening or operating the dual-file cache.
///
/// Only initialization is surfaced as an error; runtime write failures
/// degrade to `false` returns so the pipeline never panics the host.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache directory does not exist: {0}")]
    MissingDirectory(String),

    #[error("cache directory is not writable: {0}")]
    NotWritable(String),

    #[error("cache i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the cache coordinator's public surface.
#[derive(Debug, Error)]
pub enum CacheSystemError {
    #[error("invalid cache path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Transport-layer failure classes indicating no viable connection
/// right now. Sends failing with one of these are cached to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("host unreachable")]
    HostUnreachable,

    #[error("connection lost")]
    ConnectionLost,

    #[error("request timed out")]
    Timeout,

    #[error("dns resolution failed")]
    DnsFailure,

    #[error("tls negotiation failed")]
    Tls,

    #[error("data not allowed on this network")]
    DataNotAllowed,
}

/// Classified outcome of a failed batch send.
///
/// `Transport` failures are durably cached; everything else keeps the
/// batch in memory for retry on the next flush cycle.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport failure: {0}")]
    Transport(TransportError),

    #[error("backend returned status {status}")]
    Http { status: u16 },

    #[error("response did not carry the expected backend marker")]
    InvalidResponse,

    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SendError {
    /// True when the failure indicates no current connectivity, meaning
    /// the payload should be cached rather than retried in memory.
    pub fn is_transient(&self) -> bool {
        matches!(self, SendError::Transport(_))
    }
}
