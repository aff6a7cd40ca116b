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

// Dual-file durable append log
//
// Two cooperating files back the log:
// - an index file holding one compact record per entry
//   (data offset, body length, destination string)
// - a data file holding the concatenated raw bodies
//
// Entries append in arrival order; peek/pop operate on the
// most-recently-written entry (LIFO). Popping truncates the tail of
// both files, which keeps removal cheap and keeps the two files in
// lockstep. The full index is mirrored in memory, rebuilt by a single
// forward scan on open.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::CacheError;

/// Default on-disk capacity for the cache (index + data files combined).
pub const DEFAULT_CAPACITY_BYTES: u64 = 100 * 1024 * 1024;

const INDEX_FILE_NAME: &str = "telemetry.idx";
const DATA_FILE_NAME: &str = "telemetry.dat";

// Index record layout: data_offset u64 | body_len u64 | dest_len u32 | dest bytes
const INDEX_RECORD_HEADER: u64 = 8 + 8 + 4;

/// One persisted (destination, body) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRequest {
    /// Absolute destination URL; empty for destination-less payloads.
    pub destination: String,
    /// Opaque serialized payload bytes.
    pub body: Bytes,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    /// Offset of this record in the index file (truncation point on pop).
    index_offset: u64,
    /// Offset of the body in the data file.
    data_offset: u64,
    body_len: u64,
    destination: String,
}

impl IndexEntry {
    fn record_len(&self) -> u64 {
        INDEX_RECORD_HEADER + self.destination.len() as u64
    }
}

/// Disk-backed LIFO queue of failed outbound requests.
///
/// Not safe for concurrent multi-writer access; the cache coordinator
/// is the sole owner and serializes every call.
pub struct DualFileCache {
    index_file: File,
    data_file: File,
    entries: Vec<IndexEntry>,
    index_len: u64,
    data_len: u64,
    capacity: u64,
    closed: bool,
    path: PathBuf,
}

impl DualFileCache {
    /// Open (or create) the two backing files inside `dir`.
    ///
    /// Fails if the directory does not exist or is not writable.
    /// Existing entries are recovered by scanning the index file; a
    /// truncated or inconsistent tail is dropped with a warning rather
    /// than failing the open.
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        Self::open_with_capacity(dir, DEFAULT_CAPACITY_BYTES)
    }

    pub fn open_with_capacity(dir: &Path, capacity: u64) -> Result<Self, CacheError> {
        if !dir.is_dir() {
            return Err(CacheError::MissingDirectory(dir.display().to_string()));
        }

        // Probe writability before opening the real files
        let probe = dir.join(".write_probe");
        match File::create(&probe) {
            Ok(_) => {
                let _ = std::fs::remove_file(&probe);
            }
            Err(_) => {
                return Err(CacheError::NotWritable(dir.display().to_string()));
            }
        }

        let index_path = dir.join(INDEX_FILE_NAME);
        let data_path = dir.join(DATA_FILE_NAME);

        let mut index_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&index_path)?;
        let data_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&data_path)?;

        let data_file_len = data_file.metadata()?.len();
        let (entries, index_len, data_len) = Self::scan_index(&mut index_file, data_file_len)?;

        // Drop any bytes past the recovered end of either file (a crash
        // between body write and index write leaves an orphan body tail).
        index_file.set_len(index_len)?;
        data_file.set_len(data_len)?;

        debug!(
            "Opened cache at {} with {} entries ({} bytes)",
            dir.display(),
            entries.len(),
            index_len + data_len
        );

        Ok(Self {
            index_file,
            data_file,
            entries,
            index_len,
            data_len,
            capacity,
            closed: false,
            path: dir.to_path_buf(),
        })
    }

    /// Forward-scan the index file, rebuilding the in-memory mirror.
    ///
    /// Stops at the first record that is truncated or points past the
    /// end of the data file; everything before it is kept.
    fn scan_index(
        index_file: &mut File,
        data_file_len: u64,
    ) -> Result<(Vec<IndexEntry>, u64, u64), CacheError> {
        let mut raw = Vec::new();
        index_file.seek(SeekFrom::Start(0))?;
        index_file.read_to_end(&mut raw)?;

        let mut entries = Vec::new();
        let mut pos: usize = 0;
        let mut data_end: u64 = 0;

        while raw.len() - pos >= INDEX_RECORD_HEADER as usize {
            let data_offset = u64::from_le_bytes(raw[pos..pos + 8].try_into().unwrap());
            let body_len = u64::from_le_bytes(raw[pos + 8..pos + 16].try_into().unwrap());
            let dest_len = u32::from_le_bytes(raw[pos + 16..pos + 20].try_into().unwrap()) as usize;

            let record_end = pos + INDEX_RECORD_HEADER as usize + dest_len;
            if record_end > raw.len() {
                warn!("Truncated index record at offset {}, dropping tail", pos);
                break;
            }

            // Bodies are appended sequentially; anything out of line
            // means the files disagree and the rest is unreadable.
            if data_offset != data_end || data_offset + body_len > data_file_len {
                warn!(
                    "Index record at offset {} points outside the data file, dropping tail",
                    pos
                );
                break;
            }

            let destination =
                match String::from_utf8(raw[pos + 20..pos + 20 + dest_len].to_vec()) {
                    Ok(s) => s,
                    Err(_) => {
                        warn!("Corrupt destination in index record at offset {}", pos);
                        break;
                    }
                };

            entries.push(IndexEntry {
                index_offset: pos as u64,
                data_offset,
                body_len,
                destination,
            });
            data_end = data_offset + body_len;
            pos = record_end;
        }

        Ok((entries, pos as u64, data_end))
    }

    /// True iff at least one unpopped entry exists.
    pub fn has_content(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Count of unpopped entries. Still answers after `close()`.
    pub fn number_of_batches(&self) -> usize {
        self.entries.len()
    }

    /// Directory this cache lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn total_size(&self) -> u64 {
        self.index_len + self.data_len
    }

    fn entry_cost(destination: &str, body: &[u8]) -> u64 {
        INDEX_RECORD_HEADER + destination.len() as u64 + body.len() as u64
    }

    /// Whether appending this entry keeps total size within capacity.
    pub fn can_write(&self, destination: &str, body: &[u8]) -> bool {
        !self.closed && self.total_size() + Self::entry_cost(destination, body) <= self.capacity
    }

    /// Capacity check for a destination-less payload.
    pub fn can_write_raw(&self, body: &[u8]) -> bool {
        self.can_write("", body)
    }

    /// Append one entry. Returns false, without partial writes, if the
    /// entry would exceed capacity, the log is closed, or I/O fails.
    pub fn write_content(&mut self, destination: &str, body: &[u8]) -> bool {
        if !self.can_write(destination, body) {
            debug!(
                "Rejecting cache write of {} bytes (fill {:.3}, closed: {})",
                body.len(),
                self.fill_amount(),
                self.closed
            );
            return false;
        }

        match self.append(destination, body) {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache write failed: {}", e);
                // Roll the data file back so the two files stay in lockstep
                let _ = self.data_file.set_len(self.data_len);
                let _ = self.index_file.set_len(self.index_len);
                false
            }
        }
    }

    /// Append a destination-less payload (body-only record).
    pub fn write_raw(&mut self, body: &[u8]) -> bool {
        self.write_content("", body)
    }

    fn append(&mut self, destination: &str, body: &[u8]) -> std::io::Result<()> {
        // Body first, index record second: a crash in between leaves an
        // orphan body tail which open() truncates away.
        self.data_file.seek(SeekFrom::Start(self.data_len))?;
        self.data_file.write_all(body)?;
        self.data_file.flush()?;

        let mut record = Vec::with_capacity(INDEX_RECORD_HEADER as usize + destination.len());
        record.extend_from_slice(&self.data_len.to_le_bytes());
        record.extend_from_slice(&(body.len() as u64).to_le_bytes());
        record.extend_from_slice(&(destination.len() as u32).to_le_bytes());
        record.extend_from_slice(destination.as_bytes());

        self.index_file.seek(SeekFrom::Start(self.index_len))?;
        self.index_file.write_all(&record)?;
        self.index_file.flush()?;

        let entry = IndexEntry {
            index_offset: self.index_len,
            data_offset: self.data_len,
            body_len: body.len() as u64,
            destination: destination.to_string(),
        };
        self.index_len += entry.record_len();
        self.data_len += entry.body_len;
        self.entries.push(entry);

        Ok(())
    }

    /// Return the most-recently-written entry without removing it.
    /// None if empty or closed. Unreadable entries count as data loss:
    /// they are dropped and the next entry is tried.
    pub fn peek_content(&mut self) -> Option<CachedRequest> {
        if self.closed {
            return None;
        }
        while let Some(entry) = self.entries.last().cloned() {
            let mut body = vec![0u8; entry.body_len as usize];
            let read = self
                .data_file
                .seek(SeekFrom::Start(entry.data_offset))
                .and_then(|_| self.data_file.read_exact(&mut body));
            match read {
                Ok(()) => {
                    return Some(CachedRequest {
                        destination: entry.destination,
                        body: Bytes::from(body),
                    });
                }
                Err(e) => {
                    warn!("Dropping unreadable cache entry: {}", e);
                    self.pop_content();
                }
            }
        }
        None
    }

    /// Remove the most-recently-written entry. No-op if empty or closed.
    pub fn pop_content(&mut self) {
        if self.closed {
            return;
        }
        let Some(entry) = self.entries.pop() else {
            return;
        };

        self.index_len = entry.index_offset;
        self.data_len = entry.data_offset;
        if let Err(e) = self
            .index_file
            .set_len(self.index_len)
            .and_then(|()| self.data_file.set_len(self.data_len))
        {
            warn!("Failed to truncate cache files on pop: {}", e);
        }
    }

    /// Fraction in [0, 1) of capacity currently used.
    pub fn fill_amount(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        let fill = self.total_size() as f64 / self.capacity as f64;
        fill.min(0.999_999)
    }

    /// Flush and decommission the log. Subsequent writes return false,
    /// peeks report no content; `number_of_batches()` keeps answering
    /// with the count at close time.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        let _ = self.index_file.flush();
        let _ = self.data_file.flush();
        self.closed = true;
        debug!(
            "Closed cache at {} with {} entries remaining",
            self.path.display(),
            self.entries.len()
        );
    }
}
