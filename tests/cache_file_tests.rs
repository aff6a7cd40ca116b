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

use spatial_telemetry::DualFileCache;
use tempfile::TempDir;

#[test]
fn peek_pop_sequence_matches_reverse_write_order() {
    let dir = TempDir::new().unwrap();
    let mut cache = DualFileCache::open(dir.path()).unwrap();

    let payloads: Vec<(String, Vec<u8>)> = (0..20)
        .map(|i| (format!("https://x/{i}"), format!("payload-{i}").into_bytes()))
        .collect();
    for (url, body) in &payloads {
        assert!(cache.write_content(url, body));
    }

    for (url, body) in payloads.iter().rev() {
        let entry = cache.peek_content().unwrap();
        assert_eq!(&entry.destination, url);
        assert_eq!(&entry.body[..], &body[..]);
        cache.pop_content();
    }
    assert!(!cache.has_content());
    assert_eq!(cache.number_of_batches(), 0);
}

#[test]
fn three_entry_scenario() {
    let dir = TempDir::new().unwrap();
    let mut cache = DualFileCache::open(dir.path()).unwrap();

    cache.write_content("https://x/a", b"1");
    cache.write_content("https://x/b", b"2");
    cache.write_content("https://x/c", b"3");

    let top = cache.peek_content().unwrap();
    assert_eq!(top.destination, "https://x/c");
    assert_eq!(&top.body[..], b"3");

    cache.pop_content();
    let next = cache.peek_content().unwrap();
    assert_eq!(next.destination, "https://x/b");
    assert_eq!(&next.body[..], b"2");

    cache.pop_content();
    assert_eq!(cache.number_of_batches(), 1);
}

#[test]
fn round_trip_payload_sizes_up_to_one_megabyte() {
    let dir = TempDir::new().unwrap();
    let mut cache = DualFileCache::open(dir.path()).unwrap();

    for size in [0usize, 1, 255, 4096, 65536, 1024 * 1024] {
        let body: Vec<u8> = (0..size).map(|i| (i % 253) as u8).collect();
        let url = format!("https://x/size/{size}");
        assert!(cache.write_content(&url, &body), "write failed at {size}");

        let entry = cache.peek_content().unwrap();
        assert_eq!(entry.destination, url);
        assert_eq!(&entry.body[..], &body[..], "body mismatch at {size}");
        cache.pop_content();
    }
}

#[test]
fn oversized_payload_is_rejected_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let capacity = 1024;
    let mut cache = DualFileCache::open_with_capacity(dir.path(), capacity).unwrap();

    let too_big = vec![0u8; capacity as usize + 1];
    assert!(!cache.can_write("https://x/a", &too_big));
    assert!(!cache.write_content("https://x/a", &too_big));
    assert_eq!(cache.number_of_batches(), 0);
    assert_eq!(cache.fill_amount(), 0.0);

    // A payload that fits still goes through afterwards
    assert!(cache.write_content("https://x/a", b"small"));
    assert_eq!(cache.number_of_batches(), 1);
}

#[test]
fn close_is_idempotent_and_freezes_the_count() {
    let dir = TempDir::new().unwrap();
    let mut cache = DualFileCache::open(dir.path()).unwrap();

    cache.write_content("https://x/a", b"1");
    cache.write_content("https://x/b", b"2");
    cache.close();

    assert!(!cache.write_content("https://x/c", b"3"));
    assert!(!cache.write_raw(b"4"));
    assert!(cache.peek_content().is_none());
    assert_eq!(cache.number_of_batches(), 2);

    cache.close();
    assert!(!cache.write_content("https://x/d", b"5"));
    assert_eq!(cache.number_of_batches(), 2);
}

#[test]
fn closed_entries_are_still_there_after_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut cache = DualFileCache::open(dir.path()).unwrap();
        cache.write_content("https://x/a", b"survives");
        cache.close();
    }

    let mut cache = DualFileCache::open(dir.path()).unwrap();
    assert_eq!(cache.number_of_batches(), 1);
    let entry = cache.peek_content().unwrap();
    assert_eq!(&entry.body[..], b"survives");
}

#[test]
fn pop_then_write_reuses_the_tail() {
    let dir = TempDir::new().unwrap();
    let mut cache = DualFileCache::open(dir.path()).unwrap();

    cache.write_content("https://x/a", b"first");
    cache.write_content("https://x/b", b"second");
    cache.pop_content();
    cache.write_content("https://x/c", b"third");

    let top = cache.peek_content().unwrap();
    assert_eq!(top.destination, "https://x/c");
    assert_eq!(&top.body[..], b"third");
    cache.pop_content();
    let under = cache.peek_content().unwrap();
    assert_eq!(&under.body[..], b"first");
}
