//! The three fixed-size caches (spec §4.5): NegCache, ReadCache, SkipCache.
//!
//! All three are flat `Vec`s scanned linearly rather than hash maps — at
//! 64/256/512 slots a linear scan beats a map under realistic hit rates and
//! keeps the critical section (one `Mutex` per cache, not per-slot) small
//! enough that it is never the bottleneck on the hot read path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const NEG_CACHE_SLOTS: usize = 64;
pub const READ_CACHE_SLOTS: usize = 256;
pub const SKIP_CACHE_SLOTS: usize = 512;
pub const READ_CACHE_MAX_ENTRY: usize = 4 * 1024 * 1024;

const NEG_CACHE_TTL: Duration = Duration::from_secs(2);

/// `(mtime_sec, mtime_nsec)`, the key every cache entry is stamped with so
/// that a hit implies "produced from the file at exactly this mtime".
pub type Mtime = (i64, i64);

struct NegSlot {
    path: String,
    expires_at: Instant,
}

/// Records recent ENOENT results so a repeat lookup within the TTL window
/// skips the backing stat entirely (spec §4.5, Testable Property 5).
pub struct NegCache {
    slots: Mutex<Vec<Option<NegSlot>>>,
    next: AtomicU64,
}

impl NegCache {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(NEG_CACHE_SLOTS);
        slots.resize_with(NEG_CACHE_SLOTS, || None);
        NegCache { slots: Mutex::new(slots), next: AtomicU64::new(0) }
    }

    pub fn hit(&self, path: &str) -> bool {
        let now = Instant::now();
        let slots = self.slots.lock().unwrap();
        slots
            .iter()
            .flatten()
            .any(|s| s.path == path && s.expires_at > now)
    }

    pub fn insert(&self, path: &str) {
        let idx = (self.next.fetch_add(1, Ordering::Relaxed) as usize) % NEG_CACHE_SLOTS;
        let mut slots = self.slots.lock().unwrap();
        slots[idx] = Some(NegSlot { path: path.to_string(), expires_at: Instant::now() + NEG_CACHE_TTL });
    }

    /// Drop any entry for `path` — called before create/mkdir/symlink/rename
    /// so a stale "does not exist" can't shadow a just-created object.
    pub fn invalidate(&self, path: &str) {
        let mut slots = self.slots.lock().unwrap();
        for s in slots.iter_mut() {
            if s.as_ref().is_some_and(|s| s.path == path) {
                *s = None;
            }
        }
    }
}

impl Default for NegCache {
    fn default() -> Self {
        Self::new()
    }
}

struct ReadSlot {
    path: String,
    mtime: Mtime,
    bytes: std::sync::Arc<[u8]>,
    sequence: u64,
}

/// Caches the fully transformed (`to-container`) bytes of a transform-eligible
/// file, keyed by `(path, mtime)`. Evicted by least-recently-used sequence
/// number, not by insertion order, so a hot file doesn't get pushed out by a
/// burst of one-shot reads of cold files.
pub struct ReadCache {
    slots: Mutex<Vec<Option<ReadSlot>>>,
    sequence: AtomicU64,
}

impl ReadCache {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(READ_CACHE_SLOTS);
        slots.resize_with(READ_CACHE_SLOTS, || None);
        ReadCache { slots: Mutex::new(slots), sequence: AtomicU64::new(0) }
    }

    pub fn get(&self, path: &str, mtime: Mtime) -> Option<std::sync::Arc<[u8]>> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut slots = self.slots.lock().unwrap();
        let slot = slots
            .iter_mut()
            .flatten()
            .find(|s| s.path == path && s.mtime == mtime)?;
        slot.sequence = seq;
        Some(slot.bytes.clone())
    }

    /// `None` return means the caller should *not* cache — the entry is over
    /// `READ_CACHE_MAX_ENTRY`. This is a silent bypass, not an error: the
    /// transformed bytes are still served for this one call.
    pub fn insert(&self, path: &str, mtime: Mtime, bytes: std::sync::Arc<[u8]>) {
        if bytes.len() > READ_CACHE_MAX_ENTRY {
            return;
        }
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut slots = self.slots.lock().unwrap();
        let victim = match slots.iter().position(|s| s.is_none()) {
            Some(i) => i,
            None => slots
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.as_ref().map(|s| s.sequence).unwrap_or(0))
                .map(|(i, _)| i)
                .expect("slots is non-empty"),
        };
        slots[victim] = Some(ReadSlot { path: path.to_string(), mtime, bytes, sequence: seq });
    }

    pub fn invalidate(&self, path: &str) {
        let mut slots = self.slots.lock().unwrap();
        for s in slots.iter_mut() {
            if s.as_ref().is_some_and(|s| s.path == path) {
                *s = None;
            }
        }
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new()
    }
}

struct SkipSlot {
    path: String,
    mtime: Mtime,
}

/// Records "this file, at this mtime, contains no translatable pattern" so
/// the quick-scan / full-read path is skipped entirely on repeat access.
pub struct SkipCache {
    slots: Mutex<Vec<Option<SkipSlot>>>,
    next: AtomicU64,
}

impl SkipCache {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(SKIP_CACHE_SLOTS);
        slots.resize_with(SKIP_CACHE_SLOTS, || None);
        SkipCache { slots: Mutex::new(slots), next: AtomicU64::new(0) }
    }

    pub fn hit(&self, path: &str, mtime: Mtime) -> bool {
        let slots = self.slots.lock().unwrap();
        slots.iter().flatten().any(|s| s.path == path && s.mtime == mtime)
    }

    pub fn insert(&self, path: &str, mtime: Mtime) {
        let idx = (self.next.fetch_add(1, Ordering::Relaxed) as usize) % SKIP_CACHE_SLOTS;
        let mut slots = self.slots.lock().unwrap();
        slots[idx] = Some(SkipSlot { path: path.to_string(), mtime });
    }

    pub fn invalidate(&self, path: &str) {
        let mut slots = self.slots.lock().unwrap();
        for s in slots.iter_mut() {
            if s.as_ref().is_some_and(|s| s.path == path) {
                *s = None;
            }
        }
    }
}

impl Default for SkipCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Invalidates all three caches for `path` — the common operation on
/// `write`, `truncate`, `unlink`, and `rename` (spec §3 invariants).
pub struct Caches {
    pub neg: NegCache,
    pub read: ReadCache,
    pub skip: SkipCache,
}

impl Caches {
    pub fn new() -> Self {
        Caches { neg: NegCache::new(), read: ReadCache::new(), skip: SkipCache::new() }
    }

    pub fn invalidate_path(&self, path: &str) {
        self.neg.invalidate(path);
        self.read.invalidate(path);
        self.skip.invalidate(path);
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neg_cache_hit_then_invalidate() {
        let c = NegCache::new();
        assert!(!c.hit("/a"));
        c.insert("/a");
        assert!(c.hit("/a"));
        c.invalidate("/a");
        assert!(!c.hit("/a"));
    }

    #[test]
    fn neg_cache_ttl_expires() {
        let c = NegCache::new();
        let idx = (c.next.fetch_add(1, Ordering::Relaxed) as usize) % NEG_CACHE_SLOTS;
        let mut slots = c.slots.lock().unwrap();
        slots[idx] = Some(NegSlot {
            path: "/a".into(),
            expires_at: Instant::now() - Duration::from_secs(1),
        });
        drop(slots);
        assert!(!c.hit("/a"));
    }

    #[test]
    fn read_cache_round_trip() {
        let c = ReadCache::new();
        let bytes: std::sync::Arc<[u8]> = std::sync::Arc::from(b"hello".as_slice());
        c.insert("/a", (1, 0), bytes.clone());
        assert_eq!(c.get("/a", (1, 0)).unwrap().as_ref(), b"hello");
        // Different mtime is a miss even for the same path.
        assert!(c.get("/a", (2, 0)).is_none());
    }

    #[test]
    fn read_cache_rejects_oversized_entry() {
        let c = ReadCache::new();
        let bytes: std::sync::Arc<[u8]> = std::sync::Arc::from(vec![0u8; READ_CACHE_MAX_ENTRY + 1]);
        c.insert("/big", (1, 0), bytes);
        assert!(c.get("/big", (1, 0)).is_none());
    }

    #[test]
    fn read_cache_evicts_least_recently_used() {
        let c = ReadCache::new();
        for i in 0..READ_CACHE_SLOTS {
            let bytes: std::sync::Arc<[u8]> = std::sync::Arc::from(b"x".as_slice());
            c.insert(&format!("/f{i}"), (1, 0), bytes);
        }
        // Touch every slot but the first, then insert one more: /f0 is now
        // the coldest, so it alone should be evicted.
        for i in 1..READ_CACHE_SLOTS {
            c.get(&format!("/f{i}"), (1, 0));
        }
        let bytes: std::sync::Arc<[u8]> = std::sync::Arc::from(b"new".as_slice());
        c.insert("/new", (1, 0), bytes);
        assert!(c.get("/f0", (1, 0)).is_none());
        assert!(c.get("/f1", (1, 0)).is_some());
    }

    #[test]
    fn skip_cache_hit_keyed_by_mtime() {
        let c = SkipCache::new();
        c.insert("/a", (1, 0));
        assert!(c.hit("/a", (1, 0)));
        assert!(!c.hit("/a", (2, 0)));
    }

    #[test]
    fn caches_invalidate_path_clears_all_three() {
        let caches = Caches::new();
        caches.neg.insert("/a");
        caches.read.insert("/a", (1, 0), std::sync::Arc::from(b"x".as_slice()));
        caches.skip.insert("/a", (1, 0));
        caches.invalidate_path("/a");
        assert!(!caches.neg.hit("/a"));
        assert!(caches.read.get("/a", (1, 0)).is_none());
        assert!(!caches.skip.hit("/a", (1, 0)));
    }
}
