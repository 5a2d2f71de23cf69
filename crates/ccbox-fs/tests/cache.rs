//! Cache coherence against real file mtimes (spec §8, Testable Property 4).

use std::os::unix::fs::MetadataExt;
use std::sync::Arc;

use ccbox_fs::cache::Caches;

fn mtime_of(path: &std::path::Path) -> (i64, i64) {
    let meta = std::fs::metadata(path).unwrap();
    (meta.mtime(), meta.mtime_nsec())
}

#[test]
fn write_at_new_mtime_invalidates_stale_read_cache_entry() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("session.json");
    std::fs::write(&path, br#"{"a":1}"#).unwrap();

    let caches = Caches::new();
    let key = path.to_string_lossy().into_owned();
    let t1 = mtime_of(&path);
    caches.read.insert(&key, t1, Arc::from(br#"{"a":1}"#.as_slice()));
    assert!(caches.read.get(&key, t1).is_some());

    // Simulate the write path: invalidate before the write lands, then the
    // backing mtime advances.
    caches.invalidate_path(&key);
    std::thread::sleep(std::time::Duration::from_millis(10));
    std::fs::write(&path, br#"{"a":2}"#).unwrap();
    let t2 = mtime_of(&path);

    assert!(caches.read.get(&key, t1).is_none());
    assert!(caches.read.get(&key, t2).is_none(), "fresh mtime must be a miss until re-populated");
}

#[test]
fn neg_cache_suppresses_repeat_stat_within_ttl() {
    let caches = Caches::new();
    let missing = "/backing/does-not-exist.json";
    assert!(!caches.neg.hit(missing));
    caches.neg.insert(missing);
    assert!(caches.neg.hit(missing));
}
