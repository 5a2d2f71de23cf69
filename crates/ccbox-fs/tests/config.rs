//! Startup configuration validation (spec §4.8, §7): fatal-at-startup
//! error cases, exercised through `Config::load` rather than unit-level
//! parser functions.

use ccbox_fs::config::{CliOverrides, Config};
use ccbox_fs::error::CcboxError;

#[test]
fn missing_source_is_fatal() {
    // SAFETY: serialized by `cargo test`'s per-binary process isolation;
    // no other test in this binary reads CCBOX_SOURCE concurrently.
    unsafe { std::env::remove_var("CCBOX_SOURCE") };
    let err = Config::load(CliOverrides::default()).unwrap_err();
    assert!(matches!(err, CcboxError::MissingSource));
}

#[test]
fn nonexistent_source_dir_is_fatal() {
    let err = Config::load(CliOverrides {
        source: Some("/definitely/not/a/real/path/ccbox".to_string()),
        pathmap: None,
        dirmap: None,
    })
    .unwrap_err();
    assert!(matches!(err, CcboxError::SourceUnreadable(_)));
}

#[test]
fn cli_source_override_wins_over_env() {
    let tmp = tempfile::tempdir().unwrap();
    // SAFETY: see missing_source_is_fatal.
    unsafe { std::env::set_var("CCBOX_SOURCE", "/this/path/does/not/exist") };
    let config = Config::load(CliOverrides {
        source: Some(tmp.path().to_string_lossy().into_owned()),
        pathmap: None,
        dirmap: None,
    })
    .unwrap();
    assert_eq!(config.source_dir, tmp.path());
    unsafe { std::env::remove_var("CCBOX_SOURCE") };
}

#[test]
fn case_insensitive_drive_collision_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let err = Config::load(CliOverrides {
        source: Some(tmp.path().to_string_lossy().into_owned()),
        pathmap: Some("C:/work:/ccbox/work;c:/Work:/ccbox/work2".to_string()),
        dirmap: None,
    })
    .unwrap_err();
    assert!(matches!(err, CcboxError::CaseInsensitiveCollision { .. }));
}

#[test]
fn malformed_path_mapping_entry_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let err = Config::load(CliOverrides {
        source: Some(tmp.path().to_string_lossy().into_owned()),
        pathmap: Some("not-a-valid-entry".to_string()),
        dirmap: None,
    })
    .unwrap_err();
    assert!(matches!(err, CcboxError::MalformedPathMapping(_)));
}
