//! Logging setup for the FS process (spec §4.6).
//!
//! Verbosity is driven by the configured trace level (0 off, 1
//! transform-only, 2 verbose), not `RUST_LOG` — this knob is part of
//! ccbox's own external contract. The interposition shim carries no
//! logging at all; see `ccbox-interpose` and DESIGN.md for why.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Resolves the well-known log path: `$XDG_STATE_HOME/ccbox/ccbox.log`,
/// falling back to `/tmp/ccbox.log` when `XDG_STATE_HOME` is unset.
fn log_path() -> PathBuf {
    match std::env::var_os("XDG_STATE_HOME") {
        Some(dir) => PathBuf::from(dir).join("ccbox").join("ccbox.log"),
        None => PathBuf::from("/tmp/ccbox.log"),
    }
}

/// Installs a global subscriber for the given trace level. Returns a guard
/// that must be kept alive for the process lifetime to flush the
/// non-blocking file writer; `None` at level 0, where nothing is installed.
pub fn init(trace_level: u8) -> Option<WorkerGuard> {
    if trace_level == 0 {
        return None;
    }

    let path = log_path();
    if let Some(parent) = path.parent() {
        // Best-effort: if the directory can't be created, fall through and
        // let the appender itself fail loudly rather than crash startup
        // over a logging path.
        let _ = std::fs::create_dir_all(parent);
    }

    let dir = path.parent().unwrap_or_else(|| std::path::Path::new("/tmp")).to_path_buf();
    let file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "ccbox.log".into());
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = match trace_level {
        1 => EnvFilter::new("ccbox_fs=info"),
        _ => EnvFilter::new("ccbox_fs=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_tmp_without_xdg_state_home() {
        // SAFETY: single-threaded test, no other thread reads env concurrently.
        unsafe { std::env::remove_var("XDG_STATE_HOME") };
        assert_eq!(log_path(), PathBuf::from("/tmp/ccbox.log"));
    }

    #[test]
    fn uses_xdg_state_home_when_set() {
        // SAFETY: single-threaded test, no other thread reads env concurrently.
        unsafe { std::env::set_var("XDG_STATE_HOME", "/home/x/.local/state") };
        assert_eq!(log_path(), PathBuf::from("/home/x/.local/state/ccbox/ccbox.log"));
        unsafe { std::env::remove_var("XDG_STATE_HOME") };
    }
}
