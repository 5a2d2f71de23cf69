use std::path::PathBuf;

use ccbox_fs::config::{CliOverrides, Config};
use ccbox_fs::context::Context;
use ccbox_fs::fs::CcboxFs;
use fuse3::path::Session;
use fuse3::MountOptions;

/// Parses the CLI surface (spec §6): a positional mountpoint, and
/// `-o source=<path>,pathmap=<…>,dirmap=<…>` mount options. Any other `-o`
/// sub-option is accepted but not applied — this CLI exposes the fixed
/// set of mount flags `main` itself advertises, not a general passthrough
/// to the underlying FUSE framework (documented Non-goal, SPEC_FULL §6).
struct Cli {
    mountpoint: PathBuf,
    overrides: CliOverrides,
}

fn parse_args() -> anyhow::Result<Cli> {
    let mut mountpoint = None;
    let mut overrides = CliOverrides::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        if arg == "-o" {
            let opts = args.next().unwrap_or_default();
            for opt in opts.split(',') {
                let Some((key, value)) = opt.split_once('=') else { continue };
                match key {
                    "source" => overrides.source = Some(value.to_string()),
                    "pathmap" => overrides.pathmap = Some(value.to_string()),
                    "dirmap" => overrides.dirmap = Some(value.to_string()),
                    _ => {} // not part of this CLI's fixed mount-flag surface; ignored
                }
            }
        } else if !arg.starts_with('-') && mountpoint.is_none() {
            mountpoint = Some(PathBuf::from(arg));
        }
    }

    let mountpoint = mountpoint.ok_or_else(|| anyhow::anyhow!("usage: ccbox-fs <mountpoint> -o source=<path>[,pathmap=...][,dirmap=...]"))?;
    Ok(Cli { mountpoint, overrides })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_args()?;
    let config = Config::load(cli.overrides)?;
    let trace_level = config.trace_level;
    let _log_guard = ccbox_fs::logging::init(trace_level);

    tracing::info!(source = %config.source_dir.display(), "ccbox-fs starting");

    let is_root = unsafe { libc::geteuid() } == 0;
    let mut opts = MountOptions::default();
    opts.fs_name("ccbox");
    opts.read_only(false);
    opts.force_readdir_plus(true);
    opts.default_permissions(true);
    if is_root {
        opts.allow_other(true);
    }

    let ctx = std::sync::Arc::new(Context::new(config));
    let filesystem = CcboxFs::new(ctx);

    let handle = Session::new(opts).mount_with_unprivileged(filesystem, &cli.mountpoint).await?;

    handle.await?;
    tracing::info!("ccbox-fs unmounted");
    Ok(())
}
