//! Long-lived process context (spec §9): the mapping tables, extension set
//! and caches constructed once at startup from `Config` and shared by
//! reference across every dispatched request.

use std::path::{Path, PathBuf};

use crate::cache::Caches;
use crate::config::{Config, ExtensionSet};
use crate::mapping::{self, DirMapping, PathMapping};

pub struct Context {
    pub source_dir: PathBuf,
    pub path_mappings: Vec<PathMapping>,
    pub dir_mappings: Vec<DirMapping>,
    pub extensions: ExtensionSet,
    pub caches: Caches,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Context {
            source_dir: config.source_dir,
            path_mappings: config.path_mappings,
            dir_mappings: config.dir_mappings,
            extensions: config.extensions,
            caches: Caches::new(),
        }
    }

    /// Computes the backing filesystem path for a request path: directory-
    /// name translation followed by joining under `source_dir`.
    pub fn backing_path(&self, request_path: &Path) -> PathBuf {
        let request_str = request_path.to_string_lossy();
        let translated = mapping::to_backing(&request_str, &self.dir_mappings);
        let relative = translated.strip_prefix('/').unwrap_or(&translated);
        self.source_dir.join(relative)
    }

    /// Whether a regular file at `path` is eligible for content transform.
    pub fn is_transformable(&self, path: &Path) -> bool {
        self.extensions.matches(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliOverrides;

    #[test]
    fn backing_path_joins_under_source_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(CliOverrides {
            source: Some(tmp.path().to_string_lossy().into_owned()),
            pathmap: None,
            dirmap: Some("-d-GitHub-app:D--GitHub-app".to_string()),
        })
        .unwrap();
        let ctx = Context::new(config);
        let backing = ctx.backing_path(Path::new("/projects/-d-GitHub-app/session.jsonl"));
        assert_eq!(backing, tmp.path().join("projects/D--GitHub-app/session.jsonl"));
    }
}
