//! Directory-name translation against a real backing directory tree
//! (spec §4.1, Testable Property 6: dedup).

use ccbox_fs::config::{CliOverrides, Config};
use ccbox_fs::context::Context;

fn context_with_dirmap(source: &std::path::Path) -> Context {
    let config = Config::load(CliOverrides {
        source: Some(source.to_string_lossy().into_owned()),
        pathmap: None,
        dirmap: Some("-d-GitHub-app:D--GitHub-app".to_string()),
    })
    .unwrap();
    Context::new(config)
}

#[test]
fn backing_path_resolves_through_dir_mapping() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("projects/D--GitHub-app")).unwrap();
    std::fs::write(tmp.path().join("projects/D--GitHub-app/session.jsonl"), b"{}").unwrap();

    let ctx = context_with_dirmap(tmp.path());
    let backing = ctx.backing_path(std::path::Path::new("/projects/-d-GitHub-app/session.jsonl"));
    assert!(backing.exists());
    assert_eq!(backing, tmp.path().join("projects/D--GitHub-app/session.jsonl"));
}

#[test]
fn sibling_native_and_container_named_dirs_dedup_on_enumeration() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("projects/D--GitHub-app")).unwrap();
    // A literal container-name directory also happens to exist on the
    // backing store (e.g. left over from before the mapping was configured).
    std::fs::create_dir_all(tmp.path().join("projects/-d-GitHub-app")).unwrap();

    let entries: Vec<_> = std::fs::read_dir(tmp.path().join("projects"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    let native_dirs: Vec<&str> = entries.iter().map(String::as_str).collect();

    let ctx = context_with_dirmap(tmp.path());
    let mut visible = Vec::new();
    for name in &entries {
        let (shown, suppress) = ccbox_fs::mapping::to_visible(name, &native_dirs, &ctx.dir_mappings);
        if !suppress {
            visible.push(shown.into_owned());
        }
    }
    visible.sort();
    visible.dedup();
    assert_eq!(visible, vec!["-d-GitHub-app".to_string()]);
}
