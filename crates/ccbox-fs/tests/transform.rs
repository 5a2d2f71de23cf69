//! Content transform engine exercised against real file contents (spec §4.2,
//! §8 concrete scenarios).

use ccbox_fs::mapping::PathMapping;
use ccbox_fs::transform::{quick_scan_needed, to_container, to_host};

#[test]
fn drive_form_round_trip_through_a_real_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("session.json");
    let original = br#"{"cwd":"C:\\Users\\me\\.claude\\projects","other":1}"#;
    std::fs::write(&path, original).unwrap();

    let maps = vec![PathMapping::new("C:/Users/me/.claude", "/ccbox/.claude").unwrap()];
    let on_disk = std::fs::read(&path).unwrap();
    let container_form = to_container(&on_disk, &maps, &[]).unwrap();
    assert_eq!(
        container_form,
        br#"{"cwd":"/ccbox/.claude/projects","other":1}"#.to_vec()
    );

    let back = to_host(&container_form, &maps, &[]).unwrap();
    assert_eq!(back, original.to_vec());
}

#[test]
fn quick_scan_records_skip_for_file_with_no_signature() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("big.jsonl");
    let mut content = Vec::new();
    for i in 0..2000 {
        content.extend_from_slice(format!("{{\"line\":{i},\"msg\":\"hello world\"}}\n").as_bytes());
    }
    std::fs::write(&path, &content).unwrap();

    let maps = vec![PathMapping::new("C:/Users/me/.claude", "/ccbox/.claude").unwrap()];
    let on_disk = std::fs::read(&path).unwrap();
    assert!(!quick_scan_needed(&on_disk, &maps, &[]));
    assert!(to_container(&on_disk, &maps, &[]).is_none());
}

#[test]
fn mixed_drive_and_dirmap_content() {
    let maps = vec![PathMapping::new("C:/Users/me/.claude", "/ccbox/.claude").unwrap()];
    let dirmaps = vec![ccbox_fs::mapping::DirMapping::new("-d-GitHub-app", "D--GitHub-app").unwrap()];
    let input = br#"{"cwd":"C:\\Users\\me\\.claude\\projects\\D--GitHub-app"}"#;
    let out = to_container(input, &maps, &dirmaps).unwrap();
    assert_eq!(
        out,
        br#"{"cwd":"/ccbox/.claude/projects/-d-GitHub-app"}"#.to_vec()
    );
}
