//! Path mapping data model and the directory-name translator (spec §4.1).
//!
//! `PathMapping` and `DirMapping` are created once at startup from
//! configuration and never mutated afterward — see `config.rs` for parsing.

use crate::error::CcboxError;

pub const MAX_PATH_MAPPINGS: usize = 32;
pub const MAX_DIR_MAPPINGS: usize = 32;

/// What shape of host path a `PathMapping::from` prefix describes.
///
/// Drives which recognition rule in the content transform engine (pass A)
/// applies to this mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    /// `C:/Users/me/.claude` — two-char drive prefix, `drive` tag set.
    Drive,
    /// `//server/share` — JSON-escaped-backslash UNC prefix.
    Unc,
    /// `/mnt/d/work` — WSL-style mount prefix, `drive` tag set.
    MountPrefix,
}

/// A host↔container prefix pair. Immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct PathMapping {
    /// Host form, normalized: backslashes → forward slashes, trailing
    /// slashes stripped, case preserved.
    pub from: String,
    /// Container form.
    pub to: String,
    pub from_len: usize,
    pub to_len: usize,
    /// Lowercase single-letter drive tag, or `None` for UNC mappings.
    pub drive: Option<char>,
    pub kind: MappingKind,
}

impl PathMapping {
    /// Build a mapping from already-split `from`/`to` strings (see
    /// `config::parse_pathmap` for the semicolon/colon splitting).
    pub fn new(from: &str, to: &str) -> Result<Self, CcboxError> {
        let from = normalize_host_path(from);
        let to = normalize_host_path(to);
        if from.is_empty() || to.is_empty() {
            return Err(CcboxError::MalformedPathMapping(format!("{from}:{to}")));
        }

        let (kind, drive) = classify(&from);

        Ok(PathMapping {
            from_len: from.len(),
            to_len: to.len(),
            from,
            to,
            drive,
            kind,
        })
    }
}

/// Backslashes become forward slashes, trailing separators are stripped,
/// case is preserved (the drive letter's case is normalized separately by
/// callers that need it, since comparisons against it are explicitly
/// case-insensitive only on that one character).
fn normalize_host_path(raw: &str) -> String {
    let mut s: String = raw.chars().map(|c| if c == '\\' { '/' } else { c }).collect();
    while s.len() > 1 && s.ends_with('/') {
        s.pop();
    }
    s
}

fn classify(from: &str) -> (MappingKind, Option<char>) {
    let bytes = from.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return (MappingKind::Drive, Some((bytes[0] as char).to_ascii_lowercase()));
    }
    if from.starts_with("//") {
        return (MappingKind::Unc, None);
    }
    if let Some(rest) = from.strip_prefix("/mnt/") {
        if let Some(c) = rest.chars().next() {
            if c.is_ascii_alphabetic() {
                return (MappingKind::MountPrefix, Some(c.to_ascii_lowercase()));
            }
        }
    }
    (MappingKind::Unc, None)
}

/// A pair of bare directory-segment strings with no slashes:
/// `-d-GitHub-app` (container encoding) ↔ `D--GitHub-app` (native encoding).
#[derive(Debug, Clone)]
pub struct DirMapping {
    pub container_name: String,
    pub native_name: String,
}

impl DirMapping {
    pub fn new(container_name: &str, native_name: &str) -> Result<Self, CcboxError> {
        if container_name.is_empty() || native_name.is_empty() {
            return Err(CcboxError::MalformedDirMapping(format!(
                "{container_name}:{native_name}"
            )));
        }
        for s in [container_name, native_name] {
            if s.contains('/') || s.contains('\\') {
                return Err(CcboxError::DirNameContainsSeparator(s.to_string()));
            }
        }
        Ok(DirMapping {
            container_name: container_name.to_string(),
            native_name: native_name.to_string(),
        })
    }
}

/// Bytes that may legally terminate a matched segment or token, per spec
/// §4.1's boundary rule and §4.2's emission boundaries. `\` is included for
/// JSON-escaped separators (the second byte of a `\\` pair).
fn is_boundary_byte(b: u8) -> bool {
    matches!(b, b'/' | 0 | b'"' | b',' | b'}' | b']' | b'\\')
}

/// `to-backing`: rewrite every `container_name` segment in an absolute path
/// to its `native_name` counterpart. Non-matching segments pass through.
///
/// Used to compute the backing path before delegating to the underlying
/// filesystem. Operates on `&str` paths (not raw JSON bytes); the boundary
/// check after a match still follows the same rule as the content
/// transform engine's segment rewrite, since request paths can themselves
/// contain segments that look like JSON tokens is not a real concern here —
/// this keeps the two translators' matching behavior consistent.
pub fn to_backing(path: &str, dir_mappings: &[DirMapping]) -> String {
    if dir_mappings.is_empty() || !path.starts_with('/') {
        return path.to_string();
    }
    let bytes = path.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(path.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'/' {
            out.push(b'/');
            i += 1;
            if let Some(m) = dir_mappings.iter().find(|m| {
                let clen = m.container_name.len();
                bytes[i..].starts_with(m.container_name.as_bytes())
                    && bytes
                        .get(i + clen)
                        .map(|&b| is_boundary_byte(b))
                        .unwrap_or(true)
            }) {
                out.extend_from_slice(m.native_name.as_bytes());
                i += m.container_name.len();
                continue;
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    // Segments are ASCII-delimited by '/' and dir mapping names are ASCII
    // bare strings, so splitting/replacing only ever happens on byte
    // boundaries that UTF-8 multi-byte sequences never occupy.
    String::from_utf8(out).expect("path translation preserves utf8 boundaries")
}

/// `to-visible`: present a backing directory entry under its container
/// encoding, and report whether it should be suppressed (deduplication).
///
/// Returns `(visible_name, suppress)`. `suppress` is true when `entry_name`
/// equals a known `container_name` *and* a sibling entry equal to its
/// `native_name` also exists and is a directory — the translated native
/// entry already represents it, so the literal container-name entry (if the
/// backing store happens to also contain one) would otherwise double up.
pub fn to_visible<'a>(
    entry_name: &'a str,
    sibling_native_dirs: &[&str],
    dir_mappings: &'a [DirMapping],
) -> (std::borrow::Cow<'a, str>, bool) {
    if let Some(m) = dir_mappings.iter().find(|m| m.native_name == entry_name) {
        return (std::borrow::Cow::Borrowed(&m.container_name), false);
    }
    if let Some(m) = dir_mappings.iter().find(|m| m.container_name == entry_name) {
        if sibling_native_dirs.contains(&m.native_name.as_str()) {
            return (std::borrow::Cow::Borrowed(entry_name), true);
        }
    }
    (std::borrow::Cow::Borrowed(entry_name), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dm(c: &str, n: &str) -> DirMapping {
        DirMapping::new(c, n).unwrap()
    }

    #[test]
    fn drive_mapping_classified_and_normalized() {
        let m = PathMapping::new("C:\\Users\\me\\.claude\\", "/ccbox/.claude").unwrap();
        assert_eq!(m.from, "C:/Users/me/.claude");
        assert_eq!(m.kind, MappingKind::Drive);
        assert_eq!(m.drive, Some('c'));
    }

    #[test]
    fn unc_mapping_classified() {
        let m = PathMapping::new("//server/share", "/ccbox/share").unwrap();
        assert_eq!(m.kind, MappingKind::Unc);
        assert_eq!(m.drive, None);
    }

    #[test]
    fn mount_prefix_mapping_classified() {
        let m = PathMapping::new("/mnt/d/work", "/ccbox/work").unwrap();
        assert_eq!(m.kind, MappingKind::MountPrefix);
        assert_eq!(m.drive, Some('d'));
    }

    #[test]
    fn to_backing_translates_matching_segment() {
        let maps = vec![dm("-d-GitHub-app", "D--GitHub-app")];
        let backing = to_backing("/projects/-d-GitHub-app/session.jsonl", &maps);
        assert_eq!(backing, "/projects/D--GitHub-app/session.jsonl");
    }

    #[test]
    fn to_backing_requires_boundary_after_match() {
        let maps = vec![dm("-d-GitHub-app", "D--GitHub-app")];
        // "-d-GitHub-appendix" must not match "-d-GitHub-app" as a prefix.
        let backing = to_backing("/projects/-d-GitHub-appendix/x", &maps);
        assert_eq!(backing, "/projects/-d-GitHub-appendix/x");
    }

    #[test]
    fn to_visible_translates_native_entry() {
        let maps = vec![dm("-d-GitHub-app", "D--GitHub-app")];
        let (name, suppress) = to_visible("D--GitHub-app", &[], &maps);
        assert_eq!(name, "-d-GitHub-app");
        assert!(!suppress);
    }

    #[test]
    fn to_visible_dedups_literal_container_name_with_native_sibling() {
        let maps = vec![dm("-d-GitHub-app", "D--GitHub-app")];
        let (name, suppress) = to_visible("-d-GitHub-app", &["D--GitHub-app"], &maps);
        assert_eq!(name, "-d-GitHub-app");
        assert!(suppress);
    }

    #[test]
    fn to_visible_keeps_literal_container_name_without_native_sibling() {
        let maps = vec![dm("-d-GitHub-app", "D--GitHub-app")];
        let (name, suppress) = to_visible("-d-GitHub-app", &[], &maps);
        assert_eq!(name, "-d-GitHub-app");
        assert!(!suppress);
    }
}
