//! Configuration loader (spec §4.8 / §6): reads the environment once at
//! startup, lets CLI mount options override it, validates eagerly, and
//! fails fast — a malformed mapping or a case-insensitive prefix collision
//! is a fatal startup error, never a degraded runtime state.

use std::path::{Path, PathBuf};

use crate::error::CcboxError;
use crate::mapping::{DirMapping, PathMapping, MAX_DIR_MAPPINGS, MAX_PATH_MAPPINGS};

const DEFAULT_EXTENSIONS: &[&str] = &[".json", ".jsonl"];

/// File-extension allowlist deciding whether a regular file's contents are
/// subject to the content transform engine. Comparison is case-insensitive.
#[derive(Debug, Clone)]
pub struct ExtensionSet {
    dotted_lower: Vec<String>,
}

impl ExtensionSet {
    fn from_defaults() -> Self {
        ExtensionSet { dotted_lower: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect() }
    }

    fn parse(raw: &str) -> Self {
        let dotted_lower = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let lower = s.to_ascii_lowercase();
                if lower.starts_with('.') { lower } else { format!(".{lower}") }
            })
            .collect();
        ExtensionSet { dotted_lower }
    }

    /// Whether `path`'s extension matches the configured set.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else { return false };
        let dotted = format!(".{}", ext.to_ascii_lowercase());
        self.dotted_lower.iter().any(|e| *e == dotted)
    }
}

/// CLI mount options recognized per spec §6: `source=`, `pathmap=`,
/// `dirmap=`. Each overrides its corresponding environment variable.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub source: Option<String>,
    pub pathmap: Option<String>,
    pub dirmap: Option<String>,
}

/// Validated, immutable configuration for the FS process. Built once at
/// startup by `Config::load` and shared read-only thereafter (spec §9:
/// "a single long-lived context constructed at startup").
#[derive(Debug)]
pub struct Config {
    pub source_dir: PathBuf,
    pub path_mappings: Vec<PathMapping>,
    pub dir_mappings: Vec<DirMapping>,
    pub extensions: ExtensionSet,
    pub trace_level: u8,
}

impl Config {
    pub fn load(cli: CliOverrides) -> Result<Self, CcboxError> {
        let source_raw = cli
            .source
            .or_else(|| std::env::var("CCBOX_SOURCE").ok())
            .ok_or(CcboxError::MissingSource)?;
        let source_dir = PathBuf::from(source_raw);
        if !source_dir.is_dir() {
            return Err(CcboxError::SourceUnreadable(source_dir));
        }

        let pathmap_raw = cli.pathmap.or_else(|| std::env::var("CCBOX_PATH_MAP").ok()).unwrap_or_default();
        let path_mappings = parse_pathmap(&pathmap_raw)?;
        check_case_insensitive_collisions(&path_mappings)?;

        let dirmap_raw = cli.dirmap.or_else(|| std::env::var("CCBOX_DIR_MAP").ok()).unwrap_or_default();
        let dir_mappings = parse_dirmap(&dirmap_raw)?;

        let extensions = match std::env::var("CCBOX_EXTENSIONS") {
            Ok(raw) if !raw.trim().is_empty() => ExtensionSet::parse(&raw),
            _ => ExtensionSet::from_defaults(),
        };

        let trace_level = std::env::var("CCBOX_TRACE_LEVEL")
            .ok()
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(0)
            .min(2);

        Ok(Config { source_dir, path_mappings, dir_mappings, extensions, trace_level })
    }
}

fn parse_pathmap(raw: &str) -> Result<Vec<PathMapping>, CcboxError> {
    let mut out = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (from, to) = split_one_colon(entry).ok_or_else(|| CcboxError::MalformedPathMapping(entry.to_string()))?;
        out.push(PathMapping::new(from, to)?);
    }
    if out.len() > MAX_PATH_MAPPINGS {
        return Err(CcboxError::TooManyPathMappings { max: MAX_PATH_MAPPINGS, got: out.len() });
    }
    Ok(out)
}

fn parse_dirmap(raw: &str) -> Result<Vec<DirMapping>, CcboxError> {
    let mut out = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (container, native) =
            split_one_colon(entry).ok_or_else(|| CcboxError::MalformedDirMapping(entry.to_string()))?;
        out.push(DirMapping::new(container, native)?);
    }
    if out.len() > MAX_DIR_MAPPINGS {
        return Err(CcboxError::TooManyDirMappings { max: MAX_DIR_MAPPINGS, got: out.len() });
    }
    Ok(out)
}

/// Splits `left:right` on the first `:` that isn't a Windows drive-letter
/// marker (`C:`) — a drive-form `from` side legitimately contains a colon
/// as its second character.
fn split_one_colon(entry: &str) -> Option<(&str, &str)> {
    let bytes = entry.as_bytes();
    let search_from = if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' { 2 } else { 0 };
    let rel = entry[search_from..].find(':')?;
    let split_at = search_from + rel;
    Some((&entry[..split_at], &entry[split_at + 1..]))
}

/// Rejects configurations where two `from` prefixes are distinct strings
/// that would collide under case-insensitive comparison — spec §9's Open
/// Question, resolved as a fatal startup error rather than a guessed
/// tie-break.
fn check_case_insensitive_collisions(mappings: &[PathMapping]) -> Result<(), CcboxError> {
    for i in 0..mappings.len() {
        for j in (i + 1)..mappings.len() {
            let a = &mappings[i].from;
            let b = &mappings[j].from;
            if a != b && a.eq_ignore_ascii_case(b) {
                return Err(CcboxError::CaseInsensitiveCollision { a: a.clone(), b: b.clone() });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_set_default_matches_json_and_jsonl() {
        let ext = ExtensionSet::from_defaults();
        assert!(ext.matches(Path::new("/a/session.jsonl")));
        assert!(ext.matches(Path::new("/a/CONFIG.JSON")));
        assert!(!ext.matches(Path::new("/a/data.bin")));
    }

    #[test]
    fn extension_set_parses_optional_leading_dot() {
        let ext = ExtensionSet::parse("json, .jsonl, TXT");
        assert!(ext.matches(Path::new("/a.json")));
        assert!(ext.matches(Path::new("/a.jsonl")));
        assert!(ext.matches(Path::new("/a.txt")));
    }

    #[test]
    fn split_one_colon_handles_drive_prefix() {
        assert_eq!(split_one_colon("C:/Users/me:/ccbox/me"), Some(("C:/Users/me", "/ccbox/me")));
    }

    #[test]
    fn split_one_colon_handles_plain_prefix() {
        assert_eq!(split_one_colon("/mnt/d/work:/ccbox/work"), Some(("/mnt/d/work", "/ccbox/work")));
    }

    #[test]
    fn parse_pathmap_rejects_too_many() {
        let raw: String = (0..40)
            .map(|i| format!("//server{i}/share:/ccbox/s{i}"))
            .collect::<Vec<_>>()
            .join(";");
        let err = parse_pathmap(&raw).unwrap_err();
        assert!(matches!(err, CcboxError::TooManyPathMappings { .. }));
    }

    #[test]
    fn detects_case_insensitive_drive_collision() {
        let mappings = vec![
            PathMapping::new("C:/work", "/ccbox/work").unwrap(),
            PathMapping::new("c:/Work", "/ccbox/work2").unwrap(),
        ];
        assert!(check_case_insensitive_collisions(&mappings).is_err());
    }

    #[test]
    fn allows_distinct_drives() {
        let mappings = vec![
            PathMapping::new("C:/work", "/ccbox/work").unwrap(),
            PathMapping::new("D:/work", "/ccbox/work2").unwrap(),
        ];
        assert!(check_case_insensitive_collisions(&mappings).is_ok());
    }
}
