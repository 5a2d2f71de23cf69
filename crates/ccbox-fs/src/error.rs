use thiserror::Error;

/// Errors surfaced while loading configuration, outside the `PathFilesystem`
/// trait boundary.
///
/// Inside the trait boundary, operations return `fuse3::Result<T>` directly
/// with a raw errno; `CcboxError` only needs to reach `main`, where it is
/// wrapped in `anyhow` and reported as a startup diagnostic (spec: all
/// configuration errors are fatal at startup).
#[derive(Debug, Error)]
pub enum CcboxError {
    #[error("source directory not specified (pass source=<path> or set CCBOX_SOURCE)")]
    MissingSource,

    #[error("source directory {0:?} does not exist or is not readable")]
    SourceUnreadable(std::path::PathBuf),

    #[error("malformed path mapping entry {0:?} (expected host-prefix:container-prefix)")]
    MalformedPathMapping(String),

    #[error("malformed directory-name mapping entry {0:?} (expected container-name:native-name)")]
    MalformedDirMapping(String),

    #[error("too many path mappings (max {max}, got {got})")]
    TooManyPathMappings { max: usize, got: usize },

    #[error("too many directory-name mappings (max {max}, got {got})")]
    TooManyDirMappings { max: usize, got: usize },

    #[error(
        "path mappings {a:?} and {b:?} collide under case-insensitive matching; \
         ccbox refuses to guess a tie-break, rename one of them"
    )]
    CaseInsensitiveCollision { a: String, b: String },

    #[error("directory-name mapping segment {0:?} contains a path separator")]
    DirNameContainsSeparator(String),

    #[error("backing I/O error: {0}")]
    Io(#[from] std::io::Error),
}
