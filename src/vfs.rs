use crate::errors::{FileOperation, IoError};
use miette::Diagnostic;
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FsError {
    #[error("'{path}' does not exist")]
    #[diagnostic(code(slipway::fs::not_found))]
    NotFound { path: String },

    #[error("'{path}' already exists")]
    #[diagnostic(code(slipway::fs::already_exists))]
    AlreadyExists { path: String },

    #[error("'{path}' is not a directory")]
    #[diagnostic(code(slipway::fs::not_a_directory))]
    NotADirectory { path: String },

    #[error("invalid glob pattern '{pattern}'")]
    #[diagnostic(code(slipway::fs::invalid_pattern), help("Supported wildcards are '*' and '?'"))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("I/O error within filesystem backend")]
    #[diagnostic(code(slipway::fs::io))]
    Io(#[from] IoError),
}

impl FsError {
    /// Classifies a raw [`std::io::Error`] into the distinguished kinds the
    /// generation engine branches on.
    pub fn from_io(operation: FileOperation, path: &str, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound {
                path: path.to_string(),
            },
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists {
                path: path.to_string(),
            },
            _ => FsError::Io(IoError::new(operation, path, error)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, FsError::AlreadyExists { .. })
    }
}

/// Minimal stat result. Only the fields the generation engine inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub is_dir: bool,
    pub len: u64,
    pub mode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// A uniquely-named writable file, not yet visible at any real target path,
/// meant to be written, closed, and then renamed into place.
pub trait TempFile: Write {
    /// The temporary path, addressable by [`WritableFs::rename`] and
    /// [`WritableFs::remove`].
    fn path(&self) -> &str;

    /// Flushes buffered content and makes it the file's stored content.
    fn close(self: Box<Self>) -> Result<(), FsError>;
}

/// Read and write access to a hierarchical filesystem.
///
/// All paths are `/`-separated and relative to the filesystem root; `"."`
/// names the root itself. Implementations must report `NotFound` and
/// `AlreadyExists` through the corresponding [`FsError`] kinds so callers
/// can branch on them.
pub trait WritableFs: Send + Sync {
    fn open(&self, path: &str) -> Result<Box<dyn Read>, FsError>;

    fn stat(&self, path: &str) -> Result<Metadata, FsError>;

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError>;

    /// Direct children of `path`, sorted by name.
    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError>;

    /// Paths matching `pattern`, sorted. `*` and `?` match within a single
    /// path segment.
    fn glob(&self, pattern: &str) -> Result<Vec<String>, FsError>;

    /// Creates exactly one directory. The parent must already exist, and an
    /// existing entry at `path` is an `AlreadyExists` error.
    fn mkdir(&self, path: &str, mode: u32) -> Result<(), FsError>;

    /// Atomically replaces `to` with the content at `from`.
    fn rename(&self, from: &str, to: &str) -> Result<(), FsError>;

    /// Removes a single entry.
    fn remove(&self, path: &str) -> Result<(), FsError>;

    /// Removes an entry and everything nested under it. A missing `path` is
    /// not an error.
    fn remove_all(&self, path: &str) -> Result<(), FsError>;

    /// Allocates a new uniquely-named temp file. An empty `dir` picks the
    /// implementation's default temp location.
    fn create_temp(&self, dir: &str, prefix: &str) -> Result<Box<dyn TempFile>, FsError>;
}

/// Translates a glob pattern into an anchored regex. `*` and `?` never
/// cross a `/` boundary.
pub(crate) fn glob_to_regex(pattern: &str) -> Result<regex::Regex, FsError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');

    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str("[^/]*"),
            '?' => expr.push_str("[^/]"),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }

    expr.push('$');

    regex::Regex::new(&expr).map_err(|error| FsError::InvalidPattern {
        pattern: pattern.to_string(),
        source: error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_wildcards_stay_within_a_segment() {
        let re = glob_to_regex("pkg/*.rs").unwrap();
        assert!(re.is_match("pkg/main.rs"));
        assert!(!re.is_match("pkg/cli/main.rs"));
        assert!(!re.is_match("pkg/main.rs.bak"));
    }

    #[test]
    fn glob_escapes_regex_metacharacters() {
        let re = glob_to_regex("a.b").unwrap();
        assert!(re.is_match("a.b"));
        assert!(!re.is_match("axb"));
    }

    #[test]
    fn from_io_classifies_error_kinds() {
        let not_found = FsError::from_io(
            FileOperation::Stat,
            "missing",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(not_found.is_not_found());

        let exists = FsError::from_io(
            FileOperation::Mkdir,
            "taken",
            std::io::Error::from(std::io::ErrorKind::AlreadyExists),
        );
        assert!(exists.is_already_exists());
    }
}
