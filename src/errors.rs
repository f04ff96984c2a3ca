use miette::Diagnostic;
use thiserror::Error;

/// Error type for caller-supplied callbacks (template engines, parse and
/// mutate functions).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error, Diagnostic)]
pub enum FileOperation {
    #[error("reading a file")]
    Read,
    #[error("writing a file")]
    Write,
    #[error("creating a directory")]
    Mkdir,
    #[error("renaming a file")]
    Rename,
    #[error("removing a file or directory")]
    Remove,
    #[error("inspecting a file")]
    Stat,
    #[error("listing a directory")]
    ReadDir,
    #[error("creating a temporary file")]
    CreateTemp,
}

#[derive(Debug, Error, Diagnostic)]
#[error("I/O error: {operation} on path '{path}'")]
#[diagnostic(
    code(slipway::io),
    help("Check file permissions, disk space, or that the path is correct.")
)]
pub struct IoError {
    pub operation: FileOperation,
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

impl IoError {
    pub fn new(operation: FileOperation, path: impl Into<String>, error: std::io::Error) -> Self {
        Self {
            operation,
            path: path.into(),
            source: error,
        }
    }
}
