use crate::errors::{FileOperation, IoError};
use crate::utils;
use crate::vfs::{glob_to_regex, DirEntry, FsError, Metadata, TempFile, WritableFs};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// A [`WritableFs`] backed by the real filesystem, rooted at a base
/// directory. Every path is resolved against the base before delegating to
/// [`std::fs`].
#[derive(Debug, Clone)]
pub struct DirFs {
    base: PathBuf,
}

impl DirFs {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Like [`DirFs::new`], but creates the base directory if it doesn't
    /// exist yet.
    pub fn create(base: impl Into<PathBuf>) -> Result<Self, FsError> {
        let base = base.into();

        if let Err(error) = fs::create_dir(&base) {
            if error.kind() != std::io::ErrorKind::AlreadyExists {
                return Err(FsError::Io(IoError::new(
                    FileOperation::Mkdir,
                    base.display().to_string(),
                    error,
                )));
            }
        }

        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let normalized = utils::normalize(path);
        if normalized == "." {
            self.base.clone()
        } else {
            self.base.join(normalized)
        }
    }

    fn relative(&self, full: &Path) -> String {
        full.strip_prefix(&self.base)
            .unwrap_or(full)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

impl WritableFs for DirFs {
    fn open(&self, path: &str) -> Result<Box<dyn Read>, FsError> {
        let file = fs::File::open(self.resolve(path))
            .map_err(|error| FsError::from_io(FileOperation::Read, path, error))?;
        Ok(Box::new(file))
    }

    fn stat(&self, path: &str) -> Result<Metadata, FsError> {
        let meta = fs::metadata(self.resolve(path))
            .map_err(|error| FsError::from_io(FileOperation::Stat, path, error))?;

        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode()
        };
        #[cfg(not(unix))]
        let mode = 0;

        Ok(Metadata {
            is_dir: meta.is_dir(),
            len: meta.len(),
            mode,
        })
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        fs::read(self.resolve(path))
            .map_err(|error| FsError::from_io(FileOperation::Read, path, error))
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let iter = fs::read_dir(self.resolve(path))
            .map_err(|error| FsError::from_io(FileOperation::ReadDir, path, error))?;

        let mut listing = Vec::new();
        for entry in iter {
            let entry =
                entry.map_err(|error| FsError::from_io(FileOperation::ReadDir, path, error))?;
            let file_type = entry
                .file_type()
                .map_err(|error| FsError::from_io(FileOperation::Stat, path, error))?;
            listing.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: file_type.is_dir(),
            });
        }

        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, FsError> {
        let re = glob_to_regex(pattern)?;
        let mut matches = Vec::new();

        for entry in walkdir::WalkDir::new(&self.base).min_depth(1) {
            let entry = entry.map_err(|error| {
                let path = error
                    .path()
                    .map(|p| self.relative(p))
                    .unwrap_or_else(|| ".".to_string());
                FsError::Io(IoError::new(FileOperation::ReadDir, path, error.into()))
            })?;

            let relative = self.relative(entry.path());
            if re.is_match(&relative) {
                matches.push(relative);
            }
        }

        matches.sort();
        Ok(matches)
    }

    fn mkdir(&self, path: &str, mode: u32) -> Result<(), FsError> {
        let mut builder = fs::DirBuilder::new();

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        builder
            .create(self.resolve(path))
            .map_err(|error| FsError::from_io(FileOperation::Mkdir, path, error))
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        fs::rename(self.resolve(from), self.resolve(to))
            .map_err(|error| FsError::from_io(FileOperation::Rename, to, error))
    }

    fn remove(&self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path);
        let meta = fs::metadata(&full)
            .map_err(|error| FsError::from_io(FileOperation::Remove, path, error))?;

        let result = if meta.is_dir() {
            fs::remove_dir(&full)
        } else {
            fs::remove_file(&full)
        };

        result.map_err(|error| FsError::from_io(FileOperation::Remove, path, error))
    }

    fn remove_all(&self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path);

        let meta = match fs::metadata(&full) {
            Ok(meta) => meta,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(FsError::from_io(FileOperation::Remove, path, error)),
        };

        let result = if meta.is_dir() {
            fs::remove_dir_all(&full)
        } else {
            fs::remove_file(&full)
        };

        result.map_err(|error| FsError::from_io(FileOperation::Remove, path, error))
    }

    fn create_temp(&self, dir: &str, prefix: &str) -> Result<Box<dyn TempFile>, FsError> {
        // Temp files live inside the base directory so the final rename
        // never crosses volumes.
        let target_dir = if dir.is_empty() {
            self.base.clone()
        } else {
            self.resolve(dir)
        };

        let tempfile = tempfile::Builder::new()
            .prefix(&format!("{}-", prefix))
            .tempfile_in(&target_dir)
            .map_err(|error| {
                FsError::Io(IoError::new(FileOperation::CreateTemp, dir, error))
            })?;

        let (file, full_path) = tempfile.keep().map_err(|error| {
            FsError::Io(IoError::new(
                FileOperation::CreateTemp,
                dir,
                error.error,
            ))
        })?;

        let path = self.relative(&full_path);

        Ok(Box::new(DiskTempFile {
            file: Some(file),
            path,
        }))
    }
}

struct DiskTempFile {
    file: Option<fs::File>,
    path: String,
}

impl Write for DiskTempFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(std::io::Error::other("temp file already closed")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl TempFile for DiskTempFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn close(mut self: Box<Self>) -> Result<(), FsError> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|error| {
                FsError::Io(IoError::new(
                    FileOperation::Write,
                    self.path.clone(),
                    error,
                ))
            })?;
        }
        Ok(())
    }
}
