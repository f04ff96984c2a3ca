use crate::errors::{FileOperation, IoError};
use crate::utils;
use crate::vfs::{glob_to_regex, DirEntry, FsError, Metadata, TempFile, WritableFs};
use indexmap::IndexMap;
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

const TEMP_NAMESPACE: &str = "/tmp";

#[derive(Debug, Clone)]
enum MapEntry {
    Dir { mode: u32 },
    File { data: Vec<u8>, mode: u32 },
}

#[derive(Debug)]
struct MapState {
    entries: RwLock<IndexMap<String, MapEntry>>,
    next_temp: AtomicU64,
}

/// An in-memory [`WritableFs`] backed by a path → content map. Useful for
/// fast, deterministic tests and dry runs.
///
/// Cloning yields another handle to the same store. Temporary files buffer
/// writes in memory until [`TempFile::close`], at which point the buffered
/// bytes become the entry's stored content; `rename` is then a pure key
/// move.
#[derive(Debug, Clone, Default)]
pub struct MapFs {
    state: Arc<MapState>,
}

impl Default for MapState {
    fn default() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            next_temp: AtomicU64::new(0),
        }
    }
}

impl MapFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file entry, replacing any previous entry at `path`.
    pub fn insert_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        let mut entries = self.state.entries.write().expect("map fs lock poisoned");
        entries.insert(
            Self::key(path),
            MapEntry::File {
                data: data.into(),
                mode: 0o644,
            },
        );
    }

    /// Seeds a directory entry.
    pub fn insert_dir(&self, path: &str) {
        let mut entries = self.state.entries.write().expect("map fs lock poisoned");
        entries.insert(Self::key(path), MapEntry::Dir { mode: 0o755 });
    }

    /// All stored paths outside the temp namespace, sorted.
    pub fn paths(&self) -> Vec<String> {
        let entries = self.state.entries.read().expect("map fs lock poisoned");
        let mut paths: Vec<String> = entries
            .keys()
            .filter(|k| !k.starts_with('/'))
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    // Temp keys live under an absolute-looking namespace so they never
    // collide with, or show up in, the relative tree.
    fn key(path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            utils::normalize(path)
        }
    }
}

impl WritableFs for MapFs {
    fn open(&self, path: &str) -> Result<Box<dyn Read>, FsError> {
        let data = self.read_file(path)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn stat(&self, path: &str) -> Result<Metadata, FsError> {
        let key = Self::key(path);
        if key == "." {
            return Ok(Metadata {
                is_dir: true,
                len: 0,
                mode: 0o755,
            });
        }

        let entries = self.state.entries.read().expect("map fs lock poisoned");
        match entries.get(&key) {
            Some(MapEntry::Dir { mode }) => Ok(Metadata {
                is_dir: true,
                len: 0,
                mode: *mode,
            }),
            Some(MapEntry::File { data, mode }) => Ok(Metadata {
                is_dir: false,
                len: data.len() as u64,
                mode: *mode,
            }),
            None => Err(FsError::NotFound { path: key }),
        }
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let key = Self::key(path);
        let entries = self.state.entries.read().expect("map fs lock poisoned");
        match entries.get(&key) {
            Some(MapEntry::File { data, .. }) => Ok(data.clone()),
            Some(MapEntry::Dir { .. }) => Err(FsError::Io(IoError::new(
                FileOperation::Read,
                key,
                std::io::Error::other("is a directory"),
            ))),
            None => Err(FsError::NotFound { path: key }),
        }
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let key = Self::key(path);
        if key != "." {
            if !self.stat(&key)?.is_dir {
                return Err(FsError::NotADirectory { path: key });
            }
        }

        let entries = self.state.entries.read().expect("map fs lock poisoned");
        let mut listing: Vec<DirEntry> = entries
            .iter()
            .filter(|(k, _)| !k.starts_with('/') && utils::parent(k) == key.as_str())
            .map(|(k, entry)| DirEntry {
                name: utils::file_name(k).to_string(),
                is_dir: matches!(entry, MapEntry::Dir { .. }),
            })
            .collect();
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, FsError> {
        let re = glob_to_regex(pattern)?;
        let entries = self.state.entries.read().expect("map fs lock poisoned");
        let mut matches: Vec<String> = entries
            .keys()
            .filter(|k| !k.starts_with('/') && re.is_match(k))
            .cloned()
            .collect();
        matches.sort();
        Ok(matches)
    }

    fn mkdir(&self, path: &str, mode: u32) -> Result<(), FsError> {
        let key = Self::key(path);
        let mut entries = self.state.entries.write().expect("map fs lock poisoned");

        if key == "." || entries.contains_key(&key) {
            return Err(FsError::AlreadyExists { path: key });
        }

        let parent = utils::parent(&key);
        if parent != "." {
            match entries.get(parent) {
                Some(MapEntry::Dir { .. }) => {}
                Some(MapEntry::File { .. }) => {
                    return Err(FsError::NotADirectory {
                        path: parent.to_string(),
                    })
                }
                None => {
                    return Err(FsError::NotFound {
                        path: parent.to_string(),
                    })
                }
            }
        }

        entries.insert(key, MapEntry::Dir { mode });
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        let from_key = Self::key(from);
        let to_key = Self::key(to);
        if from_key == to_key {
            return Ok(());
        }

        let mut entries = self.state.entries.write().expect("map fs lock poisoned");
        let entry = entries
            .shift_remove(&from_key)
            .ok_or(FsError::NotFound { path: from_key })?;
        entries.insert(to_key, entry);
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), FsError> {
        let key = Self::key(path);
        let mut entries = self.state.entries.write().expect("map fs lock poisoned");

        if !entries.contains_key(&key) {
            return Err(FsError::NotFound { path: key });
        }

        let child_prefix = format!("{}/", key);
        if entries.keys().any(|k| k.starts_with(&child_prefix)) {
            return Err(FsError::Io(IoError::new(
                FileOperation::Remove,
                key,
                std::io::Error::other("directory not empty"),
            )));
        }

        entries.shift_remove(&key);
        Ok(())
    }

    fn remove_all(&self, path: &str) -> Result<(), FsError> {
        let key = Self::key(path);
        let mut entries = self.state.entries.write().expect("map fs lock poisoned");

        if key == "." {
            entries.retain(|k, _| k.starts_with('/'));
            return Ok(());
        }

        let child_prefix = format!("{}/", key);
        entries.retain(|k, _| k != &key && !k.starts_with(&child_prefix));
        Ok(())
    }

    fn create_temp(&self, dir: &str, prefix: &str) -> Result<Box<dyn TempFile>, FsError> {
        let dir = if dir.is_empty() { TEMP_NAMESPACE } else { dir };
        let serial = self.state.next_temp.fetch_add(1, Ordering::Relaxed);
        let path = format!("{}/{}-{}", dir, prefix, serial);

        let mut entries = self.state.entries.write().expect("map fs lock poisoned");
        entries.insert(
            path.clone(),
            MapEntry::File {
                data: Vec::new(),
                mode: 0o644,
            },
        );

        Ok(Box::new(MapTempFile {
            fs: self.clone(),
            path,
            buffer: Vec::new(),
        }))
    }
}

struct MapTempFile {
    fs: MapFs,
    path: String,
    buffer: Vec<u8>,
}

impl Write for MapTempFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl TempFile for MapTempFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn close(self: Box<Self>) -> Result<(), FsError> {
        let mut entries = self.fs.state.entries.write().expect("map fs lock poisoned");
        if let Some(entry) = entries.get_mut(&self.path) {
            *entry = MapEntry::File {
                data: self.buffer,
                mode: 0o644,
            };
        }
        Ok(())
    }
}
