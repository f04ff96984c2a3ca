use crate::cancel::CancelToken;
use crate::disk::DirFs;
use crate::node::{ContentError, FileContents, Node};
use crate::utils;
use crate::vfs::{FsError, WritableFs};
use miette::Diagnostic;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

const DIR_MODE: u32 = 0o755;

#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    #[error("no filesystem configured")]
    #[diagnostic(
        code(slipway::generate::missing_fs),
        help("Set `Generator::fs` before calling generate")
    )]
    MissingFs,

    #[error("output directory '{path}' does not exist")]
    #[diagnostic(
        code(slipway::generate::output_dir_missing),
        help("Create the directory first, or allow the generator to create it")
    )]
    OutputDirMissing { path: String },

    #[error("'{path}' already exists")]
    #[diagnostic(code(slipway::generate::already_exists))]
    AlreadyExists { path: String },

    #[error("cannot clean '{path}': not a directory")]
    #[diagnostic(code(slipway::generate::not_a_directory))]
    NotADirectory { path: String },

    #[error("error cleaning output dir")]
    #[diagnostic(code(slipway::generate::cleaning))]
    Cleaning {
        #[source]
        source: FsError,
    },

    #[error("generation canceled during planning")]
    #[diagnostic(code(slipway::generate::canceled))]
    Canceled,

    #[error("error producing contents for '{path}'")]
    #[diagnostic(code(slipway::generate::write_file))]
    WriteFile {
        path: String,
        #[source]
        source: ContentError,
    },

    #[error("error finalizing temp file for '{path}'")]
    #[diagnostic(code(slipway::generate::close_temp))]
    CloseTemp {
        path: String,
        #[source]
        source: FsError,
    },

    #[error("error moving temp file into place at '{path}'")]
    #[diagnostic(code(slipway::generate::rename))]
    Rename {
        path: String,
        #[source]
        source: FsError,
    },

    #[error("orphaned temp file '{temp_path}' could not be removed: {cleanup}")]
    #[diagnostic(
        code(slipway::generate::orphaned_temp),
        help("Remove the temp file manually")
    )]
    OrphanedTemp {
        temp_path: String,
        cleanup: FsError,
        #[source]
        source: Box<GenerateError>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fs(#[from] FsError),
}

/// A directory to create, root-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirOp {
    pub path: String,
}

/// A file to write: its target path, a borrowed content producer, and
/// whether the leaf claims to be brand new.
pub struct FileOp<'n> {
    pub path: String,
    pub is_new: bool,
    contents: &'n dyn FileContents,
}

impl std::fmt::Debug for FileOp<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileOp")
            .field("path", &self.path)
            .field("is_new", &self.is_new)
            .finish()
    }
}

/// The ordered operation lists produced by [`plan`]. Directory operations
/// are applied first, in list order, then file operations.
#[derive(Debug)]
pub struct Plan<'n> {
    pub dirs: Vec<DirOp>,
    pub files: Vec<FileOp<'n>>,
}

/// Walks a declared tree in pre-order and flattens it into operation lists
/// without touching any filesystem.
///
/// Every directory's operation precedes the operations of its descendants.
/// The cancellation token is checked at each step; a canceled token fails
/// the whole plan with [`GenerateError::Canceled`].
pub fn plan<'n>(cancel: &CancelToken, nodes: &'n [Node]) -> Result<Plan<'n>, GenerateError> {
    let mut plan = Plan {
        dirs: Vec::new(),
        files: Vec::new(),
    };

    for node in nodes {
        visit(cancel, ".", node, &mut plan)?;
    }

    Ok(plan)
}

fn visit<'n>(
    cancel: &CancelToken,
    parent: &str,
    node: &'n Node,
    plan: &mut Plan<'n>,
) -> Result<(), GenerateError> {
    if cancel.is_canceled() {
        return Err(GenerateError::Canceled);
    }

    match node {
        Node::Directory(dir) => {
            let path = utils::join(parent, dir.name());
            plan.dirs.push(DirOp { path: path.clone() });

            for entry in dir.entries() {
                visit(cancel, &path, entry, plan)?;
            }
        }
        Node::File(file) => {
            plan.files.push(FileOp {
                path: utils::join(parent, file.name()),
                is_new: file.is_new(),
                contents: file.contents(),
            });
        }
    }

    Ok(())
}

/// Best-effort recursive emptying of everything inside `dir`, leaving `dir`
/// itself intact. A missing `dir` is a silent no-op; anything else that
/// fails wraps into [`GenerateError::Cleaning`].
pub fn clean_dir(fs: &dyn WritableFs, dir: &str) -> Result<(), GenerateError> {
    let meta = match fs.stat(dir) {
        Ok(meta) => meta,
        Err(error) if error.is_not_found() => return Ok(()),
        Err(error) => return Err(GenerateError::Cleaning { source: error }),
    };

    if !meta.is_dir {
        return Err(GenerateError::NotADirectory {
            path: dir.to_string(),
        });
    }

    let entries = fs
        .read_dir(dir)
        .map_err(|source| GenerateError::Cleaning { source })?;

    for entry in entries {
        let target = utils::join(dir, &entry.name);
        log::debug!("cleaning {}", target);
        fs.remove_all(&target)
            .map_err(|source| GenerateError::Cleaning { source })?;
    }

    Ok(())
}

/// The two-phase generation engine: plan a declared tree, then apply all
/// directory operations followed by all file operations against the
/// configured filesystem.
///
/// Each file is staged into a temp file and renamed onto its target, so a
/// failure mid-write never leaves a partial file at the target. There is no
/// rollback across operations: the first failure aborts the call and leaves
/// prior operations in place.
#[derive(Clone, Default)]
pub struct Generator {
    pub fs: Option<Arc<dyn WritableFs>>,

    /// Fail with [`GenerateError::AlreadyExists`] when a planned directory
    /// already exists from a previous call or an external actor. Declaring
    /// the same directory twice within one call never errors.
    pub error_on_existing_dir: bool,

    /// Empty the root before planning.
    pub clean_dir: bool,

    /// Fail with [`GenerateError::AlreadyExists`] when a brand-new leaf
    /// targets a path that already holds content. Modify leaves are exempt.
    pub error_on_existing_file: bool,
}

impl Generator {
    pub fn generate(&self, cancel: &CancelToken, nodes: &[Node]) -> Result<(), GenerateError> {
        let fs = self.fs.as_deref().ok_or(GenerateError::MissingFs)?;

        // Run state: directory paths created earlier in this same call.
        let mut created_dirs: HashSet<String> = HashSet::new();

        if self.clean_dir {
            clean_dir(fs, ".")?;
        }

        let plan = plan(cancel, nodes)?;
        log::debug!(
            "planned {} directories and {} files",
            plan.dirs.len(),
            plan.files.len()
        );

        for dir in &plan.dirs {
            self.apply_dir(fs, &mut created_dirs, &dir.path)?;
        }

        for file in &plan.files {
            self.apply_file(fs, file)?;
        }

        Ok(())
    }

    fn apply_dir(
        &self,
        fs: &dyn WritableFs,
        created_dirs: &mut HashSet<String>,
        path: &str,
    ) -> Result<(), GenerateError> {
        if let Err(error) = fs.mkdir(path, DIR_MODE) {
            if !error.is_already_exists() {
                return Err(error.into());
            }

            if self.error_on_existing_dir && !created_dirs.contains(path) {
                return Err(GenerateError::AlreadyExists {
                    path: path.to_string(),
                });
            }
        }

        created_dirs.insert(path.to_string());
        Ok(())
    }

    fn apply_file(&self, fs: &dyn WritableFs, op: &FileOp<'_>) -> Result<(), GenerateError> {
        if self.error_on_existing_file && op.is_new {
            match fs.stat(&op.path) {
                Ok(_) => {
                    return Err(GenerateError::AlreadyExists {
                        path: op.path.clone(),
                    })
                }
                Err(error) if error.is_not_found() => {}
                Err(error) => return Err(error.into()),
            }
        }

        let mut tmp = fs.create_temp("", utils::file_name(&op.path))?;
        let temp_path = tmp.path().to_string();

        let staged = match op.contents.write_to(fs, &op.path, &mut tmp) {
            Ok(()) => tmp.close().map_err(|source| GenerateError::CloseTemp {
                path: op.path.clone(),
                source,
            }),
            Err(source) => {
                // the temp never becomes the target, but close it so the
                // handle isn't leaked before removal
                let _ = tmp.close();
                Err(GenerateError::WriteFile {
                    path: op.path.clone(),
                    source,
                })
            }
        };

        if let Err(primary) = staged {
            return Err(merge_temp_cleanup(fs, primary, &temp_path));
        }

        if let Err(source) = fs.rename(&temp_path, &op.path) {
            let primary = GenerateError::Rename {
                path: op.path.clone(),
                source,
            };
            return Err(merge_temp_cleanup(fs, primary, &temp_path));
        }

        log::debug!("create {}", op.path);
        Ok(())
    }
}

// Temp cleanup after a failed write is best-effort; a cleanup failure is
// merged into the returned error rather than swallowed.
fn merge_temp_cleanup(
    fs: &dyn WritableFs,
    primary: GenerateError,
    temp_path: &str,
) -> GenerateError {
    match fs.remove(temp_path) {
        Ok(()) => primary,
        Err(cleanup) => GenerateError::OrphanedTemp {
            temp_path: temp_path.to_string(),
            cleanup,
            source: Box::new(primary),
        },
    }
}

/// Convenience wrapper around [`Generator`] for disk-backed runs: resolves
/// an output directory into a [`DirFs`], creating it unless told not to.
#[derive(Debug, Clone, Default)]
pub struct DirGenerator {
    pub output_dir: PathBuf,

    /// When set, a missing output directory is a fatal
    /// [`GenerateError::OutputDirMissing`] instead of being created.
    pub no_create_output_dir: bool,

    pub clean_dir: bool,
    pub error_on_existing_dir: bool,
    pub error_on_existing_file: bool,
}

impl DirGenerator {
    pub fn generate(&self, cancel: &CancelToken, nodes: &[Node]) -> Result<(), GenerateError> {
        let fs = if self.no_create_output_dir {
            let fs = DirFs::new(&self.output_dir);
            match fs.stat(".") {
                Ok(meta) if meta.is_dir => {}
                Ok(_) => {
                    return Err(GenerateError::NotADirectory {
                        path: self.output_dir.display().to_string(),
                    })
                }
                Err(error) if error.is_not_found() => {
                    return Err(GenerateError::OutputDirMissing {
                        path: self.output_dir.display().to_string(),
                    })
                }
                Err(error) => return Err(error.into()),
            }
            fs
        } else {
            DirFs::create(self.output_dir.clone())?
        };

        let generator = Generator {
            fs: Some(Arc::new(fs)),
            error_on_existing_dir: self.error_on_existing_dir,
            clean_dir: self.clean_dir,
            error_on_existing_file: self.error_on_existing_file,
        };

        generator.generate(cancel, nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_is_preorder_with_dirs_and_files_split() {
        let nodes = vec![
            Node::plain_file("README.md", "hi"),
            Node::dir(
                "pkg",
                [
                    Node::plain_file("lib.rs", ""),
                    Node::dir("cli", [Node::plain_file("main.rs", "")]),
                ],
            ),
        ];

        let plan = plan(&CancelToken::new(), &nodes).unwrap();

        let dirs: Vec<&str> = plan.dirs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(dirs, vec!["pkg", "pkg/cli"]);

        let files: Vec<&str> = plan.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(files, vec!["README.md", "pkg/lib.rs", "pkg/cli/main.rs"]);
    }

    #[test]
    fn plan_of_nothing_is_a_valid_noop() {
        let plan = plan(&CancelToken::new(), &[]).unwrap();
        assert!(plan.dirs.is_empty());
        assert!(plan.files.is_empty());
    }

    #[test]
    fn plan_observes_cancellation() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let nodes = vec![Node::dir("pkg", [])];
        let err = plan(&cancel, &nodes).unwrap_err();
        assert!(matches!(err, GenerateError::Canceled));
    }

    #[test]
    fn empty_directories_plan_a_dir_op_and_no_file_ops() {
        let nodes = vec![Node::dir("empty", [])];
        let plan = plan(&CancelToken::new(), &nodes).unwrap();
        assert_eq!(plan.dirs.len(), 1);
        assert!(plan.files.is_empty());
    }
}
