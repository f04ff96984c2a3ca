//! Declaratively materialize a tree of directories and files onto a
//! writable filesystem.
//!
//! Callers build a [`Node`] tree describing directories and files, then ask
//! a [`Generator`] to apply it: the tree is planned into ordered directory
//! and file operations, all directories are created first, and every file
//! is staged into a temp file and atomically renamed into place.
//!
//! Two [`WritableFs`] backends are provided: [`DirFs`] over a real base
//! directory and [`MapFs`], an in-memory map for tests and dry runs.
//!
//! ```no_run
//! use slipway::{CancelToken, DirGenerator, Node};
//!
//! let generator = DirGenerator {
//!     output_dir: "out".into(),
//!     ..DirGenerator::default()
//! };
//!
//! generator.generate(
//!     &CancelToken::new(),
//!     &[
//!         Node::plain_file("README.md", "# my project"),
//!         Node::dir("src", [Node::plain_file("main.rs", "fn main() {}")]),
//!     ],
//! )?;
//! # Ok::<(), slipway::GenerateError>(())
//! ```

pub mod cancel;
pub mod disk;
pub mod errors;
pub mod generate;
pub mod mem;
pub mod node;
pub mod render;
pub mod template;
pub mod utils;
pub mod vfs;

pub use cancel::CancelToken;
pub use disk::DirFs;
pub use errors::BoxError;
pub use generate::{clean_dir, plan, DirGenerator, GenerateError, Generator, Plan};
pub use mem::MapFs;
pub use node::{ContentError, FileContents, Node};
pub use render::{print_tree, render};
pub use template::{RawTemplate, Template, TemplateError};
pub use vfs::{DirEntry, FsError, Metadata, TempFile, WritableFs};
