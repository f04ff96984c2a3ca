use crate::errors::BoxError;
use crate::template::{RawTemplate, Template, TemplateError};
use crate::vfs::{FsError, WritableFs};
use miette::Diagnostic;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::marker::PhantomData;
use tera::Context;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ContentError {
    #[error("error reading current contents")]
    #[diagnostic(code(slipway::content::read))]
    Read {
        #[source]
        source: FsError,
    },

    #[error("error parsing current contents")]
    #[diagnostic(
        code(slipway::content::parse),
        help("The parse callback rejected the file's current contents")
    )]
    Parse {
        #[source]
        source: BoxError,
    },

    #[error("error computing modified contents")]
    #[diagnostic(code(slipway::content::modify))]
    Modify {
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error("error writing contents")]
    #[diagnostic(code(slipway::content::io))]
    Io {
        #[source]
        source: std::io::Error,
    },
}

/// Produces a leaf's bytes at write time.
///
/// The writer is a staging area (a temp file); `path` is the leaf's eventual
/// target, which read-modify-write producers consult for current contents.
pub trait FileContents {
    fn write_to(
        &self,
        fs: &dyn WritableFs,
        path: &str,
        writer: &mut dyn Write,
    ) -> Result<(), ContentError>;
}

/// An element of a declared tree: a directory with ordered children, or a
/// file leaf with one content strategy.
///
/// Trees are built once by the caller and read-only to the generation
/// engine. Child order is significant and preserved end-to-end.
pub enum Node {
    Directory(DirNode),
    File(FileNode),
}

pub struct DirNode {
    name: String,
    entries: Vec<Node>,
}

pub struct FileNode {
    name: String,
    is_new: bool,
    contents: Box<dyn FileContents>,
}

impl Node {
    /// A directory with a single-segment name and ordered children.
    pub fn dir(name: impl Into<String>, entries: impl IntoIterator<Item = Node>) -> Node {
        Node::Directory(DirNode {
            name: name.into(),
            entries: entries.into_iter().collect(),
        })
    }

    /// Like [`Node::dir`], but `path` may be `/`-separated: every segment
    /// becomes a nested directory, `mkdir -p` style, with `entries` under
    /// the innermost one. `.` and empty segments are dropped.
    pub fn dir_path(path: &str, entries: impl IntoIterator<Item = Node>) -> Node {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();

        let mut segments = segments.into_iter().rev();
        let innermost = match segments.next() {
            Some(name) => name,
            None => return Node::dir(".", entries),
        };

        let mut node = Node::dir(innermost, entries);
        for segment in segments {
            node = Node::dir(segment, [node]);
        }
        node
    }

    /// A file with fixed contents known at declaration time.
    pub fn plain_file(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Node {
        Node::File(FileNode {
            name: name.into(),
            is_new: true,
            contents: Box::new(StaticContents {
                data: contents.into(),
            }),
        })
    }

    /// A file rendered from a raw tera template string at write time.
    ///
    /// `data` is serialized into the render context up front; rendering
    /// errors (syntax, missing variables) surface when the tree is
    /// generated, not here.
    pub fn template_file<D: Serialize>(
        name: impl Into<String>,
        source: impl Into<String>,
        data: &D,
    ) -> Result<Node, TemplateError> {
        let context =
            Context::from_serialize(data).map_err(|source| TemplateError::Data { source })?;

        Ok(Node::file_from_template(
            name,
            Box::new(RawTemplate::new(source)),
            context,
        ))
    }

    /// A file rendered by an injected [`Template`] capability.
    pub fn file_from_template(
        name: impl Into<String>,
        template: Box<dyn Template>,
        data: Context,
    ) -> Node {
        Node::File(FileNode {
            name: name.into(),
            is_new: true,
            contents: Box::new(TemplateContents { template, data }),
        })
    }

    /// A file whose contents derive from whatever is at its target path
    /// when the tree is generated: the current bytes (empty if the target
    /// is absent) are parsed into a `V`, handed to `modify`, and the bytes
    /// it returns are written back.
    ///
    /// Leaves built this way are expected to touch existing files, so they
    /// are exempt from the strict existing-file check.
    pub fn modify_file<V, P, M>(name: impl Into<String>, parse: P, modify: M) -> Node
    where
        V: Default + 'static,
        P: Fn(&[u8], &mut V) -> Result<(), BoxError> + 'static,
        M: Fn(&mut V) -> Result<Vec<u8>, BoxError> + 'static,
    {
        Node::File(FileNode {
            name: name.into(),
            is_new: false,
            contents: Box::new(ModifyContents {
                parse,
                modify,
                _value: PhantomData::<fn() -> V>,
            }),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Directory(dir) => &dir.name,
            Node::File(file) => &file.name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }
}

impl DirNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Node] {
        &self.entries
    }
}

impl FileNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn contents(&self) -> &dyn FileContents {
        self.contents.as_ref()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Directory(dir) => f
                .debug_struct("Directory")
                .field("name", &dir.name)
                .field("entries", &dir.entries)
                .finish(),
            Node::File(file) => f
                .debug_struct("File")
                .field("name", &file.name)
                .field("is_new", &file.is_new)
                .finish_non_exhaustive(),
        }
    }
}

struct StaticContents {
    data: Vec<u8>,
}

impl FileContents for StaticContents {
    fn write_to(
        &self,
        _fs: &dyn WritableFs,
        _path: &str,
        writer: &mut dyn Write,
    ) -> Result<(), ContentError> {
        writer
            .write_all(&self.data)
            .map_err(|source| ContentError::Io { source })
    }
}

struct TemplateContents {
    template: Box<dyn Template>,
    data: Context,
}

impl FileContents for TemplateContents {
    fn write_to(
        &self,
        _fs: &dyn WritableFs,
        _path: &str,
        writer: &mut dyn Write,
    ) -> Result<(), ContentError> {
        self.template.execute(writer, &self.data)?;
        Ok(())
    }
}

struct ModifyContents<V, P, M> {
    parse: P,
    modify: M,
    _value: PhantomData<fn() -> V>,
}

impl<V, P, M> FileContents for ModifyContents<V, P, M>
where
    V: Default,
    P: Fn(&[u8], &mut V) -> Result<(), BoxError>,
    M: Fn(&mut V) -> Result<Vec<u8>, BoxError>,
{
    fn write_to(
        &self,
        fs: &dyn WritableFs,
        path: &str,
        writer: &mut dyn Write,
    ) -> Result<(), ContentError> {
        let current = match fs.read_file(path) {
            Ok(bytes) => bytes,
            Err(error) if error.is_not_found() => Vec::new(),
            Err(error) => return Err(ContentError::Read { source: error }),
        };

        let mut value = V::default();
        if !current.is_empty() {
            (self.parse)(&current, &mut value).map_err(|source| ContentError::Parse { source })?;
        }

        let modified = (self.modify)(&mut value).map_err(|source| ContentError::Modify { source })?;

        writer
            .write_all(&modified)
            .map_err(|source| ContentError::Io { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nesting(node: &Node) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = node;
        loop {
            names.push(current.name().to_string());
            match current {
                Node::Directory(dir) if dir.entries().len() == 1 && dir.entries()[0].is_dir() => {
                    current = &dir.entries()[0];
                }
                _ => break,
            }
        }
        names
    }

    #[test]
    fn dir_path_single_segment() {
        let node = Node::dir_path("DirName", []);
        assert_eq!(node.name(), "DirName");
        assert!(node.is_dir());
    }

    #[test]
    fn dir_path_nests_segments_outermost_first() {
        let node = Node::dir_path("Level-0/Level-1/Level-2", []);
        assert_eq!(nesting(&node), vec!["Level-0", "Level-1", "Level-2"]);
    }

    #[test]
    fn dir_path_places_entries_under_the_innermost_directory() {
        let node = Node::dir_path(
            "Level-0/Level-1",
            [Node::plain_file("fileA", "fileA contents")],
        );

        let Node::Directory(outer) = &node else {
            panic!("expected a directory");
        };
        let Node::Directory(inner) = &outer.entries()[0] else {
            panic!("expected a nested directory");
        };
        assert_eq!(inner.name(), "Level-1");
        assert_eq!(inner.entries().len(), 1);
        assert_eq!(inner.entries()[0].name(), "fileA");
    }

    #[test]
    fn dir_path_drops_dot_segments() {
        let node = Node::dir_path("./Level-0/Level-1", [Node::plain_file("FileNameA", "")]);
        assert_eq!(nesting(&node), vec!["Level-0", "Level-1"]);
    }
}
