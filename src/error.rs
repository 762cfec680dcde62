use crate::{index::NodeIdx, path::NodePath};

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure is local and recoverable: an operation either fully
/// succeeds (and reindexes) or reports one of these without having touched
/// shared structure.
#[rustfmt::skip]
#[derive(
    Clone,
    Debug,
    PartialEq,
    displaydoc::Display,
    thiserror::Error,
)]
pub enum Error {
    /// no node exists at path {path}
    PathNotFound { path: NodePath },
    /// linear index {index} is out of range for a forest of {len} node(s)
    IndexOutOfRange { index: isize, len: usize },
    /// node {idx} has no parent here; the operation needs an attached node
    Detached { idx: NodeIdx },
    /// node {idx} is already attached (or would come to own itself); detach it first
    AlreadyAttached { idx: NodeIdx },
    /// no node is allocated for handle {idx}
    NodeNotFound { idx: NodeIdx },
    /// expected exactly one top-level tree, found {count}
    SingleTreeExpected { count: usize },
    /// couldn't parse a generated graphviz definition: {0}
    #[cfg(feature = "graphviz")]
    GraphvizParse(String),
    /// io failure: {0}
    Io(ioe::IoError),
}

impl From<ioe::IoError> for Error {
    fn from(err: ioe::IoError) -> Self {
        Self::Io(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(ioe::IoError::from(err))
    }
}
