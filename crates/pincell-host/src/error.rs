//! Error types for host document operations.

use thiserror::Error;

use pincell_types::CellId;

use crate::render::NodeId;

/// Errors reported by a [`DocumentHost`](crate::DocumentHost).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// No cell with this identity is in the document.
    #[error("cell not found: {0:?}")]
    CellNotFound(CellId),

    /// The host does not provide this operation.
    #[error("host does not support '{0}'")]
    Unsupported(&'static str),

    /// An active-position index past the end of the document.
    #[error("index {index} out of range for document with {len} cells")]
    IndexOutOfRange { index: usize, len: usize },

    /// The rendering engine failed to build a tree.
    #[error("render error: {0}")]
    Render(String),

    /// Notebook file could not be parsed.
    #[error("notebook parse error: {0}")]
    Parse(String),
}

/// Errors from render tree manipulation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The node was removed (or its tree disposed) before this operation.
    #[error("node {0:?} is detached")]
    Detached(NodeId),

    /// Appending would make a node its own ancestor.
    #[error("cannot append {child:?} under its own descendant {parent:?}")]
    Cycle { parent: NodeId, child: NodeId },
}
