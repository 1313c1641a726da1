//! Error types for mirror operations.

use thiserror::Error;

use pincell_host::{HostError, NodeId, TreeError};
use pincell_types::{CellId, MirrorId};

/// Errors surfaced by the mirror subsystem.
///
/// Command handlers suppress the triggering UI event but never swallow these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// The cell already has a live mirror.
    #[error("cell {0:?} already has a live mirror")]
    Duplicate(CellId),

    /// A render node was disposed or moved away before this operation.
    #[error("render node {0:?} is detached")]
    Detached(NodeId),

    /// The mirror's rendered subtree is not in any container.
    #[error("mirror {0:?} has no mounted view")]
    Unmounted(MirrorId),

    /// The host lacks an operation this subsystem needs.
    #[error("host is missing capability '{0}'")]
    MissingHostCapability(&'static str),

    /// The canonical cell is gone from the document.
    #[error("cell not found: {0:?}")]
    CellNotFound(CellId),

    /// No mirror was ever created with this ID.
    #[error("unknown mirror {0:?}")]
    UnknownMirror(MirrorId),

    /// The mirror was disposed; only `dispose` is still accepted.
    #[error("mirror {0:?} is disposed")]
    Disposed(MirrorId),

    /// The rendering engine produced a cell without a required region.
    #[error("rendered cell has no '{0}' region")]
    MissingRegion(&'static str),

    /// Any other host failure.
    #[error("host error: {0}")]
    Host(HostError),
}

impl From<HostError> for MirrorError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::Unsupported(op) => MirrorError::MissingHostCapability(op),
            HostError::CellNotFound(id) => MirrorError::CellNotFound(id),
            other => MirrorError::Host(other),
        }
    }
}

impl From<TreeError> for MirrorError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::Detached(node) => MirrorError::Detached(node),
            TreeError::Cycle { child, .. } => MirrorError::Detached(child),
        }
    }
}

/// Result type for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_maps_to_missing_capability() {
        let e: MirrorError = HostError::Unsupported("insert_cell_below").into();
        assert_eq!(e, MirrorError::MissingHostCapability("insert_cell_below"));
    }

    #[test]
    fn test_cell_not_found_passes_through() {
        let id = CellId::new();
        let e: MirrorError = HostError::CellNotFound(id).into();
        assert_eq!(e, MirrorError::CellNotFound(id));
    }
}
