//! Shared identity and cell types for pincell.
//!
//! Kept dependency-light so both the host side (documents, rendering) and the
//! mirroring core can agree on what a cell *is* without depending on each other.

pub mod cell;
pub mod ids;

pub use cell::{CellKind, CellSnapshot, ExecutionCount};
pub use ids::{CellId, MirrorId};
