//! The host document contract.
//!
//! Mirrors talk to the document only through [`DocumentHost`]. The host owns
//! the content model: it is the only thing that changes source, execution
//! counts, or outputs. Callers may toggle the two visibility flags, move the
//! active position, and ask for a run.
//!
//! Cells are addressed by [`CellId`]. Operations that need a position take one
//! explicitly, and [`DocumentHost::index_of`] resolves it fresh every time,
//! since inserts and deletes elsewhere shift positions.
//!
//! Optional capabilities have default bodies returning
//! [`HostError::Unsupported`].

use pincell_types::{CellId, CellKind, CellSnapshot, ExecutionCount};

use crate::error::HostError;
use crate::flows::{CellFlow, RunOrigin, Subscription};
use crate::render::RenderTree;

pub trait DocumentHost {
    // =========================================================================
    // Cell model
    // =========================================================================

    /// Value copy of a cell's model and flags.
    fn cell(&self, id: CellId) -> Result<CellSnapshot, HostError>;

    fn execution_count(&self, id: CellId) -> Result<ExecutionCount, HostError> {
        Ok(self.cell(id)?.execution_count)
    }

    fn is_dirty(&self, id: CellId) -> Result<bool, HostError> {
        Ok(self.cell(id)?.dirty)
    }

    fn input_hidden(&self, id: CellId) -> Result<bool, HostError> {
        Ok(self.cell(id)?.input_hidden)
    }

    fn output_hidden(&self, id: CellId) -> Result<bool, HostError> {
        Ok(self.cell(id)?.output_hidden)
    }

    fn set_input_hidden(&mut self, id: CellId, hidden: bool) -> Result<(), HostError>;

    fn set_output_hidden(&mut self, id: CellId, hidden: bool) -> Result<(), HostError>;

    fn set_cell_kind(&mut self, id: CellId, kind: CellKind) -> Result<(), HostError> {
        let _ = (id, kind);
        Err(HostError::Unsupported("set_cell_kind"))
    }

    // =========================================================================
    // Positions
    // =========================================================================

    /// Current position of a cell, or None if it is no longer in the document.
    fn index_of(&self, id: CellId) -> Option<usize>;

    fn active_index(&self) -> usize;

    fn set_active_index(&mut self, index: usize) -> Result<(), HostError>;

    /// Insert a new code cell below the active one and make it active.
    fn insert_cell_below(&mut self) -> Result<CellId, HostError> {
        Err(HostError::Unsupported("insert_cell_below"))
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run the active cell. Completion is reported later through cell flows.
    fn run_active(&mut self, origin: RunOrigin) -> Result<(), HostError>;

    // =========================================================================
    // Rendering and change stream
    // =========================================================================

    /// Fresh rendering of a whole cell.
    fn render_cell(&self, id: CellId) -> Result<RenderTree, HostError>;

    /// Fresh rendering of a cell's output region.
    fn render_outputs(&self, id: CellId) -> Result<RenderTree, HostError>;

    /// Subscribe to cell flows matching a subject pattern.
    fn subscribe(&self, pattern: &str) -> Subscription<CellFlow>;
}
