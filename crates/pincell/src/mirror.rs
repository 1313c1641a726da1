//! The mirror record: one live twin of one canonical cell.
//!
//! A record exists only while its mirror is live. Disposal drops it, which
//! cancels its subscriptions.

use serde::{Deserialize, Serialize};

use pincell_host::{CellFlow, Subscription};
use pincell_types::{CellId, CellKind, ExecutionCount, MirrorId};

use crate::dock::DockState;
use crate::scheduler::AutoRunScheduler;

pub struct MirrorCell {
    pub(crate) id: MirrorId,
    /// Non-owning: disposing the mirror never touches the cell's existence.
    pub(crate) cell: CellId,
    pub(crate) kind: CellKind,
    /// Creation order, used to put a landed mirror back in its docked slot.
    pub(crate) seq: u64,
    pub(crate) count: ExecutionCount,
    pub(crate) dirty: bool,
    pub(crate) input_collapsed: bool,
    pub(crate) dock: DockState,
    /// Canonical change stream for this cell.
    pub(crate) flows: Subscription<CellFlow>,
    pub(crate) scheduler: AutoRunScheduler,
}

impl MirrorCell {
    pub fn id(&self) -> MirrorId {
        self.id
    }

    pub fn cell(&self) -> CellId {
        self.cell
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn count(&self) -> ExecutionCount {
        self.count
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn input_collapsed(&self) -> bool {
        self.input_collapsed
    }

    pub fn dock(&self) -> DockState {
        self.dock
    }

    pub fn auto_run(&self) -> bool {
        self.scheduler.is_enabled()
    }

    pub fn scheduler(&self) -> &AutoRunScheduler {
        &self.scheduler
    }
}

/// Serializable view of one live mirror.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorSummary {
    pub mirror: MirrorId,
    pub cell: CellId,
    pub kind: CellKind,
    /// As shown in the toolbar: `[n]` or `[*]`.
    pub execution: String,
    pub dirty: bool,
    pub focused: bool,
    pub input_collapsed: bool,
    pub auto_run: bool,
    pub dock: DockState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<(u32, u32)>,
    pub source: String,
    pub output: String,
}
