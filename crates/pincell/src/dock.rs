//! Dock/float state machine.
//!
//! A mirror's view lives in exactly one container: the docked panel or one
//! floating window. Moves take the view out of one container and put it in
//! the other within a single `&mut` call, so there is no observable moment
//! where it is in neither.

use serde::{Deserialize, Serialize};

use pincell_types::{CellKind, MirrorId};

use crate::error::{MirrorError, Result};
use crate::view::MirrorView;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DockState {
    #[default]
    Docked,
    /// `index` staggers windows of the same kind so they don't overlap.
    Floating { index: usize },
}

impl DockState {
    pub fn is_floating(&self) -> bool {
        matches!(self, DockState::Floating { .. })
    }
}

struct DockSlot {
    mirror: MirrorId,
    seq: u64,
    view: MirrorView,
}

pub struct FloatingWindow {
    mirror: MirrorId,
    seq: u64,
    kind: CellKind,
    index: usize,
    step: u32,
    view: MirrorView,
}

impl FloatingWindow {
    pub fn mirror(&self) -> MirrorId {
        self.mirror
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Window position shift, equal on both axes.
    pub fn offset(&self) -> (u32, u32) {
        let d = self.step.saturating_mul(self.index as u32);
        (d, d)
    }

    pub fn view(&self) -> &MirrorView {
        &self.view
    }
}

/// The docked panel (in creation order) plus every floating window.
#[derive(Default)]
pub struct Containers {
    docked: Vec<DockSlot>,
    floating: Vec<FloatingWindow>,
}

impl Containers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a view into the docked panel at its creation-order slot.
    pub fn dock(&mut self, mirror: MirrorId, seq: u64, view: MirrorView) {
        let at = self.docked.partition_point(|s| s.seq < seq);
        self.docked.insert(at, DockSlot { mirror, seq, view });
    }

    /// Move a docked view into a new floating window. Returns its stacking
    /// index. Floating an already floating mirror returns its current index.
    pub fn float(&mut self, mirror: MirrorId, kind: CellKind, step: u32) -> Result<usize> {
        if let Some(w) = self.floating.iter().find(|w| w.mirror == mirror) {
            return Ok(w.index);
        }
        let pos = self
            .docked
            .iter()
            .position(|s| s.mirror == mirror)
            .ok_or(MirrorError::Unmounted(mirror))?;
        let index = 1 + self.floating.iter().filter(|w| w.kind == kind).count();

        self.docked[pos].view.show_floating(true)?;
        let slot = self.docked.remove(pos);
        self.floating.push(FloatingWindow {
            mirror,
            seq: slot.seq,
            kind,
            index,
            step,
            view: slot.view,
        });
        tracing::debug!(mirror = %mirror, index, "mirror floated");
        Ok(index)
    }

    /// Move a floating view back into the docked panel. Landing a docked
    /// mirror is a no-op.
    pub fn land(&mut self, mirror: MirrorId) -> Result<()> {
        if self.docked.iter().any(|s| s.mirror == mirror) {
            return Ok(());
        }
        let pos = self
            .floating
            .iter()
            .position(|w| w.mirror == mirror)
            .ok_or(MirrorError::Unmounted(mirror))?;

        self.floating[pos].view.show_floating(false)?;
        let window = self.floating.remove(pos);
        self.dock(mirror, window.seq, window.view);
        tracing::debug!(mirror = %mirror, "mirror landed");
        Ok(())
    }

    /// Remove a view from whichever container holds it.
    pub fn take(&mut self, mirror: MirrorId) -> Option<MirrorView> {
        if let Some(pos) = self.docked.iter().position(|s| s.mirror == mirror) {
            return Some(self.docked.remove(pos).view);
        }
        let pos = self.floating.iter().position(|w| w.mirror == mirror)?;
        Some(self.floating.remove(pos).view)
    }

    pub fn state(&self, mirror: MirrorId) -> Option<DockState> {
        if self.docked.iter().any(|s| s.mirror == mirror) {
            return Some(DockState::Docked);
        }
        self.floating
            .iter()
            .find(|w| w.mirror == mirror)
            .map(|w| DockState::Floating { index: w.index })
    }

    pub fn view(&self, mirror: MirrorId) -> Option<&MirrorView> {
        self.docked
            .iter()
            .find(|s| s.mirror == mirror)
            .map(|s| &s.view)
            .or_else(|| {
                self.floating
                    .iter()
                    .find(|w| w.mirror == mirror)
                    .map(|w| &w.view)
            })
    }

    pub fn view_mut(&mut self, mirror: MirrorId) -> Option<&mut MirrorView> {
        if let Some(slot) = self.docked.iter_mut().find(|s| s.mirror == mirror) {
            return Some(&mut slot.view);
        }
        self.floating
            .iter_mut()
            .find(|w| w.mirror == mirror)
            .map(|w| &mut w.view)
    }

    /// Docked mirrors in panel order.
    pub fn docked(&self) -> impl Iterator<Item = MirrorId> + '_ {
        self.docked.iter().map(|s| s.mirror)
    }

    pub fn docked_len(&self) -> usize {
        self.docked.len()
    }

    pub fn floating(&self) -> &[FloatingWindow] {
        &self.floating
    }

    pub fn window(&self, mirror: MirrorId) -> Option<&FloatingWindow> {
        self.floating.iter().find(|w| w.mirror == mirror)
    }

    /// How many containers hold this mirror. Always 0 or 1.
    pub fn placements(&self, mirror: MirrorId) -> usize {
        self.docked.iter().filter(|s| s.mirror == mirror).count()
            + self.floating.iter().filter(|w| w.mirror == mirror).count()
    }
}
