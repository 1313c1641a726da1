//! Canonical-to-mirror synchronization.
//!
//! Each mirror holds a subscription to `cell.<hex>.>` for its canonical cell.
//! [`PanelManager::pump`] drains it and applies every event here, in publish
//! order, with no coalescing.
//!
//! The canonical cell can be gone while events published before its removal
//! are still queued. Those events skip the host lookups they need; the
//! queued `Removed` is what disposes the mirror.

use serde::Serialize;
use tracing::{debug, trace};

use pincell_host::{CellFlow, DocumentHost, HostError};
use pincell_types::{CellId, ExecutionCount, MirrorId};

use crate::error::Result;
use crate::panel::PanelManager;

/// What applying one canonical event did to the mirror.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum BridgeEffect {
    CountUpdated {
        count: ExecutionCount,
        /// The canonical output was re-hidden because its input is hidden.
        rehid_output: bool,
    },
    DirtyUpdated { dirty: bool },
    SourceUpdated,
    OutputsRedrawn,
    Disposed,
    /// Not something the mirror reflects.
    Ignored,
}

impl<H: DocumentHost> PanelManager<H> {
    pub(crate) fn apply_flow(&mut self, id: MirrorId, flow: &CellFlow) -> Result<BridgeEffect> {
        let cell = self.live_mirror(id)?.cell;
        if flow.cell_id() != cell {
            return Ok(BridgeEffect::Ignored);
        }
        trace!(mirror = %id, kind = flow.kind(), "applying cell flow");

        let effect = match flow {
            CellFlow::ExecutionCountChanged { count, .. } => {
                self.view_mut(id)?.show_count(*count)?;
                self.live_mirror_mut(id)?.count = *count;

                let rehid_output = match self.rehide_output(cell) {
                    Ok(rehid) => rehid,
                    Err(HostError::CellNotFound(_)) => {
                        debug!(mirror = %id, cell = %cell, "canonical cell gone, removal pending");
                        false
                    }
                    Err(e) => return Err(e.into()),
                };
                BridgeEffect::CountUpdated {
                    count: *count,
                    rehid_output,
                }
            }
            CellFlow::DirtyChanged { dirty, .. } => {
                self.view_mut(id)?.mark_dirty(*dirty)?;
                self.live_mirror_mut(id)?.dirty = *dirty;
                BridgeEffect::DirtyUpdated { dirty: *dirty }
            }
            CellFlow::SourceChanged { source, .. } => {
                self.view_mut(id)?.set_source_text(source)?;
                BridgeEffect::SourceUpdated
            }
            CellFlow::OutputsChanged { .. } => {
                let fresh = match self.host.render_outputs(cell) {
                    Ok(fresh) => fresh,
                    Err(HostError::CellNotFound(_)) => {
                        debug!(mirror = %id, cell = %cell, "canonical cell gone, removal pending");
                        return Ok(BridgeEffect::Ignored);
                    }
                    Err(e) => return Err(e.into()),
                };
                let passes = self.config.max_observer_passes;
                let view = self.view_mut(id)?;
                view.redraw_outputs(&fresh)?;
                view.settle(passes)?;
                BridgeEffect::OutputsRedrawn
            }
            CellFlow::Removed { .. } => {
                debug!(mirror = %id, cell = %cell, "canonical cell removed");
                self.dispose(id)?;
                BridgeEffect::Disposed
            }
            CellFlow::ExecutionScheduled { .. } => BridgeEffect::Ignored,
        };
        Ok(effect)
    }

    /// The host's result redraw may have re-shown output on a cell whose
    /// input is hidden. Hide it again.
    fn rehide_output(&mut self, cell: CellId) -> std::result::Result<bool, HostError> {
        let rehide = self.host.input_hidden(cell)? && !self.host.output_hidden(cell)?;
        if rehide {
            self.host.set_output_hidden(cell, true)?;
        }
        Ok(rehide)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use pincell_host::{MemoryNotebook, RunOrigin};
    use pincell_types::CellId;

    use super::*;
    use crate::config::MirrorConfig;

    fn setup() -> (PanelManager<MemoryNotebook>, CellId, MirrorId) {
        let mut nb = MemoryNotebook::default();
        let a = nb.add_code_cell("40 + 2");
        let mut p = PanelManager::new(nb, MirrorConfig::default());
        let m = p.create_from_existing(a).unwrap();
        (p, a, m)
    }

    #[test]
    fn test_events_applied_in_order() {
        let (mut p, a, m) = setup();
        p.host_mut().run_cell(a, RunOrigin::User).unwrap();
        p.host_mut().complete_all();
        let effects: Vec<BridgeEffect> =
            p.pump(Instant::now()).unwrap().into_iter().map(|(_, e)| e).collect();
        assert_eq!(
            effects,
            vec![
                BridgeEffect::Ignored,
                BridgeEffect::CountUpdated {
                    count: ExecutionCount::PENDING,
                    rehid_output: false
                },
                BridgeEffect::CountUpdated {
                    count: ExecutionCount::settled(1),
                    rehid_output: true
                },
                BridgeEffect::OutputsRedrawn,
            ]
        );
        let summary = p.summary(m).unwrap();
        assert_eq!(summary.execution, "[1]");
        assert_eq!(summary.output, "40 + 2");
        assert!(p.host().cell(a).unwrap().output_hidden);
    }

    #[test]
    fn test_dirty_and_source_mirrored() {
        let (mut p, a, m) = setup();
        p.host_mut().edit_source(a, "x = 1").unwrap();
        p.pump(Instant::now()).unwrap();
        let summary = p.summary(m).unwrap();
        assert!(summary.dirty);
        assert_eq!(summary.source, "x = 1");
        assert!(p.mirror(m).unwrap().is_dirty());

        p.host_mut().run_cell(a, RunOrigin::User).unwrap();
        p.pump(Instant::now()).unwrap();
        assert!(!p.summary(m).unwrap().dirty);
    }

    #[test]
    fn test_removed_cell_disposes_mirror() {
        let (mut p, a, m) = setup();
        p.host_mut().remove_cell(a).unwrap();
        let effects = p.pump(Instant::now()).unwrap();
        assert_eq!(effects, vec![(m, BridgeEffect::Disposed)]);
        assert!(p.mirror(m).is_none());
        assert!(p.is_disposed(m));
        assert!(p.view(m).is_none());
    }

    #[test]
    fn test_events_queued_before_removal_do_not_fail() {
        let (mut p, a, m) = setup();
        p.host_mut().run_cell(a, RunOrigin::User).unwrap();
        p.host_mut().complete_all();
        p.host_mut().remove_cell(a).unwrap();
        let effects: Vec<BridgeEffect> =
            p.pump(Instant::now()).unwrap().into_iter().map(|(_, e)| e).collect();
        assert_eq!(
            effects,
            vec![
                BridgeEffect::Ignored,
                BridgeEffect::CountUpdated {
                    count: ExecutionCount::PENDING,
                    rehid_output: false
                },
                BridgeEffect::CountUpdated {
                    count: ExecutionCount::settled(1),
                    rehid_output: false
                },
                BridgeEffect::Ignored,
                BridgeEffect::Disposed,
            ]
        );
        assert!(p.is_disposed(m));
    }

    #[test]
    fn test_other_cell_events_not_applied() {
        let (mut p, _, _) = setup();
        let b = p.host_mut().add_code_cell("1");
        p.host_mut().edit_source(b, "2").unwrap();
        assert!(p.pump(Instant::now()).unwrap().is_empty());
    }
}
