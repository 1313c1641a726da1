//! The panel manager: every mirror of one document, and the command surface.
//!
//! All mirror state that used to be process-wide (creation counters,
//! floating stacking) lives on [`PanelManager`], so separate documents get
//! separate managers.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pincell_host::{CellFlow, DocumentHost, HostError, NodeId, RunOrigin};
use pincell_types::{CellId, MirrorId};

use crate::bridge::BridgeEffect;
use crate::config::MirrorConfig;
use crate::dock::{Containers, DockState, FloatingWindow};
use crate::error::{MirrorError, Result};
use crate::mirror::{MirrorCell, MirrorSummary};
use crate::toolbar::{ToolbarAction, UiEvent};
use crate::view::MirrorView;

/// What the docked panel should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "panel", content = "mirrors", rename_all = "snake_case")]
pub enum PanelState {
    /// No docked mirror: show the empty-state placeholder.
    Empty,
    Occupied(usize),
}

pub struct PanelManager<H: DocumentHost> {
    pub(crate) host: H,
    pub(crate) config: MirrorConfig,
    /// Live mirrors only. Disposal drops the record.
    pub(crate) mirrors: IndexMap<MirrorId, MirrorCell>,
    pub(crate) disposed: HashSet<MirrorId>,
    pub(crate) by_cell: HashMap<CellId, MirrorId>,
    pub(crate) containers: Containers,
    pub(crate) next_seq: u64,
}

impl<H: DocumentHost> PanelManager<H> {
    pub fn new(host: H, config: MirrorConfig) -> Self {
        Self {
            host,
            config,
            mirrors: IndexMap::new(),
            disposed: HashSet::new(),
            by_cell: HashMap::new(),
            containers: Containers::new(),
            next_seq: 0,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn into_host(self) -> H {
        self.host
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// The live mirror with this ID. None once disposed.
    pub fn mirror(&self, id: MirrorId) -> Option<&MirrorCell> {
        self.mirrors.get(&id)
    }

    pub fn is_disposed(&self, id: MirrorId) -> bool {
        self.disposed.contains(&id)
    }

    /// The live mirror of `cell`, if any.
    pub fn mirror_for(&self, cell: CellId) -> Option<MirrorId> {
        self.by_cell.get(&cell).copied()
    }

    pub fn view(&self, id: MirrorId) -> Option<&MirrorView> {
        self.containers.view(id)
    }

    pub fn window(&self, id: MirrorId) -> Option<&FloatingWindow> {
        self.containers.window(id)
    }

    pub fn containers(&self) -> &Containers {
        &self.containers
    }

    /// Live mirrors in creation order.
    pub fn live(&self) -> impl Iterator<Item = &MirrorCell> + '_ {
        self.mirrors.values()
    }

    pub fn panel_state(&self) -> PanelState {
        match self.containers.docked_len() {
            0 => PanelState::Empty,
            n => PanelState::Occupied(n),
        }
    }

    fn missing(&self, id: MirrorId) -> MirrorError {
        if self.disposed.contains(&id) {
            MirrorError::Disposed(id)
        } else {
            MirrorError::UnknownMirror(id)
        }
    }

    pub(crate) fn live_mirror(&self, id: MirrorId) -> Result<&MirrorCell> {
        self.mirrors.get(&id).ok_or_else(|| self.missing(id))
    }

    pub(crate) fn live_mirror_mut(&mut self, id: MirrorId) -> Result<&mut MirrorCell> {
        let missing = self.missing(id);
        self.mirrors.get_mut(&id).ok_or(missing)
    }

    pub(crate) fn view_mut(&mut self, id: MirrorId) -> Result<&mut MirrorView> {
        self.containers
            .view_mut(id)
            .ok_or(MirrorError::Unmounted(id))
    }

    pub fn summary(&self, id: MirrorId) -> Result<MirrorSummary> {
        let mirror = self.live_mirror(id)?;
        let view = self.containers.view(id).ok_or(MirrorError::Unmounted(id))?;
        Ok(MirrorSummary {
            mirror: id,
            cell: mirror.cell,
            kind: mirror.kind,
            execution: view.count_text()?,
            dirty: view.shows_dirty()?,
            focused: view.shows_focused()?,
            input_collapsed: view.input_collapsed()?,
            auto_run: mirror.auto_run(),
            dock: mirror.dock,
            offset: self.containers.window(id).map(FloatingWindow::offset),
            source: view.editor_text()?,
            output: view.output_text()?,
        })
    }

    pub fn summaries(&self) -> Result<Vec<MirrorSummary>> {
        self.live().map(|m| self.summary(m.id)).collect()
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Apply queued canonical changes to every mirror, in publish order, and
    /// feed the auto-run schedulers.
    ///
    /// A failure on one mirror leaves the rest of its queue for the next
    /// pump and does not stop the other mirrors. The first failure is
    /// returned once every mirror has been visited.
    pub fn pump(&mut self, now: Instant) -> Result<Vec<(MirrorId, BridgeEffect)>> {
        let mut effects = Vec::new();
        let mut first_err = None;
        let ids: Vec<MirrorId> = self.mirrors.keys().copied().collect();
        for id in ids {
            if let Err(e) = self.drain_flows(id, &mut effects) {
                warn!(mirror = %id, error = %e, "failed to apply cell flow");
                first_err.get_or_insert(e);
            }
            if let Some(mirror) = self.mirrors.get_mut(&id) {
                mirror.scheduler.pump(now);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(effects),
        }
    }

    fn drain_flows(&mut self, id: MirrorId, effects: &mut Vec<(MirrorId, BridgeEffect)>) -> Result<()> {
        while let Some(flow) = self.next_flow(id) {
            let effect = self.apply_flow(id, &flow)?;
            effects.push((id, effect));
        }
        Ok(())
    }

    fn next_flow(&mut self, id: MirrorId) -> Option<CellFlow> {
        let mirror = self.mirrors.get_mut(&id)?;
        mirror.flows.try_recv().map(|msg| msg.payload)
    }

    /// Fire every auto-run whose deadline has passed. Returns the mirrors
    /// that ran.
    ///
    /// Each scheduler is polled right before its run, so a failure never
    /// clears another mirror's deadline. A mirror whose canonical cell is
    /// already gone is skipped; its queued removal disposes it on the next
    /// pump. Other failures are returned after every due mirror has run.
    pub fn tick(&mut self, now: Instant) -> Result<Vec<MirrorId>> {
        let mut fired = Vec::new();
        let mut first_err = None;
        let ids: Vec<MirrorId> = self.mirrors.keys().copied().collect();
        for id in ids {
            let due = self
                .mirrors
                .get_mut(&id)
                .is_some_and(|m| m.scheduler.poll(now));
            if !due {
                continue;
            }
            info!(mirror = %id, "auto-run firing");
            match self.execute(id, true, RunOrigin::AutoRun) {
                Ok(()) => fired.push(id),
                Err(MirrorError::CellNotFound(cell)) => {
                    warn!(mirror = %id, cell = %cell, "auto-run skipped, canonical cell gone");
                }
                Err(e) => {
                    warn!(mirror = %id, error = %e, "auto-run failed");
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(fired),
        }
    }

    /// Earliest armed auto-run deadline across all mirrors.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.live().filter_map(|m| m.scheduler.next_deadline()).min()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Run the canonical cell through the document's run command.
    ///
    /// The cell's position is looked up fresh, since it drifts as cells are
    /// inserted or removed elsewhere. With `restore`, the document's active
    /// position is put back afterwards, even if the run failed.
    pub fn execute(&mut self, id: MirrorId, restore: bool, origin: RunOrigin) -> Result<()> {
        let cell = self.live_mirror(id)?.cell;
        let prior = restore.then(|| self.host.active_index());
        let index = self
            .host
            .index_of(cell)
            .ok_or(MirrorError::CellNotFound(cell))?;
        self.host.set_active_index(index)?;

        let result = self.blur_and_run(id, origin);

        let restored = match prior {
            Some(p) => self.host.set_active_index(p).map_err(MirrorError::from),
            None => Ok(()),
        };
        debug!(mirror = %id, cell = %cell, index, ?origin, "executed");
        result.and(restored)
    }

    fn blur_and_run(&mut self, id: MirrorId, origin: RunOrigin) -> Result<()> {
        let passes = self.config.max_observer_passes;
        let view = self.view_mut(id)?;
        view.blur()?;
        view.settle(passes)?;
        self.host.run_active(origin)?;
        Ok(())
    }

    /// Handle a toolbar action. The triggering event is always suppressed;
    /// errors are not.
    pub fn dispatch(&mut self, id: MirrorId, action: ToolbarAction, event: &mut UiEvent) -> Result<()> {
        event.prevent_default();
        event.stop_propagation();
        debug!(mirror = %id, %action, "toolbar action");
        match action {
            ToolbarAction::Run => self.execute(id, false, RunOrigin::User),
            ToolbarAction::CollapseInput => self.set_input_collapsed(id, true),
            ToolbarAction::ExpandInput => self.set_input_collapsed(id, false),
            ToolbarAction::Float => self.float(id).map(|_| ()),
            ToolbarAction::Land => self.land(id),
            ToolbarAction::ToggleAutoRun => {
                let enabled = self.live_mirror(id)?.auto_run();
                self.set_auto_run(id, !enabled)
            }
            ToolbarAction::Close => self.close(id),
        }
    }

    /// Dispatch whatever toolbar button `node` belongs to. Returns the action,
    /// or None if the node is not a button.
    pub fn click(&mut self, id: MirrorId, node: NodeId, event: &mut UiEvent) -> Result<Option<ToolbarAction>> {
        let Some(action) = self.containers.view(id).and_then(|v| v.hit(node)) else {
            return Ok(None);
        };
        self.dispatch(id, action, event)?;
        Ok(Some(action))
    }

    pub fn set_input_collapsed(&mut self, id: MirrorId, collapsed: bool) -> Result<()> {
        self.live_mirror(id)?;
        self.view_mut(id)?.set_input_collapsed(collapsed)?;
        self.live_mirror_mut(id)?.input_collapsed = collapsed;
        Ok(())
    }

    pub fn set_auto_run(&mut self, id: MirrorId, enabled: bool) -> Result<()> {
        self.live_mirror(id)?;
        self.view_mut(id)?.set_auto_run(enabled)?;
        self.live_mirror_mut(id)?.scheduler.set_enabled(enabled);
        info!(mirror = %id, enabled, "auto-run toggled");
        Ok(())
    }

    pub fn focus_editor(&mut self, id: MirrorId) -> Result<()> {
        self.live_mirror(id)?;
        let passes = self.config.max_observer_passes;
        let view = self.view_mut(id)?;
        view.focus_editor()?;
        view.settle(passes)?;
        Ok(())
    }

    pub fn blur_editor(&mut self, id: MirrorId) -> Result<()> {
        self.live_mirror(id)?;
        let passes = self.config.max_observer_passes;
        let view = self.view_mut(id)?;
        view.blur()?;
        view.settle(passes)?;
        Ok(())
    }

    /// Docked to floating. Returns the stacking index.
    pub fn float(&mut self, id: MirrorId) -> Result<usize> {
        let kind = self.live_mirror(id)?.kind;
        let index = self.containers.float(id, kind, self.config.float_offset)?;
        self.live_mirror_mut(id)?.dock = DockState::Floating { index };
        info!(mirror = %id, index, "mirror floating");
        Ok(index)
    }

    /// Floating back to docked.
    pub fn land(&mut self, id: MirrorId) -> Result<()> {
        self.live_mirror(id)?;
        self.containers.land(id)?;
        self.live_mirror_mut(id)?.dock = DockState::Docked;
        info!(mirror = %id, "mirror docked");
        Ok(())
    }

    /// Make the canonical cell fully visible again, then dispose the mirror.
    ///
    /// A canonical cell already gone from the document is skipped.
    pub fn close(&mut self, id: MirrorId) -> Result<()> {
        let cell = self.live_mirror(id)?.cell;
        let restore = self
            .host
            .set_input_hidden(cell, false)
            .and_then(|()| self.host.set_output_hidden(cell, false));
        match restore {
            Ok(()) => {}
            Err(HostError::CellNotFound(_)) => {
                warn!(mirror = %id, cell = %cell, "canonical cell gone, nothing to restore");
            }
            Err(e) => return Err(e.into()),
        }
        self.dispose(id)
    }

    /// Tear down the mirror: cancel its subscriptions and timer, disconnect
    /// its watchers, dispose the auto-run switch, and remove its view from
    /// whichever container holds it.
    ///
    /// Idempotent. The canonical cell is not touched. Only the ID is kept
    /// afterwards, so later commands can report [`MirrorError::Disposed`].
    pub fn dispose(&mut self, id: MirrorId) -> Result<()> {
        let Some(mut mirror) = self.mirrors.shift_remove(&id) else {
            return match self.missing(id) {
                MirrorError::Disposed(_) => Ok(()),
                unknown => Err(unknown),
            };
        };
        self.disposed.insert(id);
        mirror.scheduler.cancel();
        let cell = mirror.cell;
        if self.by_cell.get(&cell) == Some(&id) {
            self.by_cell.remove(&cell);
        }
        if let Some(mut view) = self.containers.take(id) {
            view.dispose()?;
        }
        info!(mirror = %id, cell = %cell, "mirror disposed");
        Ok(())
    }

    /// Dispose every live mirror.
    pub fn dispose_all(&mut self) -> Result<()> {
        let ids: Vec<MirrorId> = self.live().map(|m| m.id).collect();
        for id in ids {
            self.dispose(id)?;
        }
        Ok(())
    }
}
