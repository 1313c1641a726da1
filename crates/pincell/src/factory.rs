//! Mirror creation.

use tracing::{info, warn};

use pincell_host::{cell_pattern, DocumentHost, SCHEDULED_PATTERN};
use pincell_types::{CellId, CellKind, MirrorId};

use crate::dock::DockState;
use crate::error::{MirrorError, Result};
use crate::mirror::MirrorCell;
use crate::panel::PanelManager;
use crate::scheduler::AutoRunScheduler;
use crate::view::MirrorView;

impl<H: DocumentHost> PanelManager<H> {
    /// Mirror an existing cell into the docked panel.
    ///
    /// Hides the canonical cell's input and output. Fails with
    /// [`MirrorError::Duplicate`] if the cell already has a live mirror. On
    /// any failure nothing is registered and the canonical flags are as they
    /// were.
    pub fn create_from_existing(&mut self, cell: CellId) -> Result<MirrorId> {
        if self.by_cell.contains_key(&cell) {
            return Err(MirrorError::Duplicate(cell));
        }

        let snapshot = self.host.cell(cell)?;
        let canonical = self.host.render_cell(cell)?;
        let id = MirrorId::new();
        let mut view = MirrorView::build(
            id,
            snapshot.kind,
            snapshot.execution_count,
            &canonical,
            self.config.auto_run,
        )?;
        view.mark_dirty(snapshot.dirty)?;
        view.settle(self.config.max_observer_passes)?;

        self.host.set_input_hidden(cell, true)?;
        if let Err(e) = self.host.set_output_hidden(cell, true) {
            if let Err(rollback) = self.host.set_input_hidden(cell, snapshot.input_hidden) {
                warn!(cell = %cell, error = %rollback, "failed to roll back input visibility");
            }
            return Err(e.into());
        }

        let flows = self.host.subscribe(&cell_pattern(cell));
        let scheduler =
            AutoRunScheduler::new(cell, self.config.debounce(), self.config.auto_run)
                .with_subscription(self.host.subscribe(SCHEDULED_PATTERN));

        let seq = self.next_seq;
        self.next_seq += 1;
        self.containers.dock(id, seq, view);
        self.mirrors.insert(
            id,
            MirrorCell {
                id,
                cell,
                kind: snapshot.kind,
                seq,
                count: snapshot.execution_count,
                dirty: snapshot.dirty,
                input_collapsed: false,
                dock: DockState::Docked,
                flows,
                scheduler,
            },
        );
        self.by_cell.insert(cell, id);

        info!(mirror = %id, cell = %cell, kind = %snapshot.kind, "mirror created");
        Ok(id)
    }

    /// Insert a new cell below the active one and mirror it.
    ///
    /// The document's active position is put back where it was, so the
    /// user's place is not disturbed.
    pub fn create_from_new(&mut self, kind: CellKind) -> Result<MirrorId> {
        let prior = self.host.active_index();
        let cell = self.host.insert_cell_below()?;

        let kind_set = if kind == CellKind::Code {
            Ok(())
        } else {
            self.host.set_cell_kind(cell, kind)
        };
        self.host.set_active_index(prior)?;
        if let Err(e) = kind_set {
            warn!(cell = %cell, %kind, "new cell left in document as code");
            return Err(e.into());
        }

        self.create_from_existing(cell)
    }
}
