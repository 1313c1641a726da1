//! The mirror's own render tree.
//!
//! ```text
//! div.pincell-mirror [data-kind] [data-mirror]
//! ├── div.pincell-toolbar          (see toolbar.rs)
//! └── div.pincell-body
//!     ├── div.cell                 clone of the canonical rendering, chrome stripped
//!     │   ├── div.input-area
//!     │   │   └── div.editor
//!     │   └── div.output-area.pincell-output
//!     └── div.pincell-placeholder  shown while the input is collapsed
//! ```
//!
//! The view is a presentation-only duplicate. It never feeds content back to
//! the canonical cell.

use pincell_host::{classes as engine, NodeId, RenderTree};
use pincell_types::{CellKind, ExecutionCount, MirrorId};

use crate::classes;
use crate::error::{MirrorError, Result};
use crate::observer::ObserverSet;
use crate::toolbar::{Toolbar, ToolbarAction};
use crate::watchers::{FocusWatcher, OutputWatcher};

/// Chrome the mirror has its own replacement for.
const STRIPPED_CHROME: [&str; 5] = [
    engine::CELL_HEADER,
    engine::CELL_FOOTER,
    engine::COLLAPSER,
    engine::INPUT_PROMPT,
    engine::OUTPUT_PROMPT,
];

pub struct MirrorView {
    mirror: MirrorId,
    tree: RenderTree,
    toolbar: Toolbar,
    body: NodeId,
    cell: NodeId,
    input: NodeId,
    editor: NodeId,
    output: NodeId,
    placeholder: NodeId,
    observers: ObserverSet,
    disposed: bool,
}

impl MirrorView {
    /// Build a mirror view around a clone of `canonical`.
    ///
    /// Pure with respect to the host: nothing outside the returned view is
    /// touched.
    pub fn build(
        mirror: MirrorId,
        kind: CellKind,
        count: ExecutionCount,
        canonical: &RenderTree,
        auto_run: bool,
    ) -> Result<Self> {
        let mut tree = RenderTree::new("div");
        let root = tree.root();
        tree.add_class(root, classes::MIRROR)?;
        tree.set_attr(root, "data-kind", kind.as_str())?;
        tree.set_attr(root, "data-mirror", &mirror.short())?;

        let toolbar = Toolbar::build(&mut tree, root, count, auto_run)?;
        let body = tree.element(root, "div", &[classes::BODY])?;
        let cell = tree.graft(body, canonical)?;

        for class in STRIPPED_CHROME {
            for node in tree.find_all_by_class(cell, class) {
                if tree.is_alive(node) {
                    tree.remove(node)?;
                }
            }
        }

        let input = tree
            .find_by_class(cell, engine::INPUT_AREA)
            .ok_or(MirrorError::MissingRegion(engine::INPUT_AREA))?;
        let editor = tree
            .find_by_class(input, engine::EDITOR)
            .ok_or(MirrorError::MissingRegion(engine::EDITOR))?;
        let output = tree
            .find_by_class(cell, engine::OUTPUT_AREA)
            .ok_or(MirrorError::MissingRegion(engine::OUTPUT_AREA))?;

        // The clone carries whatever visibility the canonical had; the
        // mirror always starts fully shown.
        tree.remove_class(input, engine::HIDDEN)?;
        tree.remove_class(output, engine::HIDDEN)?;
        tree.remove_class(editor, engine::FOCUSED)?;
        tree.add_class(output, classes::OUTPUT)?;

        let placeholder = tree.element(body, "div", &[classes::PLACEHOLDER, engine::HIDDEN])?;
        tree.set_text(placeholder, "…")?;

        let mut observers = ObserverSet::new();
        observers.observe(FocusWatcher::observer(editor, toolbar.count_display));
        observers.observe(OutputWatcher::observer(output));

        tree.take_mutations();
        Ok(Self {
            mirror,
            tree,
            toolbar,
            body,
            cell,
            input,
            editor,
            output,
            placeholder,
            observers,
            disposed: false,
        })
    }

    pub fn mirror(&self) -> MirrorId {
        self.mirror
    }

    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    pub fn toolbar(&self) -> &Toolbar {
        &self.toolbar
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(MirrorError::Disposed(self.mirror));
        }
        Ok(())
    }

    /// Run watchers until the tree is quiet.
    pub fn settle(&mut self, max_passes: usize) -> Result<usize> {
        if self.disposed {
            return Ok(0);
        }
        Ok(self.observers.settle(&mut self.tree, max_passes)?)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn count_text(&self) -> Result<String> {
        Ok(self
            .tree
            .text(self.toolbar.count_display)?
            .unwrap_or_default()
            .to_string())
    }

    pub fn shows_dirty(&self) -> Result<bool> {
        Ok(self.tree.has_class(self.toolbar.count_display, classes::DIRTY)?)
    }

    pub fn shows_focused(&self) -> Result<bool> {
        Ok(self.tree.has_class(self.toolbar.count_display, engine::FOCUSED)?)
    }

    pub fn input_collapsed(&self) -> Result<bool> {
        Ok(self.tree.has_class(self.input, engine::HIDDEN)?)
    }

    pub fn editor_text(&self) -> Result<String> {
        Ok(self.tree.text(self.editor)?.unwrap_or_default().to_string())
    }

    pub fn output_text(&self) -> Result<String> {
        Ok(self.tree.text_content(self.output)?)
    }

    pub fn cell_node(&self) -> NodeId {
        self.cell
    }

    pub fn body_node(&self) -> NodeId {
        self.body
    }

    /// Toolbar action under `node`, if any.
    pub fn hit(&self, node: NodeId) -> Option<ToolbarAction> {
        self.toolbar.hit(&self.tree, node)
    }

    // =========================================================================
    // Updates
    // =========================================================================

    pub fn show_count(&mut self, count: ExecutionCount) -> Result<()> {
        self.ensure_live()?;
        Ok(self.toolbar.show_count(&mut self.tree, count)?)
    }

    pub fn mark_dirty(&mut self, dirty: bool) -> Result<()> {
        self.ensure_live()?;
        Ok(self.toolbar.mark_dirty(&mut self.tree, dirty)?)
    }

    /// Hide or show the input region, swapping the toolbar buttons and the
    /// placeholder.
    pub fn set_input_collapsed(&mut self, collapsed: bool) -> Result<()> {
        self.ensure_live()?;
        self.tree.toggle_class(self.input, engine::HIDDEN, collapsed)?;
        self.tree.toggle_class(self.placeholder, engine::HIDDEN, !collapsed)?;
        self.toolbar.show_collapsed(&mut self.tree, collapsed)?;
        Ok(())
    }

    pub fn show_floating(&mut self, floating: bool) -> Result<()> {
        self.ensure_live()?;
        Ok(self.toolbar.show_floating(&mut self.tree, floating)?)
    }

    pub fn set_auto_run(&mut self, enabled: bool) -> Result<()> {
        self.ensure_live()?;
        Ok(self.toolbar.auto_run.set(&mut self.tree, enabled)?)
    }

    pub fn focus_editor(&mut self) -> Result<()> {
        self.ensure_live()?;
        Ok(self.tree.add_class(self.editor, engine::FOCUSED)?)
    }

    pub fn blur(&mut self) -> Result<()> {
        self.ensure_live()?;
        Ok(self.tree.remove_class(self.editor, engine::FOCUSED)?)
    }

    pub fn set_source_text(&mut self, source: &str) -> Result<()> {
        self.ensure_live()?;
        Ok(self.tree.set_text(self.editor, source)?)
    }

    /// Replace the output region with a fresh engine rendering.
    pub fn redraw_outputs(&mut self, fresh: &RenderTree) -> Result<()> {
        self.ensure_live()?;
        Ok(self.tree.replace_children_from(self.output, fresh)?)
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Tear down watchers and the auto-run switch, then remove the toolbar
    /// and root nodes. Idempotent.
    pub fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.observers.disconnect_all();
        self.toolbar.auto_run.dispose(&mut self.tree)?;
        if self.tree.is_alive(self.toolbar.node) {
            self.tree.remove(self.toolbar.node)?;
        }
        let root = self.tree.root();
        if self.tree.is_alive(root) {
            self.tree.remove(root)?;
        }
        self.tree.take_mutations();
        self.disposed = true;
        Ok(())
    }
}
