//! The mirror's toolbar: execution-count display and command buttons.
//!
//! ```text
//! div.pincell-toolbar
//! ├── span.pincell-count          "[3]"  (+ .dirty, .focused)
//! ├── button[data-action=run]
//! ├── button[data-action=collapse_input]
//! ├── button[data-action=expand_input]   hidden until collapsed
//! ├── button[data-action=float]
//! ├── button[data-action=land]           hidden until floating
//! ├── button[data-action=toggle_auto_run]
//! └── button[data-action=close]
//! ```

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use pincell_host::{classes as engine, NodeId, RenderTree, TreeError};
use pincell_types::ExecutionCount;

use crate::classes;

/// Commands the toolbar exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ToolbarAction {
    Run,
    CollapseInput,
    ExpandInput,
    Float,
    Land,
    ToggleAutoRun,
    Close,
}

impl ToolbarAction {
    pub const ALL: [ToolbarAction; 7] = [
        Self::Run,
        Self::CollapseInput,
        Self::ExpandInput,
        Self::Float,
        Self::Land,
        Self::ToggleAutoRun,
        Self::Close,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::Run => "▶",
            Self::CollapseInput => "−",
            Self::ExpandInput => "+",
            Self::Float => "⇱",
            Self::Land => "⇲",
            Self::ToggleAutoRun => "auto",
            Self::Close => "×",
        }
    }
}

/// The input event that triggered a toolbar action.
///
/// Every handler suppresses it so document-level shortcuts never see it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UiEvent {
    default_prevented: bool,
    propagation_stopped: bool,
}

impl UiEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_suppressed(&self) -> bool {
        self.default_prevented && self.propagation_stopped
    }
}

/// The auto-run switch. Owns its button node and can be disposed on its own.
#[derive(Debug)]
pub struct AutoRunToggle {
    node: NodeId,
    enabled: bool,
    disposed: bool,
}

impl AutoRunToggle {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn set(&mut self, tree: &mut RenderTree, enabled: bool) -> Result<(), TreeError> {
        self.enabled = enabled;
        tree.set_attr(self.node, "aria-pressed", if enabled { "true" } else { "false" })
    }

    /// Remove the switch. Idempotent.
    pub fn dispose(&mut self, tree: &mut RenderTree) -> Result<(), TreeError> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        if tree.is_alive(self.node) {
            tree.remove(self.node)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Toolbar {
    pub node: NodeId,
    pub count_display: NodeId,
    collapse: NodeId,
    expand: NodeId,
    float: NodeId,
    land: NodeId,
    pub auto_run: AutoRunToggle,
}

impl Toolbar {
    /// Build the toolbar as the first child of `parent`.
    pub fn build(
        tree: &mut RenderTree,
        parent: NodeId,
        count: ExecutionCount,
        auto_run: bool,
    ) -> Result<Self, TreeError> {
        let node = tree.create("div");
        tree.add_class(node, classes::TOOLBAR)?;
        tree.insert_child(parent, 0, node)?;

        let count_display = tree.element(node, "span", &[classes::COUNT])?;
        tree.set_text(count_display, &count.to_string())?;

        add_button(tree, node, ToolbarAction::Run)?;
        let collapse = add_button(tree, node, ToolbarAction::CollapseInput)?;
        let expand = add_button(tree, node, ToolbarAction::ExpandInput)?;
        let float = add_button(tree, node, ToolbarAction::Float)?;
        let land = add_button(tree, node, ToolbarAction::Land)?;
        let toggle = add_button(tree, node, ToolbarAction::ToggleAutoRun)?;
        add_button(tree, node, ToolbarAction::Close)?;

        let mut toolbar = Self {
            node,
            count_display,
            collapse,
            expand,
            float,
            land,
            auto_run: AutoRunToggle {
                node: toggle,
                enabled: false,
                disposed: false,
            },
        };
        toolbar.auto_run.set(tree, auto_run)?;
        toolbar.show_collapsed(tree, false)?;
        toolbar.show_floating(tree, false)?;
        Ok(toolbar)
    }

    /// The action bound to `node` or its nearest button ancestor.
    pub fn hit(&self, tree: &RenderTree, node: NodeId) -> Option<ToolbarAction> {
        let mut cursor = Some(node);
        while let Some(n) = cursor {
            if n == self.node {
                return None;
            }
            if let Ok(Some(action)) = tree.attr(n, "data-action") {
                return action.parse().ok();
            }
            cursor = tree.parent(n).ok().flatten();
        }
        None
    }

    pub fn show_count(&self, tree: &mut RenderTree, count: ExecutionCount) -> Result<(), TreeError> {
        tree.set_text(self.count_display, &count.to_string())
    }

    pub fn mark_dirty(&self, tree: &mut RenderTree, dirty: bool) -> Result<(), TreeError> {
        tree.toggle_class(self.count_display, classes::DIRTY, dirty)
    }

    /// Swap collapse/expand button visibility.
    pub fn show_collapsed(&self, tree: &mut RenderTree, collapsed: bool) -> Result<(), TreeError> {
        tree.toggle_class(self.collapse, engine::HIDDEN, collapsed)?;
        tree.toggle_class(self.expand, engine::HIDDEN, !collapsed)
    }

    /// Swap float/land button visibility.
    pub fn show_floating(&self, tree: &mut RenderTree, floating: bool) -> Result<(), TreeError> {
        tree.toggle_class(self.float, engine::HIDDEN, floating)?;
        tree.toggle_class(self.land, engine::HIDDEN, !floating)
    }
}

fn add_button(
    tree: &mut RenderTree,
    toolbar: NodeId,
    action: ToolbarAction,
) -> Result<NodeId, TreeError> {
    let button = tree.element(toolbar, "button", &[classes::BUTTON])?;
    tree.set_attr(button, "data-action", &action.to_string())?;
    tree.set_text(button, action.label())?;
    Ok(button)
}
