//! Live, dockable mirrors of notebook cells.
//!
//! A mirror is a second, interactive rendering of one canonical cell, kept in
//! a side panel or a floating window while the canonical cell stays in the
//! document. The [`PanelManager`] owns every mirror for one document:
//!
//! - the factory clones the canonical rendering and hides the original
//! - the bridge applies canonical changes (count, dirty, source, outputs) to
//!   the mirror view, in the order the host publishes them
//! - watchers correct drift from the rendering engine's own redraws
//! - the scheduler debounces auto-runs triggered by other cells
//! - the toolbar and dock state machine handle user commands
//!
//! ```ignore
//! let mut panel = PanelManager::new(notebook, MirrorConfig::default());
//! let mirror = panel.create_from_existing(cell)?;
//! panel.dispatch(mirror, ToolbarAction::Float, &mut UiEvent::new())?;
//! panel.pump(Instant::now())?;
//! ```

mod bridge;
pub mod config;
pub mod dock;
mod error;
mod factory;
pub mod mirror;
pub mod observer;
pub mod panel;
pub mod scheduler;
pub mod toolbar;
pub mod view;
pub mod watchers;

pub use bridge::BridgeEffect;
pub use config::{ConfigError, MirrorConfig};
pub use dock::{Containers, DockState, FloatingWindow};
pub use error::{MirrorError, Result};
pub use mirror::{MirrorCell, MirrorSummary};
pub use panel::{PanelManager, PanelState};
pub use toolbar::{ToolbarAction, UiEvent};
pub use view::MirrorView;

/// Classes the mirror adds on top of the engine's vocabulary.
pub mod classes {
    pub const MIRROR: &str = "pincell-mirror";
    pub const TOOLBAR: &str = "pincell-toolbar";
    pub const COUNT: &str = "pincell-count";
    pub const BUTTON: &str = "pincell-button";
    pub const BODY: &str = "pincell-body";
    /// Output region of a mirror, styled apart from the document's.
    pub const OUTPUT: &str = "pincell-output";
    pub const PLACEHOLDER: &str = "pincell-placeholder";
    pub const DIRTY: &str = "dirty";
}
