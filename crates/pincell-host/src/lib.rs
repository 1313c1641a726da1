//! Host-side collaborators for pincell.
//!
//! Everything a mirror needs from the outside world lives here:
//!
//! - [`DocumentHost`]: the contract with the notebook document (cell flags,
//!   active position, run command, rendering, change stream)
//! - [`FlowBus`] / [`CellFlow`]: the identity-keyed change stream
//! - [`RenderTree`]: what the rendering engine produces and observers watch
//! - [`MemoryNotebook`]: a complete in-memory host

pub mod engine;
mod error;
pub mod flows;
mod host;
pub mod notebook;
pub mod render;

pub use engine::{classes, Renderer};
pub use error::{HostError, TreeError};
pub use flows::{
    cell_pattern, matches_pattern, CellFlow, FlowBus, FlowMessage, HasSubject, RunOrigin,
    Subscription, SCHEDULED_PATTERN,
};
pub use host::DocumentHost;
pub use notebook::{MemoryNotebook, DEFAULT_FLOW_CAPACITY};
pub use render::{MutationRecord, NodeId, RenderTree};
