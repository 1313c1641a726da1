//! Cell flow bus: the host document's change stream.
//!
//! The host publishes a [`CellFlow`] for every change to a cell's content
//! model. Subjects carry the cell identity so consumers can subscribe to one
//! cell (`cell.<hex>.>`) or to one kind of change across the whole document
//! (`cell.*.scheduled`).
//!
//! # Pattern Matching
//!
//! Patterns use dot-separated tokens with wildcards:
//! - `*` matches exactly one token: `cell.*.dirty` matches `cell.ab12.dirty`
//! - `>` matches one or more tokens (only at end): `cell.ab12.>` matches every
//!   change of cell `ab12`
//! - Exact match: `cell.ab12.source` only matches itself
//!
//! Delivery order per subscription is publish order. A subscription is
//! cancelled by dropping it.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use pincell_types::{CellId, ExecutionCount};

/// Subject pattern matching every execution-scheduled event in the document.
pub const SCHEDULED_PATTERN: &str = "cell.*.scheduled";

/// Subject pattern matching every change of one cell.
pub fn cell_pattern(cell_id: CellId) -> String {
    format!("cell.{}.>", cell_id.to_hex())
}

// ============================================================================
// Pattern Matching
// ============================================================================

/// Check if a subject matches a pattern.
///
/// ```ignore
/// assert!(matches_pattern("cell.*.dirty", "cell.ab12.dirty"));
/// assert!(matches_pattern("cell.ab12.>", "cell.ab12.source"));
/// assert!(!matches_pattern("cell.*", "cell.ab12.dirty"));
/// ```
pub fn matches_pattern(pattern: &str, subject: &str) -> bool {
    let pattern_tokens: Vec<&str> = pattern.split('.').collect();
    let subject_tokens: Vec<&str> = subject.split('.').collect();

    let mut pi = 0;
    let mut si = 0;

    while pi < pattern_tokens.len() && si < subject_tokens.len() {
        match pattern_tokens[pi] {
            ">" => {
                // `>` must be last and swallows the rest
                return pi == pattern_tokens.len() - 1;
            }
            "*" => {
                pi += 1;
                si += 1;
            }
            token => {
                if token != subject_tokens[si] {
                    return false;
                }
                pi += 1;
                si += 1;
            }
        }
    }

    pi == pattern_tokens.len() && si == subject_tokens.len()
}

// ============================================================================
// Flow Message Types
// ============================================================================

/// Payloads that know their subject.
pub trait HasSubject {
    fn subject(&self) -> String;
}

/// A message published to the flow bus.
#[derive(Clone, Debug)]
pub struct FlowMessage<T> {
    /// The subject (derived from payload).
    pub subject: String,
    pub payload: T,
    /// When this message was created.
    pub timestamp: Instant,
}

impl<T: HasSubject> FlowMessage<T> {
    pub fn new(payload: T) -> Self {
        Self {
            subject: payload.subject(),
            payload,
            timestamp: Instant::now(),
        }
    }
}

/// Who asked for a run.
///
/// Runs issued by a mirror's auto-run timer are tagged so other mirrors do not
/// treat them as a reason to auto-run in turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunOrigin {
    /// A person ran the cell (document command, toolbar button).
    #[default]
    User,
    /// A mirror's debounce timer fired.
    AutoRun,
}

/// Changes to a canonical cell, as published by the host document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellFlow {
    /// Execution count changed. `PENDING` while a run is in flight.
    ExecutionCountChanged {
        cell_id: CellId,
        count: ExecutionCount,
    },
    /// Dirty flag flipped (source edited since last run, or run started).
    DirtyChanged { cell_id: CellId, dirty: bool },
    /// Source text replaced.
    SourceChanged { cell_id: CellId, source: String },
    /// Outputs were re-rendered.
    OutputsChanged { cell_id: CellId },
    /// The cell is about to run.
    ExecutionScheduled { cell_id: CellId, origin: RunOrigin },
    /// The cell left the document.
    Removed { cell_id: CellId },
}

impl CellFlow {
    /// The cell this event is about.
    pub fn cell_id(&self) -> CellId {
        match self {
            Self::ExecutionCountChanged { cell_id, .. }
            | Self::DirtyChanged { cell_id, .. }
            | Self::SourceChanged { cell_id, .. }
            | Self::OutputsChanged { cell_id }
            | Self::ExecutionScheduled { cell_id, .. }
            | Self::Removed { cell_id } => *cell_id,
        }
    }

    /// Last subject token.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExecutionCountChanged { .. } => "execution_count",
            Self::DirtyChanged { .. } => "dirty",
            Self::SourceChanged { .. } => "source",
            Self::OutputsChanged { .. } => "outputs",
            Self::ExecutionScheduled { .. } => "scheduled",
            Self::Removed { .. } => "removed",
        }
    }
}

impl HasSubject for CellFlow {
    fn subject(&self) -> String {
        format!("cell.{}.{}", self.cell_id().to_hex(), self.kind())
    }
}

// ============================================================================
// FlowBus
// ============================================================================

/// Typed broadcast bus with subject-pattern subscriptions.
pub struct FlowBus<T: Clone + Send + 'static> {
    tx: broadcast::Sender<FlowMessage<T>>,
    capacity: usize,
}

impl<T: Clone + Send + 'static> FlowBus<T> {
    /// Create a new flow bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Send + HasSubject + 'static> FlowBus<T> {
    /// Publish a payload. Returns how many subscriptions received it.
    pub fn publish(&self, payload: T) -> usize {
        let msg = FlowMessage::new(payload);
        self.tx.send(msg).unwrap_or(0)
    }

    /// Subscribe to messages matching a pattern.
    pub fn subscribe(&self, pattern: &str) -> Subscription<T> {
        Subscription {
            pattern: pattern.to_string(),
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone + Send + 'static> Clone for FlowBus<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            capacity: self.capacity,
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A pattern-filtered view of a FlowBus. Dropping it unsubscribes.
pub struct Subscription<T: Clone> {
    pattern: String,
    rx: broadcast::Receiver<FlowMessage<T>>,
}

impl<T: Clone> Subscription<T> {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Receive the next matching message, waiting if necessary.
    ///
    /// Returns None if the bus is gone.
    pub async fn recv(&mut self) -> Option<FlowMessage<T>> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => {
                    if matches_pattern(&self.pattern, &msg.subject) {
                        return Some(msg);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        pattern = %self.pattern,
                        lagged = n,
                        "cell flow subscription lagged behind"
                    );
                }
            }
        }
    }

    /// Next matching message without blocking, or None when drained.
    pub fn try_recv(&mut self) -> Option<FlowMessage<T>> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    if matches_pattern(&self.pattern, &msg.subject) {
                        return Some(msg);
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(
                        pattern = %self.pattern,
                        lagged = n,
                        "cell flow subscription lagged behind"
                    );
                }
            }
        }
    }

    /// Drain every matching message currently queued, in publish order.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv())
            .map(|msg| msg.payload)
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
