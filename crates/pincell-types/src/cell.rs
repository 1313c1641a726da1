//! Cell kinds, execution counts, and the plain-data cell snapshot.
//!
//! The host document owns the content model. Everything here is a value copy
//! of that model, safe to hand out and compare; none of it is authoritative.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::CellId;

/// What a cell holds. Floating windows are stacked per kind.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum CellKind {
    /// Executable source.
    #[default]
    Code,
    /// Rendered prose.
    #[strum(serialize = "markdown", serialize = "md")]
    Markdown,
    /// Passed through untouched.
    Raw,
}

impl CellKind {
    /// Parse from string (case-insensitive). Accepts "md" for Markdown.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::Code => "code",
            CellKind::Markdown => "markdown",
            CellKind::Raw => "raw",
        }
    }

    /// Only code cells carry an execution count.
    pub fn is_executable(&self) -> bool {
        matches!(self, CellKind::Code)
    }
}

impl std::fmt::Display for CellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cell's execution count. `None` means unset or a run is pending.
///
/// Displays as `[n]` for a settled count and `[*]` otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionCount(pub Option<u32>);

impl ExecutionCount {
    /// No count: never run, or a run is in flight.
    pub const PENDING: Self = Self(None);

    /// A settled count.
    pub fn settled(n: u32) -> Self {
        Self(Some(n))
    }

    pub fn is_pending(&self) -> bool {
        self.0.is_none()
    }

    pub fn value(&self) -> Option<u32> {
        self.0
    }
}

impl From<Option<u32>> for ExecutionCount {
    fn from(n: Option<u32>) -> Self {
        Self(n)
    }
}

impl std::fmt::Display for ExecutionCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(n) => write!(f, "[{n}]"),
            None => write!(f, "[*]"),
        }
    }
}

/// Value copy of a canonical cell's model and visibility flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub id: CellId,
    pub kind: CellKind,
    pub source: String,
    pub execution_count: ExecutionCount,
    /// Source edited since the last run.
    pub dirty: bool,
    pub input_hidden: bool,
    pub output_hidden: bool,
    /// Rendered output lines, in order.
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl CellSnapshot {
    /// A fresh, never-run code cell.
    pub fn code(id: CellId, source: impl Into<String>) -> Self {
        Self {
            id,
            kind: CellKind::Code,
            source: source.into(),
            execution_count: ExecutionCount::PENDING,
            dirty: false,
            input_hidden: false,
            output_hidden: false,
            outputs: Vec::new(),
        }
    }

    /// Both regions visible.
    pub fn is_fully_visible(&self) -> bool {
        !self.input_hidden && !self.output_hidden
    }
}
