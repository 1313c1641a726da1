//! In-memory notebook implementing [`DocumentHost`].
//!
//! Behaves like a small notebook frontend with an attached session:
//!
//! - `run_active` publishes `ExecutionScheduled`, clears the dirty flag and
//!   sets the count to pending, then queues the run. Nothing completes until
//!   [`MemoryNotebook::complete_next`] is called, so callers control timing.
//! - Completion assigns the next session-wide execution count, evaluates the
//!   cell with an echo evaluator (the last non-empty source line becomes the
//!   single output), and un-hides the output region the way a results redraw
//!   does.
//!
//! Every model change is published on the notebook's [`FlowBus`].

use std::collections::VecDeque;

use serde::Deserialize;
use tracing::debug;

use pincell_types::{CellId, CellKind, CellSnapshot, ExecutionCount};

use crate::engine::Renderer;
use crate::error::HostError;
use crate::flows::{CellFlow, FlowBus, RunOrigin, Subscription};
use crate::host::DocumentHost;
use crate::render::RenderTree;

/// Default flow bus capacity.
pub const DEFAULT_FLOW_CAPACITY: usize = 256;

pub struct MemoryNotebook {
    /// Cells in document order.
    cells: Vec<CellSnapshot>,
    active: usize,
    /// Last execution count handed out by the session.
    execution_counter: u32,
    /// Runs waiting for completion, oldest first.
    running: VecDeque<CellId>,
    bus: FlowBus<CellFlow>,
    renderer: Renderer,
}

impl Default for MemoryNotebook {
    fn default() -> Self {
        Self::new(DEFAULT_FLOW_CAPACITY)
    }
}

impl MemoryNotebook {
    /// Empty notebook whose flow bus holds `capacity` messages per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: Vec::new(),
            active: 0,
            execution_counter: 0,
            running: VecDeque::new(),
            bus: FlowBus::new(capacity),
            renderer: Renderer,
        }
    }

    /// Parse a notebook document (nbformat-style JSON).
    ///
    /// Only `cells[].cell_type`, `source`, `execution_count`, and the text of
    /// `outputs` are read. `source` and output text may be strings or arrays of
    /// lines, as nbformat allows.
    pub fn from_json(json: &str, capacity: usize) -> Result<Self, HostError> {
        let file: NotebookFile =
            serde_json::from_str(json).map_err(|e| HostError::Parse(e.to_string()))?;
        let mut nb = Self::new(capacity);
        for cell in file.cells {
            let kind = CellKind::from_str(&cell.cell_type)
                .ok_or_else(|| HostError::Parse(format!("unknown cell_type '{}'", cell.cell_type)))?;
            let outputs = cell.outputs.iter().filter_map(output_text).collect();
            nb.push(CellSnapshot {
                id: CellId::new(),
                kind,
                source: multiline(&cell.source),
                execution_count: ExecutionCount(cell.execution_count),
                dirty: false,
                input_hidden: false,
                output_hidden: false,
                outputs,
            });
        }
        Ok(nb)
    }

    // =========================================================================
    // Document editing (host-side, not part of DocumentHost)
    // =========================================================================

    /// Append a cell. The session counter catches up with any count it carries.
    pub fn push(&mut self, cell: CellSnapshot) -> CellId {
        if let Some(n) = cell.execution_count.value() {
            self.execution_counter = self.execution_counter.max(n);
        }
        let id = cell.id;
        self.cells.push(cell);
        id
    }

    pub fn add_code_cell(&mut self, source: &str) -> CellId {
        self.push(CellSnapshot::code(CellId::new(), source))
    }

    pub fn add_cell(&mut self, kind: CellKind, source: &str) -> CellId {
        let mut cell = CellSnapshot::code(CellId::new(), source);
        cell.kind = kind;
        self.push(cell)
    }

    /// Cell identities in document order.
    pub fn cell_ids(&self) -> Vec<CellId> {
        self.cells.iter().map(|c| c.id).collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Replace a cell's source, marking it dirty.
    pub fn edit_source(&mut self, id: CellId, source: &str) -> Result<(), HostError> {
        let cell = self.cell_mut(id)?;
        cell.source = source.to_string();
        let became_dirty = !cell.dirty;
        cell.dirty = true;
        self.bus.publish(CellFlow::SourceChanged {
            cell_id: id,
            source: source.to_string(),
        });
        if became_dirty {
            self.bus.publish(CellFlow::DirtyChanged {
                cell_id: id,
                dirty: true,
            });
        }
        Ok(())
    }

    /// Delete a cell from the document.
    pub fn remove_cell(&mut self, id: CellId) -> Result<CellSnapshot, HostError> {
        let index = self.index_of(id).ok_or(HostError::CellNotFound(id))?;
        let cell = self.cells.remove(index);
        if self.active > index || self.active >= self.cells.len() {
            self.active = self.active.saturating_sub(1);
        }
        self.running.retain(|r| *r != id);
        self.bus.publish(CellFlow::Removed { cell_id: id });
        Ok(cell)
    }

    /// Make a cell active and run it.
    pub fn run_cell(&mut self, id: CellId, origin: RunOrigin) -> Result<(), HostError> {
        let index = self.index_of(id).ok_or(HostError::CellNotFound(id))?;
        self.set_active_index(index)?;
        self.run_active(origin)
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Runs queued but not completed.
    pub fn pending_runs(&self) -> usize {
        self.running.len()
    }

    /// Cells with a queued run, oldest first.
    pub fn queued_runs(&self) -> impl Iterator<Item = CellId> + '_ {
        self.running.iter().copied()
    }

    pub fn execution_counter(&self) -> u32 {
        self.execution_counter
    }

    /// Complete the oldest queued run. Returns the cell that finished.
    pub fn complete_next(&mut self) -> Option<CellId> {
        while let Some(id) = self.running.pop_front() {
            let Some(index) = self.index_of(id) else {
                continue;
            };
            self.execution_counter += 1;
            let n = self.execution_counter;
            let cell = &mut self.cells[index];
            cell.execution_count = ExecutionCount::settled(n);
            cell.outputs = evaluate(&cell.source);
            cell.output_hidden = false;
            debug!(cell = %id, count = n, "run completed");
            self.bus.publish(CellFlow::ExecutionCountChanged {
                cell_id: id,
                count: ExecutionCount::settled(n),
            });
            self.bus.publish(CellFlow::OutputsChanged { cell_id: id });
            return Some(id);
        }
        None
    }

    /// Complete every queued run. Returns how many completed.
    pub fn complete_all(&mut self) -> usize {
        std::iter::from_fn(|| self.complete_next()).count()
    }

    /// The notebook's change stream.
    pub fn bus(&self) -> &FlowBus<CellFlow> {
        &self.bus
    }

    fn cell_ref(&self, id: CellId) -> Result<&CellSnapshot, HostError> {
        self.cells
            .iter()
            .find(|c| c.id == id)
            .ok_or(HostError::CellNotFound(id))
    }

    fn cell_mut(&mut self, id: CellId) -> Result<&mut CellSnapshot, HostError> {
        self.cells
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(HostError::CellNotFound(id))
    }
}

impl DocumentHost for MemoryNotebook {
    fn cell(&self, id: CellId) -> Result<CellSnapshot, HostError> {
        self.cell_ref(id).cloned()
    }

    fn set_input_hidden(&mut self, id: CellId, hidden: bool) -> Result<(), HostError> {
        self.cell_mut(id)?.input_hidden = hidden;
        Ok(())
    }

    fn set_output_hidden(&mut self, id: CellId, hidden: bool) -> Result<(), HostError> {
        self.cell_mut(id)?.output_hidden = hidden;
        Ok(())
    }

    fn set_cell_kind(&mut self, id: CellId, kind: CellKind) -> Result<(), HostError> {
        let cell = self.cell_mut(id)?;
        cell.kind = kind;
        if !kind.is_executable() {
            cell.execution_count = ExecutionCount::PENDING;
            cell.outputs.clear();
        }
        Ok(())
    }

    fn index_of(&self, id: CellId) -> Option<usize> {
        self.cells.iter().position(|c| c.id == id)
    }

    fn active_index(&self) -> usize {
        self.active
    }

    fn set_active_index(&mut self, index: usize) -> Result<(), HostError> {
        if index >= self.cells.len() && !(index == 0 && self.cells.is_empty()) {
            return Err(HostError::IndexOutOfRange {
                index,
                len: self.cells.len(),
            });
        }
        self.active = index;
        Ok(())
    }

    fn insert_cell_below(&mut self) -> Result<CellId, HostError> {
        let at = if self.cells.is_empty() { 0 } else { self.active + 1 };
        let cell = CellSnapshot::code(CellId::new(), "");
        let id = cell.id;
        self.cells.insert(at, cell);
        self.active = at;
        Ok(id)
    }

    fn run_active(&mut self, origin: RunOrigin) -> Result<(), HostError> {
        let len = self.cells.len();
        let cell = self
            .cells
            .get_mut(self.active)
            .ok_or(HostError::IndexOutOfRange {
                index: self.active,
                len,
            })?;
        if !cell.kind.is_executable() {
            debug!(cell = %cell.id, kind = %cell.kind, "run on non-code cell is a no-op");
            return Ok(());
        }
        let id = cell.id;
        let was_dirty = cell.dirty;
        cell.dirty = false;
        cell.execution_count = ExecutionCount::PENDING;

        self.bus.publish(CellFlow::ExecutionScheduled { cell_id: id, origin });
        self.bus.publish(CellFlow::ExecutionCountChanged {
            cell_id: id,
            count: ExecutionCount::PENDING,
        });
        if was_dirty {
            self.bus.publish(CellFlow::DirtyChanged {
                cell_id: id,
                dirty: false,
            });
        }
        self.running.push_back(id);
        debug!(cell = %id, ?origin, "run scheduled");
        Ok(())
    }

    fn render_cell(&self, id: CellId) -> Result<RenderTree, HostError> {
        let cell = self.cell_ref(id)?;
        self.renderer
            .render_cell(cell)
            .map_err(|e| HostError::Render(e.to_string()))
    }

    fn render_outputs(&self, id: CellId) -> Result<RenderTree, HostError> {
        let cell = self.cell_ref(id)?;
        self.renderer
            .render_outputs(cell)
            .map_err(|e| HostError::Render(e.to_string()))
    }

    fn subscribe(&self, pattern: &str) -> Subscription<CellFlow> {
        self.bus.subscribe(pattern)
    }
}

/// Echo evaluator: the last non-empty source line is the output.
fn evaluate(source: &str) -> Vec<String> {
    source
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| vec![l.trim().to_string()])
        .unwrap_or_default()
}

// ============================================================================
// Notebook file format
// ============================================================================

#[derive(Deserialize)]
struct NotebookFile {
    cells: Vec<CellFile>,
}

#[derive(Deserialize)]
struct CellFile {
    cell_type: String,
    #[serde(default)]
    source: serde_json::Value,
    #[serde(default)]
    execution_count: Option<u32>,
    #[serde(default)]
    outputs: Vec<serde_json::Value>,
}

/// nbformat multiline string: a string or an array of line strings.
fn multiline(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(lines) => lines.iter().filter_map(|l| l.as_str()).collect(),
        _ => String::new(),
    }
}

/// Plain text of one nbformat output (stream or `text/plain` data).
fn output_text(output: &serde_json::Value) -> Option<String> {
    let text = output
        .get("text")
        .or_else(|| output.get("data").and_then(|d| d.get("text/plain")))?;
    let s = multiline(text);
    let trimmed = s.trim_end_matches('\n');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::SCHEDULED_PATTERN;

    const NOTEBOOK: &str = r##"{
        "cells": [
            {"cell_type": "markdown", "source": ["# Title\n", "intro"]},
            {"cell_type": "code", "source": "x = 41\nx + 1", "execution_count": 3,
             "outputs": [{"output_type": "execute_result", "data": {"text/plain": ["42"]}}]},
            {"cell_type": "code", "source": "print('hi')", "execution_count": null,
             "outputs": [{"output_type": "stream", "text": "hi\n"}]}
        ],
        "metadata": {}, "nbformat": 4, "nbformat_minor": 5
    }"##;

    #[test]
    fn test_from_json() {
        let nb = MemoryNotebook::from_json(NOTEBOOK, 16).unwrap();
        assert_eq!(nb.len(), 3);
        let ids = nb.cell_ids();
        let md = nb.cell(ids[0]).unwrap();
        assert_eq!(md.kind, CellKind::Markdown);
        assert_eq!(md.source, "# Title\nintro");
        let code = nb.cell(ids[1]).unwrap();
        assert_eq!(code.execution_count, ExecutionCount::settled(3));
        assert_eq!(code.outputs, vec!["42".to_string()]);
        assert_eq!(nb.cell(ids[2]).unwrap().outputs, vec!["hi".to_string()]);
        assert_eq!(nb.execution_counter(), 3);
    }

    #[test]
    fn test_from_json_rejects_unknown_kind() {
        let err = MemoryNotebook::from_json(r#"{"cells":[{"cell_type":"widget"}]}"#, 16);
        assert!(matches!(err, Err(HostError::Parse(_))));
    }

    #[test]
    fn test_run_and_complete() {
        let mut nb = MemoryNotebook::default();
        let a = nb.add_code_cell("1 + 1");
        let mut sub = nb.subscribe(&crate::flows::cell_pattern(a));

        nb.run_cell(a, RunOrigin::User).unwrap();
        assert_eq!(nb.execution_count(a).unwrap(), ExecutionCount::PENDING);
        assert_eq!(nb.pending_runs(), 1);

        nb.set_output_hidden(a, true).unwrap();
        assert_eq!(nb.complete_next(), Some(a));
        let cell = nb.cell(a).unwrap();
        assert_eq!(cell.execution_count, ExecutionCount::settled(1));
        assert_eq!(cell.outputs, vec!["1 + 1".to_string()]);
        assert!(!cell.output_hidden, "results redraw un-hides the output");

        let flows = sub.drain();
        assert_eq!(
            flows,
            vec![
                CellFlow::ExecutionScheduled { cell_id: a, origin: RunOrigin::User },
                CellFlow::ExecutionCountChanged { cell_id: a, count: ExecutionCount::PENDING },
                CellFlow::ExecutionCountChanged { cell_id: a, count: ExecutionCount::settled(1) },
                CellFlow::OutputsChanged { cell_id: a },
            ]
        );
    }

    #[test]
    fn test_edit_marks_dirty_once_and_run_clears() {
        let mut nb = MemoryNotebook::default();
        let a = nb.add_code_cell("1");
        let mut sub = nb.subscribe(&crate::flows::cell_pattern(a));

        nb.edit_source(a, "2").unwrap();
        nb.edit_source(a, "3").unwrap();
        assert!(nb.is_dirty(a).unwrap());
        nb.run_cell(a, RunOrigin::User).unwrap();
        assert!(!nb.is_dirty(a).unwrap());

        let dirty: Vec<bool> = sub
            .drain()
            .into_iter()
            .filter_map(|f| match f {
                CellFlow::DirtyChanged { dirty, .. } => Some(dirty),
                _ => None,
            })
            .collect();
        assert_eq!(dirty, vec![true, false]);
    }

    #[test]
    fn test_insert_below_moves_active() {
        let mut nb = MemoryNotebook::default();
        let a = nb.add_code_cell("a");
        let b = nb.add_code_cell("b");
        nb.set_active_index(0).unwrap();
        let new = nb.insert_cell_below().unwrap();
        assert_eq!(nb.cell_ids(), vec![a, new, b]);
        assert_eq!(nb.active_index(), 1);
        assert_eq!(nb.index_of(b), Some(2));
    }

    #[test]
    fn test_insert_into_empty() {
        let mut nb = MemoryNotebook::default();
        let new = nb.insert_cell_below().unwrap();
        assert_eq!(nb.index_of(new), Some(0));
        assert_eq!(nb.active_index(), 0);
    }

    #[test]
    fn test_set_active_out_of_range() {
        let mut nb = MemoryNotebook::default();
        nb.add_code_cell("a");
        assert_eq!(
            nb.set_active_index(1),
            Err(HostError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_remove_cell_publishes_and_drops_queued_run() {
        let mut nb = MemoryNotebook::default();
        let a = nb.add_code_cell("a");
        let b = nb.add_code_cell("b");
        let mut sched = nb.subscribe(SCHEDULED_PATTERN);
        let mut sub = nb.subscribe(&crate::flows::cell_pattern(b));

        nb.run_cell(b, RunOrigin::User).unwrap();
        nb.remove_cell(b).unwrap();
        assert_eq!(nb.complete_next(), None);
        assert_eq!(nb.index_of(a), Some(0));
        assert_eq!(nb.active_index(), 0);
        assert_eq!(sched.drain().len(), 1);
        assert_eq!(sub.drain().last(), Some(&CellFlow::Removed { cell_id: b }));
    }

    #[test]
    fn test_markdown_run_is_noop() {
        let mut nb = MemoryNotebook::default();
        let md = nb.add_cell(CellKind::Markdown, "# hi");
        nb.run_cell(md, RunOrigin::User).unwrap();
        assert_eq!(nb.pending_runs(), 0);
    }

    #[test]
    fn test_set_cell_kind_clears_count() {
        let mut nb = MemoryNotebook::default();
        let mut cell = CellSnapshot::code(CellId::new(), "1");
        cell.execution_count = ExecutionCount::settled(2);
        let id = nb.push(cell);
        nb.set_cell_kind(id, CellKind::Markdown).unwrap();
        let cell = nb.cell(id).unwrap();
        assert_eq!(cell.kind, CellKind::Markdown);
        assert!(cell.execution_count.is_pending());
    }

    #[test]
    fn test_evaluate_echoes_last_line() {
        assert_eq!(evaluate("a = 1\n\nb\n  \n"), vec!["b".to_string()]);
        assert!(evaluate("").is_empty());
    }
}
