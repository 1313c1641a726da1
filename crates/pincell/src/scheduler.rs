//! Debounced auto-run.
//!
//! Each mirror owns one [`AutoRunScheduler`]. It listens for
//! execution-scheduled events on *other* cells and arms a single deadline;
//! every further qualifying event overwrites it. Only the surviving deadline
//! fires.
//!
//! Time is injected: callers pass `Instant`s, so the same code runs under a
//! tokio interval in the CLI and under hand-stepped clocks in tests.

use std::time::{Duration, Instant};

use pincell_host::{CellFlow, RunOrigin, Subscription};
use pincell_types::CellId;

pub struct AutoRunScheduler {
    cell: CellId,
    enabled: bool,
    delay: Duration,
    pending: Option<Instant>,
    subscription: Option<Subscription<CellFlow>>,
}

impl AutoRunScheduler {
    pub fn new(cell: CellId, delay: Duration, enabled: bool) -> Self {
        Self {
            cell,
            enabled,
            delay,
            pending: None,
            subscription: None,
        }
    }

    /// Attach the document-wide execution-scheduled stream.
    pub fn with_subscription(mut self, subscription: Subscription<CellFlow>) -> Self {
        self.subscription = Some(subscription);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turning auto-run off drops any armed deadline.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.pending = None;
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Feed one event. Returns true if it (re)armed the deadline.
    ///
    /// Only runs of other cells arm it, and only runs a user started: runs
    /// tagged [`RunOrigin::AutoRun`] are ignored, so two auto-running mirrors
    /// never keep re-triggering each other. This is narrower than arming on
    /// every scheduled execution.
    pub fn observe(&mut self, flow: &CellFlow, now: Instant) -> bool {
        let CellFlow::ExecutionScheduled { cell_id, origin } = flow else {
            return false;
        };
        if !self.enabled || *cell_id == self.cell || *origin == RunOrigin::AutoRun {
            return false;
        }
        self.pending = Some(now + self.delay);
        tracing::debug!(cell = %self.cell, trigger = %cell_id, "auto-run armed");
        true
    }

    /// Drain the attached subscription into [`observe`](Self::observe).
    pub fn pump(&mut self, now: Instant) -> usize {
        let Some(sub) = self.subscription.as_mut() else {
            return 0;
        };
        let flows = sub.drain();
        flows.iter().filter(|f| self.observe(f, now)).count()
    }

    /// Fire if the deadline has passed. Clears the slot when it fires.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if now >= deadline => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the armed deadline and the subscription.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.subscription = None;
    }
}
