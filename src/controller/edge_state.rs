//! Per-frame edge tracking for logical buttons
//!
//! Each [`LogicalInput`] carries a held level plus two one-shot edges (down,
//! up). An edge has two views over the same record:
//!
//! - the broadcast view, read by [`EdgeStateTracker::query_down`] and friends,
//!   which any number of readers can poll during the frame;
//! - the consume view, read by [`EdgeStateTracker::take_down`] and friends,
//!   which reports an edge to the first reader only.
//!
//! Both views are wiped by [`EdgeStateTracker::clear_edges`], which the
//! handler runs at the start of every tick.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::action::LogicalInput;

/// Observable state of one logical input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub held: bool,
    pub down: bool,
    pub up: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Edge {
    visible: bool,
    unconsumed: bool,
}

impl Edge {
    fn raise(&mut self) {
        self.visible = true;
        self.unconsumed = true;
    }

    fn take(&mut self) -> bool {
        std::mem::take(&mut self.unconsumed)
    }

    /// Returns true if either view was still set
    fn clear(&mut self) -> bool {
        let was_set = self.visible || self.unconsumed;
        *self = Edge::default();
        was_set
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct EdgeFlags {
    held: bool,
    down: Edge,
    up: Edge,
}

#[derive(Debug, Clone)]
pub struct EdgeStateTracker {
    flags: [EdgeFlags; LogicalInput::ALL.len()],
    clear_scheduled: bool,
}

impl Default for EdgeStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeStateTracker {
    pub fn new() -> Self {
        Self {
            flags: [EdgeFlags::default(); LogicalInput::ALL.len()],
            clear_scheduled: false,
        }
    }

    pub fn on_action_started(&mut self, input: LogicalInput) {
        let flags = &mut self.flags[input.index()];
        flags.held = true;
        flags.down.raise();
        self.clear_scheduled = true;
        trace!("{} started", input);
    }

    pub fn on_action_canceled(&mut self, input: LogicalInput) {
        let flags = &mut self.flags[input.index()];
        flags.held = false;
        flags.up.raise();
        self.clear_scheduled = true;
        trace!("{} canceled", input);
    }

    pub fn query_held(&self, input: LogicalInput) -> bool {
        self.flags[input.index()].held
    }

    pub fn query_down(&self, input: LogicalInput) -> bool {
        self.flags[input.index()].down.visible
    }

    pub fn query_up(&self, input: LogicalInput) -> bool {
        self.flags[input.index()].up.visible
    }

    /// Reports a down edge once; later calls in the same frame return false
    pub fn take_down(&mut self, input: LogicalInput) -> bool {
        self.flags[input.index()].down.take()
    }

    /// Reports an up edge once; later calls in the same frame return false
    pub fn take_up(&mut self, input: LogicalInput) -> bool {
        self.flags[input.index()].up.take()
    }

    pub fn state(&self, input: LogicalInput) -> InputState {
        InputState {
            held: self.query_held(input),
            down: self.query_down(input),
            up: self.query_up(input),
        }
    }

    pub fn clear_scheduled(&self) -> bool {
        self.clear_scheduled
    }

    /// Runs the deferred clear scheduled by transitions since the last call
    ///
    /// Held levels are untouched. Returns the number of edges that were
    /// still set in either view.
    pub fn clear_edges(&mut self) -> usize {
        if !std::mem::take(&mut self.clear_scheduled) {
            return 0;
        }

        let mut cleared = 0;
        for flags in self.flags.iter_mut() {
            cleared += usize::from(flags.down.clear());
            cleared += usize::from(flags.up.clear());
        }
        debug!("Cleared {} one-shot edges", cleared);
        cleared
    }

    /// Drops every level and edge
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
