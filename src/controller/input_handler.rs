//! Input Handler - owned context for the whole input state
//!
//! Holds the dispatch table, the edge tracker and the analog processor behind
//! one lifecycle:
//!
//! ```text
//! new/init ──► handle(event)* ──► tick() ──► handle(event)* ──► tick() ... ──► shutdown
//! ```
//!
//! After [`InputHandler::shutdown`] every handler and tick is a silent no-op
//! until [`InputHandler::init`] is called again.
//!
//! Code that owns an `InputHandler` gets both views: `query_*` broadcast reads
//! and the consume-on-read `take_*`/per-button accessors. Subscribers of the
//! async pipeline (`ControllerHandle::subscribe`) only receive
//! [`InputSnapshot`]s, which are the read-only broadcast view.

use chrono::{DateTime, Local};
use std::collections::HashSet;
use tracing::{debug, info, trace, warn};

use super::action::{
    ActionEvent, ActionMap, ActionSource, LogicalInput, Stick, StickAxis, Transition,
};
use super::analog::{AnalogProcessor, AnalogSettings, DerivedStickVectors};
use super::dispatch::{DispatchTable, Route};
use super::edge_state::{EdgeStateTracker, InputState};

/// Frozen copy of the input state at the end of a tick
#[derive(Clone, Debug)]
pub struct InputSnapshot {
    pub frame: u64,
    pub states: [InputState; LogicalInput::ALL.len()],
    pub left_stick: DerivedStickVectors,
    pub right_stick: DerivedStickVectors,
    pub timestamp: DateTime<Local>,
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            frame: 0,
            states: [InputState::default(); LogicalInput::ALL.len()],
            left_stick: DerivedStickVectors::default(),
            right_stick: DerivedStickVectors::default(),
            timestamp: Local::now(),
        }
    }
}

impl InputSnapshot {
    pub fn state(&self, input: LogicalInput) -> InputState {
        self.states[input.index()]
    }

    pub fn query_down(&self, input: LogicalInput) -> bool {
        self.state(input).down
    }

    pub fn query_up(&self, input: LogicalInput) -> bool {
        self.state(input).up
    }

    pub fn query_held(&self, input: LogicalInput) -> bool {
        self.state(input).held
    }

    pub fn stick(&self, stick: Stick) -> &DerivedStickVectors {
        match stick {
            Stick::Left => &self.left_stick,
            Stick::Right => &self.right_stick,
        }
    }

    /// Inputs with any flag set, for logging
    pub fn active_inputs(&self) -> Vec<(LogicalInput, InputState)> {
        LogicalInput::ALL
            .iter()
            .map(|&input| (input, self.state(input)))
            .filter(|(_, state)| state.held || state.down || state.up)
            .collect()
    }
}

#[derive(Debug)]
pub struct InputHandler {
    alive: bool,
    frame: u64,
    dispatch: DispatchTable,
    edges: EdgeStateTracker,
    analog: AnalogProcessor,
    enabled_maps: HashSet<ActionMap>,
}

impl InputHandler {
    /// Creates a live handler with both action maps enabled
    pub fn new(settings: AnalogSettings) -> Self {
        info!("Creating input handler with settings: {:?}", settings);
        Self {
            alive: true,
            frame: 0,
            dispatch: DispatchTable::new(),
            edges: EdgeStateTracker::new(),
            analog: AnalogProcessor::new(settings),
            enabled_maps: HashSet::from([ActionMap::Player, ActionMap::Ui]),
        }
    }

    /// Resets all state to defaults and accepts events again
    pub fn init(&mut self) {
        self.edges.reset();
        self.analog.reset();
        self.frame = 0;
        self.enabled_maps = HashSet::from([ActionMap::Player, ActionMap::Ui]);
        self.alive = true;
        info!("Input handler initialized");
    }

    /// Drops all state; later events and ticks are ignored
    pub fn shutdown(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.edges.reset();
        self.analog.reset();
        self.enabled_maps.clear();
        info!("Input handler shut down after {} frames", self.frame);
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn enable_map(&mut self, map: ActionMap) {
        if self.alive && self.enabled_maps.insert(map) {
            debug!("Enabled {} action map", map);
        }
    }

    /// Stops accepting events from `map`, canceling whatever it still holds
    ///
    /// The cancel events of buttons held through the disable would be
    /// dropped, so they are released here. Sticks of the map are centered.
    pub fn disable_map(&mut self, map: ActionMap) {
        if !self.enabled_maps.contains(&map) {
            return;
        }

        for source in ActionSource::ALL.into_iter().filter(|s| s.map() == map) {
            match self.dispatch.route(source, Transition::Canceled) {
                Some(Route::Release(input)) if self.query_held(input) => {
                    debug!("Releasing {:?} held through {} map disable", input, map);
                    self.on_action_canceled(input);
                }
                Some(Route::Axis(stick, axis)) => self.on_axis_sample(stick, axis, 0.0),
                _ => {}
            }
        }

        self.enabled_maps.remove(&map);
        debug!("Disabled {} action map", map);
    }

    pub fn is_map_enabled(&self, map: ActionMap) -> bool {
        self.enabled_maps.contains(&map)
    }

    /// Applies one backend event; returns whether it changed any state
    pub fn handle(&mut self, event: &ActionEvent) -> bool {
        if !self.alive {
            trace!("Ignoring {:?} after shutdown", event.source);
            return false;
        }
        if !self.is_map_enabled(event.source.map()) {
            trace!(
                "Ignoring {:?}: {} map disabled",
                event.source,
                event.source.map()
            );
            return false;
        }

        let Some(route) = self.dispatch.route(event.source, event.transition) else {
            trace!("No route for {:?} {:?}", event.source, event.transition);
            return false;
        };

        match route {
            Route::Press(input) => self.on_action_started(input),
            Route::Release(input) => self.on_action_canceled(input),
            Route::Axis(stick, axis) => {
                let value = match (event.value, event.transition) {
                    (Some(value), _) => value,
                    (None, Transition::Canceled) => 0.0,
                    (None, transition) => {
                        warn!(
                            "{:?} {:?} arrived without a value",
                            event.source, transition
                        );
                        return false;
                    }
                };
                self.on_axis_sample(stick, axis, value);
            }
        }
        true
    }

    pub fn on_action_started(&mut self, input: LogicalInput) {
        if self.alive {
            self.edges.on_action_started(input);
        }
    }

    pub fn on_action_canceled(&mut self, input: LogicalInput) {
        if self.alive {
            self.edges.on_action_canceled(input);
        }
    }

    pub fn on_axis_sample(&mut self, stick: Stick, axis: StickAxis, value: f32) {
        if self.alive {
            self.analog.on_axis_sample(stick, axis, value);
        }
    }

    /// Frame boundary: runs the deferred edge clear, then recomputes sticks
    pub fn tick(&mut self) {
        self.begin_frame();
        self.update_sticks();
    }

    /// Clears one-shot edges raised before this call and advances the frame
    pub fn begin_frame(&mut self) {
        if !self.alive {
            return;
        }
        self.edges.clear_edges();
        self.frame += 1;
    }

    /// Recomputes the derived stick vectors from the latest samples
    pub fn update_sticks(&mut self) {
        if self.alive {
            self.analog.tick();
        }
    }

    pub fn query_down(&self, input: LogicalInput) -> bool {
        self.edges.query_down(input)
    }

    pub fn query_up(&self, input: LogicalInput) -> bool {
        self.edges.query_up(input)
    }

    pub fn query_held(&self, input: LogicalInput) -> bool {
        self.edges.query_held(input)
    }

    pub fn take_down(&mut self, input: LogicalInput) -> bool {
        self.edges.take_down(input)
    }

    pub fn take_up(&mut self, input: LogicalInput) -> bool {
        self.edges.take_up(input)
    }

    pub fn left_stick(&self) -> &DerivedStickVectors {
        self.analog.left()
    }

    pub fn right_stick(&self) -> &DerivedStickVectors {
        self.analog.right()
    }

    pub fn stick(&self, stick: Stick) -> &DerivedStickVectors {
        self.analog.stick(stick)
    }

    pub fn analog(&self) -> &AnalogProcessor {
        &self.analog
    }

    pub fn snapshot(&self) -> InputSnapshot {
        let mut states = [InputState::default(); LogicalInput::ALL.len()];
        for input in LogicalInput::ALL {
            states[input.index()] = self.edges.state(input);
        }
        InputSnapshot {
            frame: self.frame,
            states,
            left_stick: *self.analog.left(),
            right_stick: *self.analog.right(),
            timestamp: Local::now(),
        }
    }
}

// Dedicated accessors: held is a plain read, down/up consume the edge.
macro_rules! button_accessors {
    ($($input:ident => $held:ident, $down:ident, $up:ident;)*) => {
        impl InputHandler {
            $(
                pub fn $held(&self) -> bool {
                    self.query_held(LogicalInput::$input)
                }

                pub fn $down(&mut self) -> bool {
                    self.take_down(LogicalInput::$input)
                }

                pub fn $up(&mut self) -> bool {
                    self.take_up(LogicalInput::$input)
                }
            )*
        }
    };
}

button_accessors! {
    ButtonNorth => held_button_north, down_button_north, up_button_north;
    ButtonSouth => held_button_south, down_button_south, up_button_south;
    ButtonWest => held_button_west, down_button_west, up_button_west;
    ButtonEast => held_button_east, down_button_east, up_button_east;
    RightShoulder => held_right_shoulder, down_right_shoulder, up_right_shoulder;
    LeftShoulder => held_left_shoulder, down_left_shoulder, up_left_shoulder;
    RightTrigger => held_right_trigger, down_right_trigger, up_right_trigger;
    LeftTrigger => held_left_trigger, down_left_trigger, up_left_trigger;
    Start => held_start, down_start, up_start;
    Select => held_select, down_select, up_select;
    UiCancel => held_cancel, down_cancel, up_cancel;
    UiSubmit => held_submit, down_submit, up_submit;
}
