//! Static routing from (action source, transition) to what the handler does with it
//!
//! The table is built once and never mutated, so there is nothing to
//! unsubscribe on teardown.

use std::collections::HashMap;
use tracing::debug;

use super::action::{ActionSource, LogicalInput, Stick, StickAxis, Transition};

/// What an incoming event does to the input state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Press(LogicalInput),
    Release(LogicalInput),
    Axis(Stick, StickAxis),
}

#[derive(Debug, Clone)]
pub struct DispatchTable {
    routes: HashMap<(ActionSource, Transition), Route>,
}

impl DispatchTable {
    /// Builds the default gamepad routing
    ///
    /// Buttons press on `Started` and release on `Canceled`; a button
    /// `Performed` carries no edge. Stick axes store their value on every
    /// transition.
    pub fn new() -> Self {
        let mut routes = HashMap::new();

        for source in ActionSource::ALL {
            if let Some(input) = button_input(source) {
                routes.insert((source, Transition::Started), Route::Press(input));
                routes.insert((source, Transition::Canceled), Route::Release(input));
            } else if let Some((stick, axis)) = stick_axis(source) {
                for transition in [
                    Transition::Started,
                    Transition::Performed,
                    Transition::Canceled,
                ] {
                    routes.insert((source, transition), Route::Axis(stick, axis));
                }
            }
        }

        debug!("Built dispatch table with {} routes", routes.len());
        Self { routes }
    }

    pub fn route(&self, source: ActionSource, transition: Transition) -> Option<Route> {
        self.routes.get(&(source, transition)).copied()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

fn button_input(source: ActionSource) -> Option<LogicalInput> {
    match source {
        ActionSource::ButtonNorth => Some(LogicalInput::ButtonNorth),
        ActionSource::ButtonSouth => Some(LogicalInput::ButtonSouth),
        ActionSource::ButtonEast => Some(LogicalInput::ButtonEast),
        ActionSource::ButtonWest => Some(LogicalInput::ButtonWest),
        ActionSource::RightShoulder => Some(LogicalInput::RightShoulder),
        ActionSource::LeftShoulder => Some(LogicalInput::LeftShoulder),
        ActionSource::RightTrigger => Some(LogicalInput::RightTrigger),
        ActionSource::LeftTrigger => Some(LogicalInput::LeftTrigger),
        ActionSource::Start => Some(LogicalInput::Start),
        ActionSource::Select => Some(LogicalInput::Select),
        ActionSource::UiCancel => Some(LogicalInput::UiCancel),
        ActionSource::UiSubmit => Some(LogicalInput::UiSubmit),
        _ => None,
    }
}

fn stick_axis(source: ActionSource) -> Option<(Stick, StickAxis)> {
    match source {
        ActionSource::LeftHorizontalMove => Some((Stick::Left, StickAxis::Horizontal)),
        ActionSource::LeftVerticalMove => Some((Stick::Left, StickAxis::Vertical)),
        ActionSource::RightHorizontalMove => Some((Stick::Right, StickAxis::Horizontal)),
        ActionSource::RightVerticalMove => Some((Stick::Right, StickAxis::Vertical)),
        _ => None,
    }
}
