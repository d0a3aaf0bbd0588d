//! Action vocabulary shared by the collector, the dispatch table and the handler
//!
//! An [`ActionEvent`] is what the host backend delivers: an [`ActionSource`]
//! (one engine-side action inside an [`ActionMap`]), the [`Transition`] it went
//! through and an optional scalar for axis actions. Gameplay code never sees
//! sources, only [`LogicalInput`]s and processed sticks.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical button identifier, independent of the physical device layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalInput {
    ButtonNorth,
    ButtonSouth,
    ButtonWest,
    ButtonEast,
    RightShoulder,
    LeftShoulder,
    RightTrigger,
    LeftTrigger,
    Start,
    Select,
    UiCancel,
    UiSubmit,
}

impl LogicalInput {
    pub const ALL: [LogicalInput; 12] = [
        LogicalInput::ButtonNorth,
        LogicalInput::ButtonSouth,
        LogicalInput::ButtonWest,
        LogicalInput::ButtonEast,
        LogicalInput::RightShoulder,
        LogicalInput::LeftShoulder,
        LogicalInput::RightTrigger,
        LogicalInput::LeftTrigger,
        LogicalInput::Start,
        LogicalInput::Select,
        LogicalInput::UiCancel,
        LogicalInput::UiSubmit,
    ];

    /// Dense index into per-input tables
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LogicalInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stick {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StickAxis {
    Horizontal,
    Vertical,
}

/// Group of actions that is enabled or disabled as a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionMap {
    Player,
    Ui,
}

impl fmt::Display for ActionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionMap::Player => write!(f, "Player"),
            ActionMap::Ui => write!(f, "UI"),
        }
    }
}

/// Engine-side action that raises events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionSource {
    ButtonNorth,
    ButtonSouth,
    ButtonEast,
    ButtonWest,
    RightShoulder,
    LeftShoulder,
    RightTrigger,
    LeftTrigger,
    Start,
    Select,
    LeftHorizontalMove,
    LeftVerticalMove,
    RightHorizontalMove,
    RightVerticalMove,
    UiCancel,
    UiSubmit,
}

impl ActionSource {
    pub const ALL: [ActionSource; 16] = [
        ActionSource::ButtonNorth,
        ActionSource::ButtonSouth,
        ActionSource::ButtonEast,
        ActionSource::ButtonWest,
        ActionSource::RightShoulder,
        ActionSource::LeftShoulder,
        ActionSource::RightTrigger,
        ActionSource::LeftTrigger,
        ActionSource::Start,
        ActionSource::Select,
        ActionSource::LeftHorizontalMove,
        ActionSource::LeftVerticalMove,
        ActionSource::RightHorizontalMove,
        ActionSource::RightVerticalMove,
        ActionSource::UiCancel,
        ActionSource::UiSubmit,
    ];

    pub fn map(self) -> ActionMap {
        match self {
            ActionSource::UiCancel | ActionSource::UiSubmit => ActionMap::Ui,
            _ => ActionMap::Player,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    Started,
    Performed,
    Canceled,
}

/// Single event delivered by the host input backend
#[derive(Debug, Clone)]
pub struct ActionEvent {
    pub source: ActionSource,
    pub transition: Transition,
    /// Axis value, if the action carries one
    pub value: Option<f32>,
    pub timestamp: DateTime<Local>,
}

impl ActionEvent {
    pub fn new(source: ActionSource, transition: Transition, value: Option<f32>) -> Self {
        Self {
            source,
            transition,
            value,
            timestamp: Local::now(),
        }
    }

    pub fn started(source: ActionSource) -> Self {
        Self::new(source, Transition::Started, None)
    }

    pub fn canceled(source: ActionSource) -> Self {
        Self::new(source, Transition::Canceled, None)
    }

    pub fn axis(source: ActionSource, transition: Transition, value: f32) -> Self {
        Self::new(source, transition, Some(value))
    }
}
