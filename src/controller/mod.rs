//! Controller subsystem for gamepad input handling
//!
//! The core is host-agnostic:
//!
//! 1. [`action`] - Action sources, transitions and logical inputs
//! 2. [`dispatch`] - Static (source, transition) routing
//! 3. [`edge_state`] - Held/down/up tracking with one-frame edges
//! 4. [`analog`] - Stick normalization, deadzone and angle snapping
//! 5. [`input_handler`] - Owned context tying the above together
//!
//! On top of it sits the gilrs pipeline:
//!
//! ```text
//! Gamepad ──► Collector ──► Processor ──► InputSnapshot
//!             (ActionEvent)  (per tick)
//! ```
//!
//! [`controller_handle`] spawns and tears down both tasks.

pub mod action;
pub mod analog;
pub mod controller_handle;
pub mod dispatch;
pub mod edge_state;
pub mod event_collector;
pub mod event_processor;
pub mod input_handler;

pub use action::{ActionEvent, ActionMap, ActionSource, LogicalInput, Stick, StickAxis, Transition};
pub use analog::{AnalogSettings, DerivedStickVectors};
pub use controller_handle::{ControllerError, ControllerHandle, ControllerSettings};
pub use edge_state::InputState;
pub use input_handler::{InputHandler, InputSnapshot};
