use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::action::{ActionEvent, ActionSource, Transition};

// Collector settings
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    pub poll_interval_us: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            poll_interval_us: 100,
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),

    #[error("Event channel closed")]
    ChannelClosed,
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<S: CollectionState> {
    gilrs: Gilrs,

    active_gamepad: Option<GamepadId>,

    settings: CollectorSettings,

    event_sender: mpsc::Sender<ActionEvent>,

    // Last value seen per stick axis, indexed like STICK_AXES
    last_axis_values: [f32; 4],

    // Sources started and not yet canceled
    pressed_sources: HashSet<ActionSource>,
}

const STICK_AXES: [(Axis, ActionSource); 4] = [
    (Axis::LeftStickX, ActionSource::LeftHorizontalMove),
    (Axis::LeftStickY, ActionSource::LeftVerticalMove),
    (Axis::RightStickX, ActionSource::RightHorizontalMove),
    (Axis::RightStickY, ActionSource::RightVerticalMove),
];

impl<S: CollectionState> EventCollector<S> {
    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }
}

impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<ActionEvent>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(
            gilrs,
            None,
            settings,
            event_sender,
            [0.0; 4],
            HashSet::new(),
        ))
    }

    // Pick the first connected gamepad and transition to Collecting
    pub fn initialize(mut self) -> EventCollector<Collecting> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, waiting for one to appear");
        } else {
            info!("Found {} gamepads:", gamepads.len());
            for (idx, (id, gamepad)) in gamepads.iter().enumerate() {
                info!("  [{}] ID: {}, Name: {}", idx, id, gamepad.name());
            }
            let (id, gamepad) = &gamepads[0];
            self.active_gamepad = Some(*id);
            info!("Selected gamepad: {} ({})", gamepad.name(), id);
        }

        self.transition()
    }
}

impl EventCollector<Collecting> {
    // Drain every pending gilrs event into the queue
    pub fn collect_pending_events(&mut self) -> Result<usize, CollectorError> {
        let mut sent = 0;

        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected if self.active_gamepad.is_none() => {
                    info!("Gamepad {} connected, selecting it", id);
                    self.active_gamepad = Some(id);
                    continue;
                }
                EventType::Disconnected if self.active_gamepad == Some(id) => {
                    warn!("Active gamepad {} disconnected, releasing inputs", id);
                    self.active_gamepad = None;
                    let events = self.neutral_events();
                    sent += self.send_all(events)?;
                    continue;
                }
                _ => {}
            }

            if self.active_gamepad != Some(id) {
                debug!("Skipping event from non-active gamepad: {:?}", id);
                continue;
            }

            let events = self.convert_gilrs_event(event);
            sent += self.send_all(events)?;
        }

        Ok(sent)
    }

    fn send_all(&mut self, events: Vec<ActionEvent>) -> Result<usize, CollectorError> {
        send_tracked(&self.event_sender, &mut self.pressed_sources, events)
    }

    // Run until cancelled or the processor hangs up
    pub fn run_collection_loop(&mut self, cancel: CancellationToken) -> Result<(), CollectorError> {
        info!("Starting Event Collector loop");

        let mut event_count = 0;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);
        let poll_interval = std::time::Duration::from_micros(self.settings.poll_interval_us);

        while !cancel.is_cancelled() {
            match self.collect_pending_events() {
                Ok(sent) => event_count += sent,
                Err(CollectorError::ChannelClosed) => {
                    info!("Event channel closed, stopping collector");
                    return Ok(());
                }
                Err(e) => error!("Error collecting events: {}", e),
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Event Collector stats: {} events in last {} seconds",
                    event_count,
                    log_interval.num_seconds()
                );
                event_count = 0;
                last_log_time = now;
            }

            std::thread::sleep(poll_interval);
        }

        info!("Event Collector cancelled");
        Ok(())
    }

    fn convert_gilrs_event(&mut self, event: EventType) -> Vec<ActionEvent> {
        match event {
            EventType::ButtonPressed(button, _) => {
                debug!("Button pressed: {:?}", button);
                button_events(button, Transition::Started)
            }
            EventType::ButtonReleased(button, _) => {
                debug!("Button released: {:?}", button);
                button_events(button, Transition::Canceled)
            }
            EventType::AxisChanged(axis, value, _) => {
                let Some(slot) = STICK_AXES.iter().position(|(a, _)| *a == axis) else {
                    debug!("Ignoring unsupported axis: {:?}", axis);
                    return Vec::new();
                };
                let transition = axis_transition(self.last_axis_values[slot], value);
                self.last_axis_values[slot] = value;
                vec![ActionEvent::axis(STICK_AXES[slot].1, transition, value)]
            }
            _ => Vec::new(),
        }
    }

    // Releases held buttons and centers sticks so nothing stays stuck after a disconnect
    fn neutral_events(&mut self) -> Vec<ActionEvent> {
        let mut events: Vec<ActionEvent> = self
            .pressed_sources
            .drain()
            .filter(|source| !STICK_AXES.iter().any(|(_, s)| s == source))
            .map(ActionEvent::canceled)
            .collect();
        for (slot, (_, source)) in STICK_AXES.iter().enumerate() {
            if self.last_axis_values[slot] != 0.0 {
                events.push(ActionEvent::axis(*source, Transition::Canceled, 0.0));
            }
        }
        self.last_axis_values = [0.0; 4];
        events
    }
}

// Public interface for spawning and running the collector
pub struct CollectorHandle {
    task: tokio::task::JoinHandle<()>,
}

impl CollectorHandle {
    pub fn spawn(
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<ActionEvent>,
        cancel: CancellationToken,
    ) -> Result<Self, CollectorError> {
        info!("Spawning Event Collector with settings: {:?}", settings);

        let collector = EventCollector::create(settings, event_sender)?;

        // gilrs polling is blocking, keep it off the async workers
        let task = tokio::task::spawn_blocking(move || {
            let mut collecting = collector.initialize();
            if let Err(e) = collecting.run_collection_loop(cancel) {
                error!("Collector task terminated with error: {}", e);
            }
        });

        info!("Event Collector successfully started");
        Ok(Self { task })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("Collector task panicked: {}", e);
        }
    }
}

/// Engine actions raised by a physical button
///
/// South and East also drive the UI map's Submit and Cancel.
pub fn sources_for_button(button: Button) -> &'static [ActionSource] {
    match button {
        Button::South => &[ActionSource::ButtonSouth, ActionSource::UiSubmit],
        Button::East => &[ActionSource::ButtonEast, ActionSource::UiCancel],
        Button::North => &[ActionSource::ButtonNorth],
        Button::West => &[ActionSource::ButtonWest],
        Button::LeftTrigger => &[ActionSource::LeftShoulder],
        Button::RightTrigger => &[ActionSource::RightShoulder],
        Button::LeftTrigger2 => &[ActionSource::LeftTrigger],
        Button::RightTrigger2 => &[ActionSource::RightTrigger],
        Button::Start => &[ActionSource::Start],
        Button::Select => &[ActionSource::Select],
        _ => &[],
    }
}

// Analog trigger travel (ButtonChanged) is not forwarded: only the press and
// release of a button reach the handler.
fn button_events(button: Button, transition: Transition) -> Vec<ActionEvent> {
    sources_for_button(button)
        .iter()
        .map(|&source| ActionEvent::new(source, transition, None))
        .collect()
}

/// Sends `events` in order, tracking pressed sources only for delivered ones
///
/// On a full queue the remaining events are dropped and logged; a source whose
/// `Started` or `Canceled` was dropped keeps its previous pressed state.
fn send_tracked(
    sender: &mpsc::Sender<ActionEvent>,
    pressed_sources: &mut HashSet<ActionSource>,
    events: Vec<ActionEvent>,
) -> Result<usize, CollectorError> {
    let mut sent = 0;
    let mut pending = events.into_iter();

    while let Some(event) = pending.next() {
        let (source, transition) = (event.source, event.transition);
        match sender.try_send(event) {
            Ok(()) => {
                sent += 1;
                match transition {
                    Transition::Started => {
                        pressed_sources.insert(source);
                    }
                    Transition::Canceled => {
                        pressed_sources.remove(&source);
                    }
                    Transition::Performed => {}
                }
            }
            Err(TrySendError::Full(event)) => {
                let dropped: Vec<(ActionSource, Transition)> =
                    std::iter::once((event.source, event.transition))
                        .chain(pending.map(|e| (e.source, e.transition)))
                        .collect();
                error!("Event queue full, dropping {:?}", dropped);
                return Err(CollectorError::EventSendError("queue full".to_string()));
            }
            Err(TrySendError::Closed(_)) => return Err(CollectorError::ChannelClosed),
        }
    }

    Ok(sent)
}

/// Transition for an axis moving from `previous` to `value`
pub fn axis_transition(previous: f32, value: f32) -> Transition {
    if value == 0.0 {
        Transition::Canceled
    } else if previous == 0.0 {
        Transition::Started
    } else {
        Transition::Performed
    }
}
