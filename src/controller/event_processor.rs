use chrono::Local;
use statum::{machine, state};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::action::ActionEvent;
use super::analog::AnalogSettings;
use super::input_handler::{InputHandler, InputSnapshot};

// Events drained from the queue for one tick
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub events: Vec<ActionEvent>,
}

// Processor settings
#[derive(Clone, Debug)]
pub struct ProcessorSettings {
    pub tick_interval_ms: u64,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
        }
    }
}

// Processor errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("Event channel disconnected")]
    ChannelClosed,

    #[error("Failed to publish input snapshot: {0}")]
    StateUpdateError(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum ProcessingState {
    Waiting,
    Processing(EventBatch),
    Updating,
}

#[machine]
#[derive(Debug)]
pub struct EventProcessor<S: ProcessingState> {
    event_receiver: mpsc::Receiver<ActionEvent>,

    settings: ProcessorSettings,

    handler: InputHandler,

    state_sender: watch::Sender<InputSnapshot>,
}

impl<S: ProcessingState> EventProcessor<S> {
    pub fn subscribe(&self) -> watch::Receiver<InputSnapshot> {
        self.state_sender.subscribe()
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    pub fn handler(&self) -> &InputHandler {
        &self.handler
    }
}

impl EventProcessor<Waiting> {
    pub fn create(
        event_receiver: mpsc::Receiver<ActionEvent>,
        settings: Option<ProcessorSettings>,
        analog_settings: AnalogSettings,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        info!("Creating Event Processor with settings: {:?}", settings);

        let handler = InputHandler::new(analog_settings);
        let (state_sender, _) = watch::channel(handler.snapshot());

        Self::new(event_receiver, settings, handler, state_sender)
    }

    // Drain everything queued since the last tick
    pub fn wait_and_collect(mut self) -> Result<EventProcessor<Processing>, ProcessorError> {
        let mut events = Vec::new();

        loop {
            match self.event_receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    // Still apply what arrived before the hang-up
                    if events.is_empty() {
                        error!("Event channel disconnected!");
                        return Err(ProcessorError::ChannelClosed);
                    }
                    break;
                }
            }
        }

        if !events.is_empty() {
            debug!("Collected batch of {} events", events.len());
        }

        Ok(self.transition_with(EventBatch { events }))
    }

    pub fn shutdown(mut self) -> Self {
        self.handler.shutdown();
        if self.state_sender.send(self.handler.snapshot()).is_err() {
            debug!("No subscribers left for the final snapshot");
        }
        self
    }
}

impl EventProcessor<Processing> {
    // Clear last tick's edges, apply the batch in arrival order, then update sticks
    pub fn process_events(mut self) -> EventProcessor<Updating> {
        let events = match self.get_state_data() {
            Some(batch) => batch.events.clone(),
            None => {
                warn!("No event batch found in state data, this should not happen");
                Vec::new()
            }
        };

        self.handler.begin_frame();

        let mut applied = 0;
        for event in &events {
            if self.handler.handle(event) {
                applied += 1;
            }
        }
        if applied > 0 {
            debug!(
                "Frame {}: applied {} of {} events",
                self.handler.frame(),
                applied,
                events.len()
            );
        }

        self.handler.update_sticks();
        self.transition()
    }
}

impl EventProcessor<Updating> {
    // Publish the snapshot and go back to Waiting
    pub fn update_state(self) -> Result<EventProcessor<Waiting>, ProcessorError> {
        let snapshot = self.handler.snapshot();

        for (input, state) in snapshot.active_inputs() {
            if state.down || state.up {
                info!(
                    "Frame {}: {} down={} up={} held={}",
                    snapshot.frame, input, state.down, state.up, state.held
                );
            }
        }

        if let Err(e) = self.state_sender.send(snapshot) {
            error!("Failed to publish input snapshot: {}", e);
            return Err(ProcessorError::StateUpdateError(e.to_string()));
        }

        Ok(self.transition())
    }
}

impl EventProcessor<Waiting> {
    /// One full tick: collect, process, publish
    pub fn run_cycle(self) -> Result<(EventProcessor<Waiting>, usize), ProcessorError> {
        let processing = self.wait_and_collect()?;
        let event_count = processing
            .get_state_data()
            .map(|batch| batch.events.len())
            .unwrap_or(0);
        let processor = processing.process_events().update_state()?;
        Ok((processor, event_count))
    }
}

// Public interface for spawning and running the processor
pub struct ProcessorHandle {
    state_receiver: watch::Receiver<InputSnapshot>,
    task: tokio::task::JoinHandle<()>,
}

impl ProcessorHandle {
    pub fn spawn(
        event_receiver: mpsc::Receiver<ActionEvent>,
        settings: Option<ProcessorSettings>,
        analog_settings: AnalogSettings,
        cancel: CancellationToken,
    ) -> Self {
        info!("Spawning Event Processor with settings: {:?}", settings);

        let processor = EventProcessor::create(event_receiver, settings, analog_settings);
        let state_receiver = processor.subscribe();

        let task = tokio::spawn(async move {
            if let Err(e) = run_processor_loop(processor, cancel).await {
                error!("Processor task terminated with error: {}", e);
            }
        });

        info!("Event Processor successfully started");
        Self {
            state_receiver,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<InputSnapshot> {
        self.state_receiver.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("Processor task panicked: {}", e);
        }
    }
}

// Ticks until cancelled; the handler is shut down before returning
pub async fn run_processor_loop(
    mut processor: EventProcessor<Waiting>,
    cancel: CancellationToken,
) -> Result<(), ProcessorError> {
    let tick_interval_ms = processor.settings().tick_interval_ms;
    info!("Starting processor loop with {}ms ticks", tick_interval_ms);

    let mut interval_timer =
        tokio::time::interval(tokio::time::Duration::from_millis(tick_interval_ms));
    interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut cycles: u64 = 0;
    let mut total_events = 0;
    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(30);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Processor cancelled after {} cycles", cycles);
                processor.shutdown();
                return Ok(());
            }
            _ = interval_timer.tick() => {}
        }

        let (next, event_count) = match processor.run_cycle() {
            Ok(result) => result,
            Err(ProcessorError::ChannelClosed) => {
                info!("Event channel closed, stopping processor");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        processor = next;
        cycles += 1;
        total_events += event_count;

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            info!(
                "Processor stats: {} cycles, {} events in {} seconds ({:.2} cycles/sec)",
                cycles,
                total_events,
                elapsed_seconds,
                cycles as f64 / elapsed_seconds as f64
            );
            cycles = 0;
            total_events = 0;
            last_stats_time = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::action::{ActionSource, LogicalInput, Transition};
    use glam::Vec2;

    fn processor() -> (mpsc::Sender<ActionEvent>, EventProcessor<Waiting>) {
        let (tx, rx) = mpsc::channel(64);
        let processor = EventProcessor::create(rx, None, AnalogSettings::default());
        (tx, processor)
    }

    #[tokio::test]
    async fn press_is_published_for_one_tick() {
        let (tx, processor) = processor();
        let state = processor.subscribe();

        tx.send(ActionEvent::started(ActionSource::ButtonSouth))
            .await
            .unwrap();
        let (processor, count) = processor.run_cycle().unwrap();
        assert_eq!(count, 1);
        {
            let snapshot = state.borrow();
            assert_eq!(snapshot.frame, 1);
            assert!(snapshot.query_down(LogicalInput::ButtonSouth));
            assert!(snapshot.query_held(LogicalInput::ButtonSouth));
        }

        let (_processor, count) = processor.run_cycle().unwrap();
        assert_eq!(count, 0);
        let snapshot = state.borrow();
        assert_eq!(snapshot.frame, 2);
        assert!(!snapshot.query_down(LogicalInput::ButtonSouth));
        assert!(snapshot.query_held(LogicalInput::ButtonSouth));
    }

    #[tokio::test]
    async fn sticks_use_samples_from_the_same_tick() {
        let (tx, processor) = processor();
        let state = processor.subscribe();

        tx.send(ActionEvent::axis(
            ActionSource::RightVerticalMove,
            Transition::Started,
            -0.9,
        ))
        .await
        .unwrap();
        let (_processor, _) = processor.run_cycle().unwrap();

        let snapshot = state.borrow();
        assert!(snapshot.right_stick.angled.abs_diff_eq(Vec2::new(0.0, -1.0), 1e-5));
        assert_eq!(snapshot.left_stick.angled, Vec2::ZERO);
    }

    #[tokio::test]
    async fn events_queued_before_hangup_are_applied() {
        let (tx, processor) = processor();
        let state = processor.subscribe();

        tx.send(ActionEvent::started(ActionSource::Start)).await.unwrap();
        drop(tx);

        let (processor, _) = processor.run_cycle().unwrap();
        assert!(state.borrow().query_down(LogicalInput::Start));

        assert!(matches!(
            processor.run_cycle(),
            Err(ProcessorError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn shutdown_publishes_empty_state() {
        let (tx, processor) = processor();
        let state = processor.subscribe();

        tx.send(ActionEvent::started(ActionSource::Select)).await.unwrap();
        let (processor, _) = processor.run_cycle().unwrap();
        assert!(state.borrow().query_held(LogicalInput::Select));

        let processor = processor.shutdown();
        assert!(!processor.handler().is_alive());
        assert!(!state.borrow().query_held(LogicalInput::Select));
    }

    #[tokio::test]
    async fn loop_stops_on_cancel() {
        let (_tx, processor) = processor();
        let state = processor.subscribe();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_processor_loop(processor, cancel.clone()));
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(tokio::time::Duration::from_secs(1), task)
            .await
            .expect("processor loop did not stop")
            .expect("processor task panicked");
        assert!(result.is_ok());
        assert!(state.borrow().active_inputs().is_empty());
    }
}
