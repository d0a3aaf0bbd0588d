//! Controller Handle - lifecycle of the collector and processor pair
//!
//! ```text
//! CollectorHandle ─[ActionEvent]→ ProcessorHandle ─[InputSnapshot]→ gameplay
//!                 (mpsc::channel)                  (watch::channel)
//! ```
//!
//! Both tasks share one [`CancellationToken`]; [`ControllerHandle::shutdown`]
//! cancels it and waits for both to finish, so no tick runs against a torn
//! down handler.

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::analog::AnalogSettings;
use super::event_collector::{CollectorError, CollectorHandle, CollectorSettings};
use super::event_processor::{ProcessorError, ProcessorHandle, ProcessorSettings};
use super::input_handler::InputSnapshot;
use crate::config::InputConfig;

/// Settings for the complete controller subsystem
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    /// Frame length of the processor in milliseconds
    pub tick_interval_ms: u64,

    /// Capacity of the collector → processor queue
    pub event_buffer: usize,

    /// Sleep between gilrs polls in microseconds
    pub poll_interval_us: u64,

    pub analog: AnalogSettings,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            event_buffer: 1000,
            poll_interval_us: 100,
            analog: AnalogSettings::default(),
        }
    }
}

impl From<&InputConfig> for ControllerSettings {
    fn from(config: &InputConfig) -> Self {
        Self {
            tick_interval_ms: config.controller.tick_interval_ms,
            event_buffer: config.controller.event_buffer,
            poll_interval_us: config.controller.poll_interval_us,
            analog: config.analog.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Collector error: {0}")]
    CollectorError(#[from] CollectorError),

    #[error("Processor error: {0}")]
    ProcessorError(#[from] ProcessorError),
}

pub struct ControllerHandle {
    collector: CollectorHandle,
    processor: ProcessorHandle,
    cancel: CancellationToken,
}

impl ControllerHandle {
    /// Spawns collector and processor; uses defaults if `settings` is None
    pub fn spawn(settings: Option<ControllerSettings>) -> Result<Self, ControllerError> {
        info!(
            "Initializing Controller system with settings: {:?}",
            settings
        );
        let settings = settings.unwrap_or_default();

        let collector_settings = CollectorSettings {
            poll_interval_us: settings.poll_interval_us,
        };
        let processor_settings = ProcessorSettings {
            tick_interval_ms: settings.tick_interval_ms,
        };

        let (event_sender, event_receiver) = mpsc::channel(settings.event_buffer.max(1));
        debug!(
            "Created event channel with buffer capacity {}",
            settings.event_buffer
        );

        let cancel = CancellationToken::new();

        let collector =
            CollectorHandle::spawn(Some(collector_settings), event_sender, cancel.child_token())?;
        let processor = ProcessorHandle::spawn(
            event_receiver,
            Some(processor_settings),
            settings.analog,
            cancel.child_token(),
        );

        info!("Controller system initialized successfully");
        Ok(Self {
            collector,
            processor,
            cancel,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<InputSnapshot> {
        debug!("New subscriber to input state");
        self.processor.subscribe()
    }

    pub fn is_running(&self) -> bool {
        !self.collector.is_finished() && !self.processor.is_finished()
    }

    /// Cancels both tasks and waits until they have stopped
    pub async fn shutdown(self) {
        info!("Shutting down controller system");
        self.cancel.cancel();
        self.processor.join().await;
        self.collector.join().await;
        info!("Controller system stopped");
    }
}
