use std::sync::Arc;

use tailpipe_config::Config;

use crate::buffer::TelemetryBuffer;

/// State shared between the intake endpoint and the lifecycle.
///
/// Cheap to clone; handed to the intake router as application state.
#[derive(Clone, Debug)]
pub struct ServiceState {
    config: Arc<Config>,
    buffer: TelemetryBuffer,
}

impl ServiceState {
    /// Creates the shared state for the given configuration.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            buffer: TelemetryBuffer::new(),
        }
    }

    /// The extension's configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The queue shared by the listener and the dispatcher.
    pub fn buffer(&self) -> &TelemetryBuffer {
        &self.buffer
    }
}
