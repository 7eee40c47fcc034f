use std::sync::Arc;

use tailpipe_config::Config;

use crate::buffer::TelemetryBuffer;
use crate::services::sink::{EventSink, SinkError};

/// Decides whether queued telemetry is flushed to the sink.
///
/// A non-immediate dispatch flushes once the queue has reached the
/// configured batch threshold; an immediate dispatch flushes any non-empty
/// queue. The batch is evicted from the queue before the sink call settles,
/// so a failing sink loses exactly that batch; events are never re-queued
/// and the call is never retried here.
pub struct Dispatcher {
    batch_threshold: usize,
    sink: Arc<dyn EventSink>,
}

impl Dispatcher {
    /// Creates a dispatcher flushing to the given sink.
    pub fn new(config: &Config, sink: Arc<dyn EventSink>) -> Self {
        Self {
            batch_threshold: config.batch_threshold(),
            sink,
        }
    }

    /// Flushes the queue to the sink if the flush policy allows it.
    ///
    /// Returns the number of events handed to the sink, zero when the call
    /// was a no-op. By the time a sink error surfaces, the batch is no
    /// longer in the queue.
    pub async fn dispatch(
        &self,
        buffer: &TelemetryBuffer,
        immediate: bool,
    ) -> Result<usize, SinkError> {
        let pending = buffer.len();
        if pending == 0 || !(immediate || pending >= self.batch_threshold) {
            tailpipe_log::trace!("dispatch pass, {pending} events pending");
            return Ok(0);
        }

        let batch = buffer.take();
        let count = batch.len();

        tailpipe_log::debug!("dispatching {count} events");
        self.sink.send(batch).await?;

        Ok(count)
    }
}
