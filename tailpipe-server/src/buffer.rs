use std::sync::Arc;

use parking_lot::Mutex;

/// A single telemetry record as pushed by the host platform.
///
/// Events are opaque to the extension: they are buffered and shipped without
/// being inspected or modified.
pub type TelemetryEvent = serde_json::Value;

/// The queue shared between the intake endpoint and the dispatcher.
///
/// The listener is the sole appender and the dispatcher the sole drainer.
/// [`take`](Self::take) copies and clears the queue in one critical section,
/// so an event can never end up in two batches; events appended while a
/// batch is in flight belong to the next batch.
#[derive(Clone, Debug, Default)]
pub struct TelemetryBuffer {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl TelemetryBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends events, preserving their arrival order.
    pub fn extend(&self, events: impl IntoIterator<Item = TelemetryEvent>) {
        self.events.lock().extend(events);
    }

    /// Removes and returns all queued events.
    ///
    /// The queue is empty when this returns. There is no suspension point
    /// between the copy and the clear.
    pub fn take(&self) -> Vec<TelemetryEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if no events are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extend_preserves_order() {
        let buffer = TelemetryBuffer::new();
        buffer.extend([json!({"seq": 1}), json!({"seq": 2})]);
        buffer.extend([json!({"seq": 3})]);

        let taken = buffer.take();
        assert_eq!(taken, vec![json!({"seq": 1}), json!({"seq": 2}), json!({"seq": 3})]);
    }

    #[test]
    fn test_take_clears() {
        let buffer = TelemetryBuffer::new();
        buffer.extend([json!("a"), json!("b")]);

        assert_eq!(buffer.take().len(), 2);
        assert!(buffer.is_empty());
        assert!(buffer.take().is_empty());
    }

    #[test]
    fn test_events_after_take_belong_to_next_batch() {
        let buffer = TelemetryBuffer::new();
        buffer.extend([json!("a")]);

        let first = buffer.take();
        buffer.extend([json!("b")]);
        let second = buffer.take();

        assert_eq!(first, vec![json!("a")]);
        assert_eq!(second, vec![json!("b")]);
    }
}
