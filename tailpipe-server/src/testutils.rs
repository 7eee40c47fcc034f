//! Helpers for exercising services in tests.

use std::net::{IpAddr, Ipv4Addr};
use std::ops::RangeInclusive;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use tailpipe_config::Config;

use crate::buffer::{TelemetryBuffer, TelemetryEvent};
use crate::services::sink::{EventSink, SinkError};

/// A config bound to loopback with a short drain window.
pub fn loopback_config() -> Config {
    let mut config = Config::default();
    config.listener.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.listener.port = 0;
    config.listener.advertise_host = "127.0.0.1".to_owned();
    config.dispatch.drain_window_ms = 20;
    config
}

/// Numbered telemetry events `{"seq": n}` for the given range.
pub fn events(range: RangeInclusive<usize>) -> Vec<TelemetryEvent> {
    range.map(|seq| json!({ "seq": seq })).collect()
}

/// Sink recording every batch it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    batches: Arc<Mutex<Vec<Vec<TelemetryEvent>>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<TelemetryEvent>> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn send(&self, batch: Vec<TelemetryEvent>) -> Result<(), SinkError> {
        self.batches.lock().push(batch);
        Ok(())
    }
}

/// Sink failing every call, optionally recording the queue length it
/// observed at send time.
#[derive(Default)]
pub struct FailingSink {
    observed: Option<TelemetryBuffer>,
    queue_len_at_send: Mutex<Option<usize>>,
}

impl FailingSink {
    /// A failing sink that records the given queue's length on each send.
    pub fn observing(buffer: TelemetryBuffer) -> Self {
        Self {
            observed: Some(buffer),
            queue_len_at_send: Mutex::new(None),
        }
    }

    /// The queue length observed during the last send, if any send happened.
    pub fn queue_len_at_send(&self) -> Option<usize> {
        *self.queue_len_at_send.lock()
    }
}

#[async_trait]
impl EventSink for FailingSink {
    async fn send(&self, _batch: Vec<TelemetryEvent>) -> Result<(), SinkError> {
        if let Some(buffer) = &self.observed {
            *self.queue_len_at_send.lock() = Some(buffer.len());
        }
        Err(SinkError::Submit("stream unavailable".to_owned()))
    }
}
