use async_trait::async_trait;
use aws_sdk_kinesis::error::DisplayErrorContext;
use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::types::PutRecordsRequestEntry;
use aws_sdk_kinesis::Client;
use uuid::Uuid;

use tailpipe_config::{Config, PayloadShape};

use crate::buffer::TelemetryEvent;

/// Failure to hand a batch to the downstream stream.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// An event could not be serialized into a record payload.
    #[error("could not serialize telemetry event")]
    Serialize(#[from] serde_json::Error),

    /// A stream record could not be built.
    #[error("could not build stream record")]
    Record(#[from] aws_sdk_kinesis::error::BuildError),

    /// The put call failed.
    #[error("could not put records to the stream: {0}")]
    Submit(String),
}

/// Downstream destination for dispatched batches.
///
/// The dispatcher hands each batch to exactly one `send` call. Implementors
/// submit the whole batch in a single bounded call and do not retry;
/// delivery is best effort.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Submits one batch of events.
    async fn send(&self, batch: Vec<TelemetryEvent>) -> Result<(), SinkError>;
}

/// Sink writing batches to an Amazon Kinesis data stream.
///
/// Each event becomes one record; the whole batch goes out in a single
/// `PutRecords` call. The batch threshold is validated at startup to stay
/// within the records-per-call limit, so a batch always fits.
pub struct KinesisSink {
    client: Client,
    stream_name: String,
    payload: PayloadShape,
}

impl KinesisSink {
    /// Creates a sink for the configured stream.
    ///
    /// Credentials and region resolve from the execution environment, the
    /// way the platform provides them to the sandbox.
    pub async fn create(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(endpoint) = config.sink_endpoint() {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            stream_name: config.stream_name().to_owned(),
            payload: config.payload_shape(),
        }
    }
}

#[async_trait]
impl EventSink for KinesisSink {
    async fn send(&self, batch: Vec<TelemetryEvent>) -> Result<(), SinkError> {
        let records = make_records(batch, self.payload)?;

        let output = self
            .client
            .put_records()
            .stream_name(&self.stream_name)
            .set_records(Some(records))
            .send()
            .await
            .map_err(|error| SinkError::Submit(DisplayErrorContext(&error).to_string()))?;

        // PutRecords can reject individual records without failing the call.
        let failed = output.failed_record_count().unwrap_or(0);
        if failed > 0 {
            tailpipe_log::warn!("{failed} records were not accepted by the stream");
        }

        Ok(())
    }
}

/// Builds the wire records for one batch, preserving event order.
fn make_records(
    batch: Vec<TelemetryEvent>,
    payload: PayloadShape,
) -> Result<Vec<PutRecordsRequestEntry>, SinkError> {
    batch
        .into_iter()
        .map(|event| {
            let data = match payload {
                PayloadShape::Structured => serde_json::to_vec(&event)?,
                PayloadShape::Raw => match event {
                    TelemetryEvent::String(line) => line.into_bytes(),
                    other => other.to_string().into_bytes(),
                },
            };

            let record = PutRecordsRequestEntry::builder()
                .data(Blob::new(data))
                .partition_key(Uuid::new_v4().to_string())
                .build()?;

            Ok(record)
        })
        .collect()
}
