//! Receives telemetry pushed by the host platform.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::buffer::TelemetryEvent;
use crate::service::ServiceState;

/// Handles a telemetry push from the host.
///
/// Appends the events to the shared queue in arrival order and responds
/// right away. Acknowledgement never waits on queue consumption or the
/// sink; a slow response here throttles the host's own push pipeline.
pub async fn handle(
    State(state): State<ServiceState>,
    Json(events): Json<Vec<TelemetryEvent>>,
) -> impl IntoResponse {
    tailpipe_log::trace!("received {} telemetry events", events.len());
    state.buffer().extend(events);
    StatusCode::OK
}
