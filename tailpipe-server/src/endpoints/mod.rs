//! Endpoints of the telemetry intake server.

use axum::routing::post;
use axum::Router;

use crate::service::ServiceState;

mod telemetry;

/// Builds the intake application's routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/", post(telemetry::handle))
}
