//! The tailpipe extension engine.
//!
//! The engine registers the process as an extension with the host platform,
//! starts a local intake endpoint, subscribes that endpoint with the host's
//! telemetry API, and then long-polls for lifecycle events. Telemetry pushed
//! by the host is appended to a shared queue; on each invocation event the
//! dispatcher flushes the queue to the downstream stream once it reaches the
//! configured batch threshold, and on shutdown a short drain window is
//! granted before one final immediate flush.
//!
//! Delivery is best effort: a batch is evicted from the queue before the
//! stream call settles, and termination signals exit immediately without a
//! drain window.

use std::sync::Arc;

use anyhow::Context;

use tailpipe_config::Config;

mod buffer;
mod endpoints;
mod http;
mod service;
mod services;
mod signals;

#[cfg(test)]
mod testutils;

pub use self::buffer::{TelemetryBuffer, TelemetryEvent};
pub use self::service::ServiceState;
pub use self::services::dispatcher::Dispatcher;
pub use self::services::extensions_api::{
    ExtensionId, ExtensionsApi, InvokeEvent, NextEvent, PollError, RegisterError,
    RegisterResponse, ShutdownEvent,
};
pub use self::services::lifecycle::{ExtensionError, ExtensionLifecycle};
pub use self::services::listener::{ListenerError, TelemetryListener};
pub use self::services::sink::{EventSink, KinesisSink, SinkError};
pub use self::services::telemetry_api::{SubscribeError, TelemetryApi};

/// Runs the extension until the host tears the sandbox down.
///
/// Fatal startup failures (registration, listener, subscription) are
/// returned as errors; once the poll loop is entered every exit goes through
/// the graceful drain path and resolves to `Ok`.
pub async fn run(config: Config) -> anyhow::Result<()> {
    signals::spawn_exit_handler();

    let config = Arc::new(config);
    let runtime_api = config.runtime_api()?;
    let client =
        http::client(&config).context("could not build the outbound HTTP client")?;

    let sink = KinesisSink::create(&config).await;
    let state = ServiceState::new(config.clone());
    let extensions = ExtensionsApi::new(&runtime_api, config.extension_name(), client.clone())?;
    let telemetry = TelemetryApi::new(&runtime_api, client)?;
    let dispatcher = Dispatcher::new(&config, Arc::new(sink));

    ExtensionLifecycle::new(state, extensions, telemetry, dispatcher)
        .run()
        .await?;

    Ok(())
}
