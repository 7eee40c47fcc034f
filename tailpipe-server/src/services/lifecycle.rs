use tokio::time;

use tailpipe_log::LogError;

use crate::service::ServiceState;
use crate::services::dispatcher::Dispatcher;
use crate::services::extensions_api::{ExtensionId, ExtensionsApi, NextEvent, RegisterError};
use crate::services::listener::{ListenerError, TelemetryListener};
use crate::services::telemetry_api::{SubscribeError, TelemetryApi};

/// Fatal startup failure of the extension.
///
/// Only startup can fail the process: once the poll loop is entered, every
/// error takes the graceful drain path instead of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    /// Registration with the extensions API failed.
    #[error("could not register with the extensions API")]
    Register(#[from] RegisterError),

    /// The intake endpoint could not be started.
    #[error("could not start the telemetry listener")]
    Listener(#[from] ListenerError),

    /// The telemetry subscription failed.
    #[error("could not subscribe to the telemetry API")]
    Subscribe(#[from] SubscribeError),
}

/// Why the poll loop ended and the drain phase began.
#[derive(Debug)]
enum DrainReason {
    /// The host delivered a `SHUTDOWN` event.
    Shutdown(String),
    /// Polling or dispatching failed; the loop does not resume.
    Failed,
}

/// Outcome of one turn of the poll loop.
enum Turn {
    /// Keep polling.
    Continue,
    /// Stop polling and drain.
    Drain(DrainReason),
}

/// Drives the extension through its lifecycle.
///
/// Register, start the listener, subscribe, then long-poll for lifecycle
/// events until the host orders a shutdown. The poll loop is the single
/// error boundary: any failure while awaiting the next event or dispatching
/// is logged and funnelled into the same drain path as a regular `SHUTDOWN`.
/// Draining waits the configured grace window for in-flight telemetry, then
/// flushes the queue once, immediately.
pub struct ExtensionLifecycle {
    state: ServiceState,
    extensions: ExtensionsApi,
    telemetry: TelemetryApi,
    dispatcher: Dispatcher,
}

impl ExtensionLifecycle {
    /// Creates the lifecycle with all collaborators wired.
    pub fn new(
        state: ServiceState,
        extensions: ExtensionsApi,
        telemetry: TelemetryApi,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            state,
            extensions,
            telemetry,
            dispatcher,
        }
    }

    /// Runs the extension until the host tears the sandbox down.
    ///
    /// Returns an error only for fatal startup failures; after startup all
    /// exits go through the drain path and resolve to `Ok`.
    pub async fn run(self) -> Result<(), ExtensionError> {
        let identity = self.extensions.register().await?;

        // The listener must accept connections before the subscription is
        // made, and the subscription must complete before the first poll;
        // telemetry emitted in between would otherwise be lost.
        let listener = TelemetryListener::start(self.state.clone()).await?;
        self.telemetry
            .subscribe(&identity, self.state.config(), listener.uri())
            .await?;
        tailpipe_log::info!("subscribed telemetry destination {}", listener.uri());

        let reason = loop {
            match self.turn(&identity).await {
                Turn::Continue => {}
                Turn::Drain(reason) => break reason,
            }
        };

        match reason {
            DrainReason::Shutdown(reason) => {
                tailpipe_log::info!("host ordered shutdown ({reason}), draining")
            }
            DrainReason::Failed => tailpipe_log::info!("poll loop ended on error, draining"),
        }

        self.drain().await;
        Ok(())
    }

    /// One turn of the poll loop: await the next lifecycle event and react.
    async fn turn(&self, identity: &ExtensionId) -> Turn {
        match self.extensions.next(identity).await {
            Ok(NextEvent::Invoke(invoke)) => {
                tailpipe_log::debug!(
                    "INVOKE {} (deadline {})",
                    invoke.request_id,
                    invoke.deadline_ms
                );

                match self.dispatcher.dispatch(self.state.buffer(), false).await {
                    Ok(_) => Turn::Continue,
                    Err(error) => {
                        // The evicted batch is already lost at this point.
                        tailpipe_log::error!("dispatch failed: {}", LogError(&error));
                        Turn::Drain(DrainReason::Failed)
                    }
                }
            }
            Ok(NextEvent::Shutdown(shutdown)) => {
                tailpipe_log::debug!(
                    "SHUTDOWN {} (deadline {})",
                    shutdown.shutdown_reason,
                    shutdown.deadline_ms
                );
                Turn::Drain(DrainReason::Shutdown(shutdown.shutdown_reason))
            }
            Err(error) => {
                tailpipe_log::error!("awaiting the next event failed: {}", LogError(&error));
                Turn::Drain(DrainReason::Failed)
            }
        }
    }

    /// Waits the drain window for in-flight telemetry, then flushes once.
    ///
    /// The final flush is best effort; its failure is logged and the exit
    /// status stays successful since the sandbox is going away either way.
    async fn drain(&self) {
        time::sleep(self.state.config().drain_window()).await;

        match self.dispatcher.dispatch(self.state.buffer(), true).await {
            Ok(count) => tailpipe_log::info!("final dispatch flushed {count} events"),
            Err(error) => {
                tailpipe_log::error!("final dispatch failed: {}", LogError(&error))
            }
        }
    }
}
