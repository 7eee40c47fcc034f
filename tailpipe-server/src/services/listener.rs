use std::net::SocketAddr;

use tokio::net::TcpListener;

use tailpipe_log::LogError;

use crate::endpoints;
use crate::service::ServiceState;

/// Failure to start the telemetry intake endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Binding the intake socket failed.
    #[error("bind to intake interface failed")]
    BindFailed(#[from] std::io::Error),
}

/// The local intake endpoint telemetry is pushed to.
///
/// The socket is bound before [`start`](Self::start) returns, so the
/// returned URI is reachable by the time it is handed to the telemetry
/// subscription. Request handling runs as a background task and only ever
/// appends to the shared queue.
#[derive(Debug)]
pub struct TelemetryListener {
    uri: String,
    local_addr: SocketAddr,
}

impl TelemetryListener {
    /// Binds the configured address and starts serving the intake app.
    pub async fn start(state: ServiceState) -> Result<Self, ListenerError> {
        let config = state.config().clone();

        let listener = TcpListener::bind(config.listener_addr()).await?;
        let local_addr = listener.local_addr()?;
        let uri = format!("http://{}:{}", config.advertise_host(), local_addr.port());

        let app = endpoints::routes().with_state(state);
        tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                tailpipe_log::error!("telemetry listener failed: {}", LogError(&error));
            }
        });

        tailpipe_log::info!("telemetry listener bound on http://{local_addr}/");

        Ok(Self { uri, local_addr })
    }

    /// The URI advertised to the host as the telemetry destination.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The locally bound socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
