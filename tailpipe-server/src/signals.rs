//! Termination signal handling.
//!
//! Signal-driven shutdown is deliberately abrupt: the process exits at once
//! with a success status and without a drain window. The graceful drain is
//! reserved for host-ordered `SHUTDOWN` events.

use std::process;

/// Spawns the task that exits the process on a termination signal.
pub fn spawn_exit_handler() {
    tokio::spawn(exit_on_signal());
}

#[cfg(unix)]
async fn exit_on_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let signals = signal(SignalKind::interrupt()).and_then(|interrupt| {
        signal(SignalKind::terminate()).map(|terminate| (interrupt, terminate))
    });

    let (mut interrupt, mut terminate) = match signals {
        Ok(signals) => signals,
        Err(error) => {
            tailpipe_log::error!("could not install signal handlers: {error}");
            return;
        }
    };

    let received = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
    };

    tailpipe_log::info!("{received} received, exiting");
    process::exit(0);
}

#[cfg(not(unix))]
async fn exit_on_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tailpipe_log::info!("interrupt received, exiting");
        process::exit(0);
    }
}
