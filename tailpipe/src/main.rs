//! tailpipe is a sidecar extension for serverless functions. It runs next to
//! the function's execution environment, receives the telemetry the platform
//! pushes during invocations, and relays it in size-bounded batches to a
//! Kinesis data stream without adding latency to the invocations themselves.
//!
//! # Workspace Crates
//!
//! The workspace is split into the following crates:
//!
//!  - `tailpipe`: Main entry point and command line interface.
//!  - [`tailpipe-config`]: Static configuration and deployment profiles.
//!  - [`tailpipe-log`]: Logging facade.
//!  - [`tailpipe-server`]: Lifecycle, intake endpoint and dispatch engine.
//!
//! [`tailpipe-config`]: ../tailpipe_config/index.html
//! [`tailpipe-log`]: ../tailpipe_log/index.html
//! [`tailpipe-server`]: ../tailpipe_server/index.html

mod cli;
mod cliapp;
mod setup;

use std::process;

pub fn main() {
    let exit_code = match cli::execute() {
        Ok(()) => 0,
        Err(err) => {
            tailpipe_log::ensure_error(err.as_ref());
            1
        }
    };

    process::exit(exit_code);
}
