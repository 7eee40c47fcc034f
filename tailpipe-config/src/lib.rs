//! Configuration for the tailpipe extension.
//!
//! The configuration is loaded from an optional YAML file and a small set of
//! environment overrides used to select deployment profiles. All sections
//! have defaults, so the extension also runs entirely unconfigured inside a
//! sandbox that provides the runtime API address in the environment.

#![warn(missing_docs)]

mod config;
pub use config::*;
