//! Logging facade for the tailpipe extension.
//!
//! # Setup
//!
//! To enable logging, invoke the [`init`] function with a [`LogConfig`]. The
//! configuration implements `serde` traits, so it can be embedded in the
//! extension's configuration file.
//!
//! ```
//! let config = tailpipe_log::LogConfig {
//!     enable_backtraces: true,
//!     ..Default::default()
//! };
//!
//! tailpipe_log::init(&config);
//! ```
//!
//! # Logging
//!
//! The five level macros [`error!`], [`warn!`], [`info!`], [`debug!`] and
//! [`trace!`] are re-exported from `tracing` and accept the usual format
//! arguments.
//!
//! ## Conventions
//!
//! Log messages should start lowercase and end without punctuation. Prefer
//! short and precise log messages over verbose text. Choose the log level
//! according to these rules:
//!
//! - [`error!`] for bugs and invalid behavior.
//! - [`warn!`] for undesirable behavior.
//! - [`info!`] for messages relevant to the average operator.
//! - [`debug!`] for messages usually relevant to debugging.
//! - [`trace!`] for full auxiliary information.

#![warn(missing_docs)]

mod setup;
pub use setup::*;

mod utils;
pub use utils::*;

// Expose the minimal log facade.
#[doc(inline)]
pub use tracing::{debug, error, info, trace, warn};
