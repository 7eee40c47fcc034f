//! Execution of the command line interface.

use std::path::PathBuf;

use anyhow::{Context, Result};

use tailpipe_config::Config;

use crate::cliapp;
use crate::setup;

/// Runs the command line application.
pub fn execute() -> Result<()> {
    let matches = cliapp::make_app().get_matches();

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let config =
        Config::load(config_path.as_deref()).context("could not load configuration")?;

    tailpipe_log::init(config.logging());
    setup::dump_spawn_infos(&config);
    setup::check_config(&config)?;

    match matches.subcommand() {
        None | Some(("run", _)) => run(config),
        _ => unreachable!(),
    }
}

/// Runs the extension on a bespoke single-threaded runtime.
///
/// All activity in the engine is cooperative; one scheduler thread carries
/// the poll loop and the intake endpoint.
fn run(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not build the async runtime")?;

    runtime.block_on(tailpipe_server::run(config))
}
