//! Definition of the command line interface.

use clap::{Arg, Command};

const ABOUT: &str = "Ships Lambda Telemetry API events to a Kinesis stream.";

/// Builds the command line parser.
pub fn make_app() -> Command {
    Command::new("tailpipe")
        .about(ABOUT)
        .disable_help_subcommand(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .global(true)
                .help("The path to the config file."),
        )
        .subcommand(
            Command::new("run").about("Run the extension (the default when no command is given)"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_app() {
        make_app().debug_assert();
    }

    #[test]
    fn test_config_arg() {
        let matches = make_app()
            .try_get_matches_from(["tailpipe", "-c", "/opt/tailpipe.yml", "run"])
            .unwrap();

        assert_eq!(
            matches.get_one::<String>("config").map(String::as_str),
            Some("/opt/tailpipe.yml")
        );
        assert_eq!(matches.subcommand_name(), Some("run"));
    }
}
