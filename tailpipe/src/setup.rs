//! Startup checks and diagnostics.

use anyhow::Result;

use tailpipe_config::{Config, MAX_RECORDS_PER_CALL};

/// Prints spawn information to the log.
pub fn dump_spawn_infos(config: &Config) {
    tailpipe_log::info!("launching extension {}", config.extension_name());
    tailpipe_log::info!("  stream: {}", config.stream_name());
    tailpipe_log::info!("  batch threshold: {}", config.batch_threshold());
    tailpipe_log::info!("  drain window: {:?}", config.drain_window());
}

/// Validates configuration invariants that only matter at runtime.
pub fn check_config(config: &Config) -> Result<()> {
    let threshold = config.batch_threshold();
    if threshold == 0 || threshold > MAX_RECORDS_PER_CALL {
        anyhow::bail!(
            "dispatch.batch_threshold is {threshold} but must be between 1 and \
             {MAX_RECORDS_PER_CALL}, the stream's records-per-call limit"
        );
    }

    if config.stream_name().is_empty() {
        anyhow::bail!("sink.stream_name must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        check_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_threshold_bounds() {
        let mut config = Config::default();

        config.dispatch.batch_threshold = 0;
        assert!(check_config(&config).is_err());

        config.dispatch.batch_threshold = MAX_RECORDS_PER_CALL;
        assert!(check_config(&config).is_ok());

        config.dispatch.batch_threshold = MAX_RECORDS_PER_CALL + 1;
        assert!(check_config(&config).is_err());
    }

    #[test]
    fn test_stream_name_must_be_set() {
        let mut config = Config::default();
        config.sink.stream_name = String::new();
        assert!(check_config(&config).is_err());
    }
}
