use std::env;
use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tailpipe_log::LogConfig;

/// Maximum number of records the stream accepts in a single put call.
///
/// `dispatch.batch_threshold` must stay at or below this value so that a
/// threshold-triggered flush always fits into one call.
pub const MAX_RECORDS_PER_CALL: usize = 500;

/// Environment variable carrying the host runtime API address.
const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// Indicates config related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("could not read config file {path}")]
    CouldNotReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Parsing YAML failed.
    #[error("could not parse yaml config file {path}")]
    BadYaml {
        /// Path of the file that could not be parsed.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A field override from the environment did not parse.
    #[error("invalid value in environment override {0}")]
    InvalidOverride(&'static str),

    /// The runtime API address is not known.
    #[error("extension.runtime_api is not configured and {RUNTIME_API_ENV} is not set")]
    MissingRuntimeApi,
}

/// Identity of this process towards the host platform.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Extension {
    /// Name under which the process registers with the extensions API.
    pub name: String,

    /// Address of the host runtime API as `host:port`.
    ///
    /// Defaults to the address the platform publishes in
    /// `AWS_LAMBDA_RUNTIME_API`. Setting this explicitly is only useful for
    /// running against a stand-in host.
    pub runtime_api: Option<String>,
}

impl Default for Extension {
    fn default() -> Self {
        Self {
            name: "tailpipe".to_owned(),
            runtime_api: None,
        }
    }
}

/// The local intake endpoint telemetry is pushed to.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Listener {
    /// Network interface to bind.
    pub host: IpAddr,

    /// Port to bind. Port 0 picks an ephemeral port.
    pub port: u16,

    /// Host name under which the endpoint is advertised to the platform.
    ///
    /// The platform reaches the sandbox-local listener under this name, not
    /// under the bind interface.
    pub advertise_host: String,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 4243,
            advertise_host: "sandbox.localdomain".to_owned(),
        }
    }
}

/// A telemetry category the host can push.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryType {
    /// Events generated by the platform itself.
    Platform,
    /// Log lines produced by the function.
    Function,
    /// Log lines produced by extensions.
    Extension,
}

/// Host-side buffering hints for the telemetry subscription.
///
/// These bound how the host batches pushes towards the listener; they do not
/// affect the extension's own dispatch batching.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Buffering {
    /// Maximum number of events buffered host-side before a push.
    pub max_items: u32,
    /// Maximum number of bytes buffered host-side before a push.
    pub max_bytes: u32,
    /// Maximum time in milliseconds the host buffers before a push.
    pub timeout_ms: u32,
}

impl Default for Buffering {
    fn default() -> Self {
        Self {
            max_items: 1000,
            max_bytes: 262_144,
            timeout_ms: 100,
        }
    }
}

/// Telemetry subscription parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Telemetry {
    /// Telemetry categories to subscribe to.
    pub types: Vec<TelemetryType>,

    /// Host-side buffering hints.
    pub buffering: Buffering,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            types: vec![
                TelemetryType::Platform,
                TelemetryType::Function,
                TelemetryType::Extension,
            ],
            buffering: Buffering::default(),
        }
    }
}

/// The shape of the record payload written to the stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadShape {
    /// Each record carries the serialized JSON telemetry event.
    Structured,
    /// String events are written verbatim, without JSON quoting.
    Raw,
}

/// Flush policy for queued telemetry.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Dispatch {
    /// Queue length at which a non-immediate dispatch flushes.
    ///
    /// Deployment profiles use 5 (low latency) or 50 (fewer, larger puts).
    /// Must stay within 1 and [`MAX_RECORDS_PER_CALL`].
    pub batch_threshold: usize,

    /// Grace period in milliseconds before the final flush on graceful
    /// shutdown, allowing in-flight telemetry to reach the listener.
    pub drain_window_ms: u64,

    /// Payload shape of stream records.
    pub payload: PayloadShape,
}

impl Default for Dispatch {
    fn default() -> Self {
        Self {
            batch_threshold: 5,
            drain_window_ms: 300,
            payload: PayloadShape::Structured,
        }
    }
}

/// The downstream stream receiving dispatched batches.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Sink {
    /// Name of the stream.
    pub stream_name: String,

    /// Optional endpoint override, for local stream stand-ins.
    pub endpoint: Option<String>,
}

impl Default for Sink {
    fn default() -> Self {
        Self {
            stream_name: "lambda-telemetry".to_owned(),
            endpoint: None,
        }
    }
}

/// Outbound HTTP client settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Http {
    /// Total request timeout in seconds.
    ///
    /// Effectively disabled by default (one hour): the sandbox can be frozen
    /// between invocations and the `next` long poll must survive that. The
    /// platform's own duration limits bound every call.
    pub timeout: u64,

    /// Connect timeout in seconds.
    pub connect_timeout: u64,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            timeout: 3600,
            connect_timeout: 3600,
        }
    }
}

/// Config struct for the extension.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Identity towards the host platform.
    pub extension: Extension,

    /// The local telemetry intake endpoint.
    pub listener: Listener,

    /// Telemetry subscription parameters.
    pub telemetry: Telemetry,

    /// Flush policy for queued telemetry.
    pub dispatch: Dispatch,

    /// The downstream stream.
    pub sink: Sink,

    /// Outbound HTTP client settings.
    pub http: Http,

    /// Logging.
    pub logging: LogConfig,
}

impl Config {
    /// Loads the config from the given YAML file, then applies environment
    /// overrides.
    ///
    /// Without a path, the defaults plus the environment overrides are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::CouldNotReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&raw).map_err(|source| ConfigError::BadYaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies the environment overrides used to select deployment profiles.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = env::var("TAILPIPE_STREAM_NAME") {
            self.sink.stream_name = value;
        }

        if let Ok(value) = env::var("TAILPIPE_BATCH_THRESHOLD") {
            self.dispatch.batch_threshold = value
                .parse()
                .map_err(|_| ConfigError::InvalidOverride("TAILPIPE_BATCH_THRESHOLD"))?;
        }

        if let Ok(value) = env::var("TAILPIPE_PAYLOAD") {
            self.dispatch.payload = match value.as_str() {
                "structured" => PayloadShape::Structured,
                "raw" => PayloadShape::Raw,
                _ => return Err(ConfigError::InvalidOverride("TAILPIPE_PAYLOAD")),
            };
        }

        Ok(())
    }

    /// Name under which the process registers with the extensions API.
    pub fn extension_name(&self) -> &str {
        &self.extension.name
    }

    /// Address of the host runtime API as `host:port`.
    pub fn runtime_api(&self) -> Result<String, ConfigError> {
        if let Some(address) = &self.extension.runtime_api {
            return Ok(address.clone());
        }

        env::var(RUNTIME_API_ENV).map_err(|_| ConfigError::MissingRuntimeApi)
    }

    /// Socket address the intake endpoint binds.
    pub fn listener_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listener.host, self.listener.port)
    }

    /// Host name under which the intake endpoint is advertised.
    pub fn advertise_host(&self) -> &str {
        &self.listener.advertise_host
    }

    /// Telemetry categories to subscribe to.
    pub fn telemetry_types(&self) -> &[TelemetryType] {
        &self.telemetry.types
    }

    /// Host-side buffering hints for the subscription.
    pub fn telemetry_buffering(&self) -> &Buffering {
        &self.telemetry.buffering
    }

    /// Queue length at which a non-immediate dispatch flushes.
    pub fn batch_threshold(&self) -> usize {
        self.dispatch.batch_threshold
    }

    /// Grace period before the final flush on graceful shutdown.
    pub fn drain_window(&self) -> Duration {
        Duration::from_millis(self.dispatch.drain_window_ms)
    }

    /// Payload shape of stream records.
    pub fn payload_shape(&self) -> PayloadShape {
        self.dispatch.payload
    }

    /// Name of the downstream stream.
    pub fn stream_name(&self) -> &str {
        &self.sink.stream_name
    }

    /// Optional stream endpoint override.
    pub fn sink_endpoint(&self) -> Option<&str> {
        self.sink.endpoint.as_deref()
    }

    /// Total timeout for outbound HTTP requests.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout)
    }

    /// Connect timeout for outbound HTTP requests.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout)
    }

    /// The logging configuration.
    pub fn logging(&self) -> &LogConfig {
        &self.logging
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.extension_name(), "tailpipe");
        assert_eq!(config.listener_addr().port(), 4243);
        assert_eq!(config.advertise_host(), "sandbox.localdomain");
        assert_eq!(config.telemetry_types().len(), 3);
        assert_eq!(config.batch_threshold(), 5);
        assert_eq!(config.drain_window(), Duration::from_millis(300));
        assert_eq!(config.payload_shape(), PayloadShape::Structured);
        assert_eq!(config.stream_name(), "lambda-telemetry");
        assert_eq!(config.sink_endpoint(), None);
        assert_eq!(config.http_timeout(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_profile() {
        let config: Config = serde_yaml::from_str(
            r#"
            dispatch:
              batch_threshold: 50
              payload: raw
            sink:
              stream_name: telemetry-prod
            telemetry:
              types: [platform, function]
              buffering:
                maxItems: 500
            "#,
        )
        .unwrap();

        assert_eq!(config.batch_threshold(), 50);
        assert_eq!(config.payload_shape(), PayloadShape::Raw);
        assert_eq!(config.stream_name(), "telemetry-prod");
        assert_eq!(
            config.telemetry_types(),
            [TelemetryType::Platform, TelemetryType::Function]
        );
        assert_eq!(config.telemetry_buffering().max_items, 500);
        // Unset sections keep their defaults.
        assert_eq!(config.drain_window(), Duration::from_millis(300));
    }

    #[test]
    fn test_runtime_api_prefers_config() {
        let config: Config = serde_yaml::from_str(
            r#"
            extension:
              runtime_api: "127.0.0.1:9001"
            "#,
        )
        .unwrap();

        assert_eq!(config.runtime_api().unwrap(), "127.0.0.1:9001");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("TAILPIPE_STREAM_NAME", "telemetry-override");
        env::set_var("TAILPIPE_BATCH_THRESHOLD", "50");
        env::set_var("TAILPIPE_PAYLOAD", "raw");

        let config = Config::load(None).unwrap();

        env::remove_var("TAILPIPE_STREAM_NAME");
        env::remove_var("TAILPIPE_BATCH_THRESHOLD");
        env::remove_var("TAILPIPE_PAYLOAD");

        assert_eq!(config.stream_name(), "telemetry-override");
        assert_eq!(config.batch_threshold(), 50);
        assert_eq!(config.payload_shape(), PayloadShape::Raw);

        // A malformed override is rejected instead of silently ignored.
        // Checked in the same test to keep environment mutation serial.
        env::set_var("TAILPIPE_BATCH_THRESHOLD", "lots");
        let result = Config::load(None);
        env::remove_var("TAILPIPE_BATCH_THRESHOLD");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidOverride("TAILPIPE_BATCH_THRESHOLD"))
        ));
    }
}
