use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use tailpipe_config::{Buffering, Config, TelemetryType};

use crate::services::extensions_api::{ExtensionId, EXTENSION_ID_HEADER};

/// Schema version of the telemetry subscription body.
const TELEMETRY_SCHEMA_VERSION: &str = "2022-12-13";

/// Failure to subscribe with the telemetry API.
///
/// Without a subscription no telemetry is ever pushed, so this is fatal at
/// startup.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    /// The runtime API address does not form a valid URL.
    #[error("invalid runtime API address")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// The telemetry API could not be reached.
    #[error("could not reach the telemetry API")]
    Transport(#[from] reqwest::Error),

    /// The telemetry API rejected the subscription.
    #[error("telemetry API rejected the subscription with status {0}")]
    Rejected(StatusCode),
}

/// Wire body of the subscription request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeRequest<'a> {
    schema_version: &'static str,
    types: &'a [TelemetryType],
    buffering: &'a Buffering,
    destination: Destination<'a>,
}

#[derive(Debug, Serialize)]
struct Destination<'a> {
    protocol: &'static str,
    #[serde(rename = "URI")]
    uri: &'a str,
}

/// Client for the host's telemetry API.
#[derive(Clone, Debug)]
pub struct TelemetryApi {
    /// The url of the telemetry subscription endpoint.
    url: Url,
    /// The client to make telemetry API requests with.
    client: Client,
}

impl TelemetryApi {
    /// Creates a client for the given runtime API address.
    pub fn new(runtime_api: &str, client: Client) -> Result<Self, SubscribeError> {
        let url = format!("http://{runtime_api}/2022-07-01/telemetry").parse()?;
        Ok(Self { url, client })
    }

    /// Subscribes the given destination for telemetry pushes.
    ///
    /// Must be called exactly once, after the destination is accepting
    /// connections and before the first lifecycle poll; telemetry emitted in
    /// between would otherwise never be delivered.
    pub async fn subscribe(
        &self,
        id: &ExtensionId,
        config: &Config,
        destination_uri: &str,
    ) -> Result<(), SubscribeError> {
        let body = SubscribeRequest {
            schema_version: TELEMETRY_SCHEMA_VERSION,
            types: config.telemetry_types(),
            buffering: config.telemetry_buffering(),
            destination: Destination {
                protocol: "HTTP",
                uri: destination_uri,
            },
        };

        let response = self
            .client
            .put(self.url.clone())
            .header(EXTENSION_ID_HEADER, id.as_str())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SubscribeError::Rejected(response.status()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_subscription_wire_format() {
        let config = Config::default();
        let body = SubscribeRequest {
            schema_version: TELEMETRY_SCHEMA_VERSION,
            types: config.telemetry_types(),
            buffering: config.telemetry_buffering(),
            destination: Destination {
                protocol: "HTTP",
                uri: "http://sandbox.localdomain:4243",
            },
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "schemaVersion": "2022-12-13",
                "types": ["platform", "function", "extension"],
                "buffering": {
                    "maxItems": 1000,
                    "maxBytes": 262144,
                    "timeoutMs": 100,
                },
                "destination": {
                    "protocol": "HTTP",
                    "URI": "http://sandbox.localdomain:4243",
                },
            })
        );
    }
}
