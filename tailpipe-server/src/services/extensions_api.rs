use std::collections::HashMap;
use std::fmt;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

/// Header carrying the extension name on registration.
pub(crate) const EXTENSION_NAME_HEADER: &str = "Lambda-Extension-Name";

/// Header carrying the extension identity on every call after registration.
pub(crate) const EXTENSION_ID_HEADER: &str = "Lambda-Extension-Identifier";

/// Identity assigned to this process by the extensions API.
///
/// Obtained once at registration, immutable for the process lifetime, and
/// sent with every subsequent lifecycle and telemetry call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtensionId(String);

impl ExtensionId {
    /// The identity as the header value it is sent as.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response received from the register API.
///
/// # Example
///
/// ```json
/// {
///    "functionName": "helloWorld",
///    "functionVersion": "$LATEST",
///    "handler": "lambda_function.lambda_handler"
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// The name of the observed function.
    pub function_name: String,
    /// The version of the observed function.
    pub function_version: String,
    /// The handler the function invokes.
    pub handler: String,
}

/// Payload of an `INVOKE` lifecycle event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeEvent {
    /// Unique request identifier.
    pub request_id: String,
    /// The time and date when the invocation times out, in Unix time
    /// milliseconds.
    pub deadline_ms: u64,
}

/// Payload of a `SHUTDOWN` lifecycle event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownEvent {
    /// The reason for the shutdown.
    pub shutdown_reason: String,
    /// The time and date when the sandbox is force-terminated, in Unix time
    /// milliseconds.
    pub deadline_ms: u64,
}

/// A lifecycle event delivered by the `next` long poll.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE", tag = "eventType")]
pub enum NextEvent {
    /// A function invocation has started.
    Invoke(InvokeEvent),
    /// The sandbox is about to be terminated.
    Shutdown(ShutdownEvent),
}

/// Failure to register with the extensions API.
///
/// Registration is not retried; without an identity the process cannot
/// proceed.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    /// The runtime API address does not form a valid URL.
    #[error("invalid runtime API address")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// The extensions API could not be reached.
    #[error("could not reach the extensions API")]
    Transport(#[from] reqwest::Error),

    /// The extensions API rejected the registration.
    #[error("extensions API rejected registration with status {0}")]
    Rejected(StatusCode),

    /// The response carried no identity header.
    #[error("registration response is missing the extension identifier")]
    MissingIdentity,
}

/// Failure while long-polling for the next lifecycle event.
///
/// Not retried here; the lifecycle funnels every variant into the graceful
/// drain path.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The extensions API could not be reached.
    #[error("could not reach the extensions API")]
    Transport(#[from] reqwest::Error),

    /// The extensions API returned an error status.
    #[error("extensions API returned status {0}")]
    Rejected(StatusCode),

    /// The event payload could not be decoded.
    #[error("could not decode lifecycle event")]
    Decode(#[source] serde_json::Error),

    /// The host delivered an event this extension does not understand.
    #[error("unrecognized lifecycle event: {0}")]
    UnrecognizedEvent(String),
}

/// Client for the host's extensions API.
///
/// Registers the process as an extension and long-polls for lifecycle
/// events. Note that the host might freeze the sandbox indefinitely while
/// the function is idle, so the `next` call can stay pending across freezes
/// and must run on a client without meaningful timeouts.
#[derive(Clone, Debug)]
pub struct ExtensionsApi {
    /// The base url for the extensions API.
    base_url: Url,
    /// The name this process registers under.
    extension_name: String,
    /// The client to make extensions API requests with.
    client: Client,
}

impl ExtensionsApi {
    /// Creates a client for the given runtime API address.
    pub fn new(
        runtime_api: &str,
        extension_name: &str,
        client: Client,
    ) -> Result<Self, RegisterError> {
        let base_url = format!("http://{runtime_api}/2020-01-01/extension").parse()?;

        Ok(Self {
            base_url,
            extension_name: extension_name.to_owned(),
            client,
        })
    }

    /// Registers this process with the host.
    ///
    /// The returned identity is required by every subsequent lifecycle and
    /// telemetry call and never changes.
    pub async fn register(&self) -> Result<ExtensionId, RegisterError> {
        tailpipe_log::info!("registering extension on {}", self.base_url);
        let body = HashMap::from([("events", ["INVOKE", "SHUTDOWN"])]);

        let response = self
            .client
            .post(format!("{}/register", self.base_url))
            .header(EXTENSION_NAME_HEADER, &self.extension_name)
            .json(&body)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(RegisterError::Rejected(response.status()));
        }

        let extension_id = response
            .headers()
            .get(EXTENSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .ok_or(RegisterError::MissingIdentity)?;

        if let Ok(info) = response.json::<RegisterResponse>().await {
            tailpipe_log::info!(
                "registered for function {} ({}), handler {}",
                info.function_name,
                info.function_version,
                info.handler
            );
        }

        Ok(ExtensionId(extension_id))
    }

    /// Long-polls the host for the next lifecycle event.
    ///
    /// Blocks until the host has an event for this extension.
    pub async fn next(&self, id: &ExtensionId) -> Result<NextEvent, PollError> {
        let response = self
            .client
            .get(format!("{}/event/next", self.base_url))
            .header(EXTENSION_ID_HEADER, id.as_str())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PollError::Rejected(response.status()));
        }

        let payload = response.bytes().await?;
        decode_event(&payload)
    }
}

/// Decodes a lifecycle event, distinguishing an event type this extension
/// does not know from a broken payload.
fn decode_event(payload: &[u8]) -> Result<NextEvent, PollError> {
    match serde_json::from_slice::<NextEvent>(payload) {
        Ok(event) => Ok(event),
        Err(error) => match serde_json::from_slice::<serde_json::Value>(payload) {
            Ok(value)
                if value
                    .get("eventType")
                    .and_then(serde_json::Value::as_str)
                    .is_some_and(|ty| ty != "INVOKE" && ty != "SHUTDOWN") =>
            {
                Err(PollError::UnrecognizedEvent(value.to_string()))
            }
            _ => Err(PollError::Decode(error)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_invoke() {
        let event = decode_event(
            br#"{
                "eventType": "INVOKE",
                "deadlineMs": 676051,
                "requestId": "3da1f2dc-3222-475e-9205-e2e6c6318895",
                "invokedFunctionArn": "arn:aws:lambda:us-east-1:123456789012:function:test",
                "tracing": {"type": "X-Amzn-Trace-Id", "value": "Root=1-5f35ae12"}
            }"#,
        )
        .unwrap();

        match event {
            NextEvent::Invoke(invoke) => {
                assert_eq!(invoke.request_id, "3da1f2dc-3222-475e-9205-e2e6c6318895");
                assert_eq!(invoke.deadline_ms, 676051);
            }
            other => panic!("expected INVOKE, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_shutdown() {
        let event = decode_event(
            br#"{"eventType": "SHUTDOWN", "shutdownReason": "TIMEOUT", "deadlineMs": 42069}"#,
        )
        .unwrap();

        match event {
            NextEvent::Shutdown(shutdown) => assert_eq!(shutdown.shutdown_reason, "TIMEOUT"),
            other => panic!("expected SHUTDOWN, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unrecognized_event() {
        let result = decode_event(br#"{"eventType": "HIBERNATE", "deadlineMs": 1}"#);

        match result {
            Err(PollError::UnrecognizedEvent(raw)) => assert!(raw.contains("HIBERNATE")),
            other => panic!("expected unrecognized event, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_broken_payload() {
        assert!(matches!(
            decode_event(b"not json at all"),
            Err(PollError::Decode(_))
        ));
        assert!(matches!(
            decode_event(br#"{"eventType": "INVOKE"}"#),
            Err(PollError::Decode(_))
        ));
    }
}
