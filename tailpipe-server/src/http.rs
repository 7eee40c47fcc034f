use reqwest::{Client, ClientBuilder};

use tailpipe_config::Config;

/// Builds the client used for all host API calls.
///
/// Note that the sandbox might get frozen while the function is idle, so the
/// configured timeouts are hour-scale and idle pool connections never
/// expire; the platform's own invocation-duration limits bound every call.
pub fn client(config: &Config) -> reqwest::Result<Client> {
    ClientBuilder::new()
        .connect_timeout(config.connect_timeout())
        .timeout(config.http_timeout())
        .pool_idle_timeout(None)
        .build()
}
