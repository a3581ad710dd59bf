//! HTTP client factory with consistent timeout configuration.
//!
//! Outbound clients should be built here rather than with
//! `reqwest::Client::builder()` directly.

use reqwest::Client;
use std::time::Duration;

/// Default connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build an HTTP client with the default connect timeout and the given total
/// request timeout.
pub fn try_build_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
}
