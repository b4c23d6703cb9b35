//! HTTP helpers shared by the remote sinks.

use std::time::Duration;

use reqwest::Client;

use crate::error::{Error, Result};

/// Default HTTP timeout for remote sinks.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a configured HTTP client with `timeout` per request.
#[must_use]
pub fn create_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Validates a sink URL.
pub fn validate_url(url: &str) -> Result<()> {
    let has_valid_scheme = ["http://", "https://"].iter().any(|s| url.starts_with(s));
    if !has_valid_scheme {
        return Err(Error::Config(format!(
            "Invalid URL scheme in '{}'. Allowed: http, https",
            url
        )));
    }
    if url.len() < 10 {
        return Err(Error::Config(format!("Invalid URL format: {}", url)));
    }
    Ok(())
}

/// Bulk endpoint under `base`.
#[must_use]
pub fn bulk_url(base: &str) -> String {
    format!("{}/_bulk", base.trim_end_matches('/'))
}

/// Single-document endpoint for `id` under `base`.
#[must_use]
pub fn document_url(base: &str, id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), id)
}
