// Shared transport configuration for building reqwest::Client instances.
//
// Every request is bounded by the configured timeout; an expired request
// surfaces as a transport failure, identical to any other failed call.

use std::time::Duration;

/// Transport configuration for building the HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("roster/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}
