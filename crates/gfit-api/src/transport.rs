// Shared transport configuration for building reqwest::Client instances.
//
// The auth manager and the Fit client share timeout and endpoint settings
// through this module. Both endpoints default to www.googleapis.com but are
// overridable so tests can point the client at a mock server.

use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Production base URL for the Fitness REST API (trailing slash matters
/// for `Url::join`).
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/fitness/v1/";

/// Production OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub api_base: Url,
    pub token_url: Url,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            api_base: Url::parse(DEFAULT_API_BASE).expect("invalid API base URL"),
            token_url: Url::parse(DEFAULT_TOKEN_URL).expect("invalid token URL"),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("gfit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Transport)
    }

    /// Point both the API base and the token endpoint at `base`.
    ///
    /// Used by tests to substitute a mock server for googleapis.com;
    /// the production paths are preserved under the new host.
    pub fn with_base_url(mut self, base: &Url) -> Result<Self, Error> {
        self.api_base = base.join("fitness/v1/").map_err(Error::InvalidUrl)?;
        self.token_url = base.join("oauth2/v4/token").map_err(Error::InvalidUrl)?;
        Ok(self)
    }
}
