use thiserror::Error;

/// Top-level error type for the `gfit-api` crate.
///
/// Covers every failure mode across the client: OAuth2 token handling,
/// the interactive consent flow, HTTP transport, and the Fitness REST API.
/// The CLI maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Bearer auth was rejected by the API (expired or revoked token).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The token endpoint returned something that does not look like a
    /// Google access token (expected `ya29.` prefix).
    #[error("Access token has an unexpected shape: {got}")]
    MalformedAccessToken { got: String },

    /// Token refresh was rejected. Carries the raw response body so the
    /// caller sees exactly what the endpoint said.
    #[error("Token refresh rejected (HTTP {status}): {body}")]
    TokenRefresh { status: u16, body: String },

    /// The interactive consent flow failed before a token pair was issued.
    #[error("Consent flow failed: {0}")]
    ConsentFlow(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Fitness API ─────────────────────────────────────────────────
    /// Structured error from the Fitness API (parsed from the
    /// `{error: {code, status, message}}` envelope).
    #[error("Fitness API error (HTTP {status}): {message}")]
    Api {
        message: String,
        /// The envelope's status string, e.g. `ALREADY_EXISTS`.
        code: Option<String>,
        status: u16,
    },

    /// Data-source resolution failed (unexpected API response shape).
    #[error("Data source resolution failed: {message}")]
    DataSource { message: String },

    /// The dataset patch response did not echo the written value.
    /// Signals a potential silent data-acceptance bug upstream.
    #[error("Write verification failed: wrote {expected} steps, server echoed {got:?}")]
    WriteVerification { expected: i64, got: Option<i64> },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Files ───────────────────────────────────────────────────────
    /// Reading the client-secret or refresh-token file failed.
    #[error("Failed to read {path}: {source}")]
    CredentialFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-running the consent flow might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::TokenRefresh { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` if the API reported a conflict (HTTP 409).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status: 409, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_expiry_covers_refresh_rejection() {
        let err = Error::TokenRefresh {
            status: 400,
            body: r#"{"error": "invalid_grant"}"#.into(),
        };
        assert!(err.is_auth_expired());
        assert!(!err.is_transient());
    }

    #[test]
    fn conflict_matches_409_only() {
        let conflict = Error::Api {
            message: "Data Source: XYZ already exists".into(),
            code: Some("ALREADY_EXISTS".into()),
            status: 409,
        };
        assert!(conflict.is_conflict());

        let forbidden = Error::Api {
            message: "nope".into(),
            code: Some("PERMISSION_DENIED".into()),
            status: 403,
        };
        assert!(!forbidden.is_conflict());
    }
}
