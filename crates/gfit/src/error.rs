//! CLI error types with miette diagnostics.
//!
//! Maps `gfit_api::Error` variants into user-facing errors with actionable
//! help text.

use miette::Diagnostic;
use thiserror::Error;

/// Exit codes for process termination.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {reason}")]
    #[diagnostic(
        code(gfit::auth_failed),
        help(
            "The stored refresh token may be expired or revoked.\n\
             Run: gfit auth login --force"
        )
    )]
    AuthFailed { reason: String },

    #[error("No refresh token found")]
    #[diagnostic(
        code(gfit::no_refresh_token),
        help(
            "Run: gfit auth login\n\
             Expected token at: {path}"
        )
    )]
    NoRefreshToken { path: String },

    #[error("A refresh token already exists at {path}")]
    #[diagnostic(
        code(gfit::token_exists),
        help("Use --force to overwrite it. The old token will stop working.")
    )]
    TokenExists { path: String },

    #[error("No client secret configured")]
    #[diagnostic(
        code(gfit::no_client_secret),
        help(
            "Download the OAuth client JSON from the Google Developers Console, then:\n\
             gfit config set client_secret /path/to/client_secret.json\n\
             or pass --client-secret / set GFIT_CLIENT_SECRET."
        )
    )]
    NoClientSecret,

    #[error("Could not read client secret at {path}")]
    #[diagnostic(
        code(gfit::client_secret_unreadable),
        help("Check the path and file permissions: {path}")
    )]
    ClientSecretUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Consent flow failed: {reason}")]
    #[diagnostic(
        code(gfit::consent_failed),
        help(
            "Make sure the loopback port is free and the redirect URI\n\
             (http://localhost:<port>) is registered for the OAuth client."
        )
    )]
    ConsentFailed { reason: String },

    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the Google Fit API")]
    #[diagnostic(
        code(gfit::connection_failed),
        help("Check your network connection and try again.")
    )]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out")]
    #[diagnostic(
        code(gfit::timeout),
        help("Increase the timeout with --timeout or GFIT_TIMEOUT.")
    )]
    Timeout,

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(gfit::api_error))]
    ApiError { code: String, message: String },

    #[error("Data source registration failed: {message}")]
    #[diagnostic(
        code(gfit::data_source),
        help("The conflict message did not match the known format; the API may have changed.")
    )]
    DataSource { message: String },

    #[error("Write not confirmed: sent {expected} steps, server echoed {got}")]
    #[diagnostic(
        code(gfit::write_verification),
        help("The dataset may be in an inconsistent state. Re-run: gfit steps get")
    )]
    WriteVerification { expected: i64, got: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(gfit::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(gfit::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(gfit::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. }
            | Self::NoRefreshToken { .. }
            | Self::NoClientSecret
            | Self::ClientSecretUnreadable { .. }
            | Self::ConsentFailed { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::TokenExists { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── gfit_api::Error → CliError mapping ───────────────────────────────

impl From<gfit_api::Error> for CliError {
    fn from(err: gfit_api::Error) -> Self {
        use gfit_api::Error;

        match err {
            Error::Authentication { message } => CliError::AuthFailed { reason: message },

            Error::MalformedAccessToken { got } => CliError::AuthFailed {
                reason: format!("token endpoint returned an unrecognized token ({got}...)"),
            },

            Error::TokenRefresh { status, body } => CliError::AuthFailed {
                reason: format!("token refresh rejected (HTTP {status}): {body}"),
            },

            Error::ConsentFlow(reason) => CliError::ConsentFailed { reason },

            Error::Transport(e) => {
                if e.is_timeout() {
                    CliError::Timeout
                } else {
                    CliError::ConnectionFailed { source: e.into() }
                }
            }

            Error::InvalidUrl(e) => CliError::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },

            Error::Api {
                message,
                code,
                status,
            } => CliError::ApiError {
                code: code.unwrap_or_else(|| status.to_string()),
                message,
            },

            Error::DataSource { message } => CliError::DataSource { message },

            Error::WriteVerification { expected, got } => CliError::WriteVerification {
                expected,
                got: got.map_or_else(|| "nothing".into(), |v| v.to_string()),
            },

            Error::Deserialization { message, body: _ } => CliError::ApiError {
                code: "malformed_response".into(),
                message,
            },

            Error::CredentialFile { path, source } => {
                CliError::ClientSecretUnreadable { path, source }
            }
        }
    }
}
