//! OAuth2 credential handling.
//!
//! [`ClientSecret`] is the Google Developers Console credential file,
//! [`Credentials`] the immutable value the client operates with, and
//! [`AuthManager`] exchanges the long-lived refresh token for short-lived
//! access tokens, refreshing on demand with a small cache.
//!
//! Interactive consent is behind the [`ConsentFlow`] trait so tests can
//! substitute a stub; [`LocalRedirectFlow`] is the production
//! implementation that listens for the browser redirect on localhost.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{TokenPair, TokenResponse};
use crate::transport::{DEFAULT_TOKEN_URL, TransportConfig};

/// Scopes requested when generating a refresh token. Changing this set
/// invalidates existing refresh tokens.
pub const FITNESS_SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/fitness.activity.read",
    "https://www.googleapis.com/auth/fitness.location.read",
    "https://www.googleapis.com/auth/fitness.body.read",
    "https://www.googleapis.com/auth/fitness.activity.write",
];

/// Every Google user access token starts with this prefix.
const ACCESS_TOKEN_PREFIX: &str = "ya29.";

/// Default consent-flow auth endpoint when the secret file omits one.
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Refresh this far before the reported expiry.
const EARLY_REFRESH_MARGIN_SECS: i64 = 60;

/// Assumed lifetime when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

// ── Client secret ────────────────────────────────────────────────────

/// OAuth app credentials from the Google Developers Console
/// (`client_secret.json`, "installed application" shape).
#[derive(Debug, Clone)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: SecretString,
    pub auth_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: InstalledApp,
}

#[derive(Deserialize)]
struct InstalledApp {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    auth_uri: Option<String>,
}

impl ClientSecret {
    /// Parse the client-secret JSON document.
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let file: ClientSecretFile =
            serde_json::from_str(raw).map_err(|e| Error::Deserialization {
                message: format!("invalid client secret file: {e}"),
                body: String::new(),
            })?;
        Ok(Self {
            client_id: file.installed.client_id,
            client_secret: SecretString::from(file.installed.client_secret),
            auth_uri: file
                .installed
                .auth_uri
                .unwrap_or_else(|| DEFAULT_AUTH_URI.into()),
        })
    }

    /// Read and parse the client-secret JSON file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::CredentialFile {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&raw)
    }
}

// ── Credentials ──────────────────────────────────────────────────────

/// Immutable credential value: OAuth app identity plus the long-lived
/// refresh token. Constructed once and passed by reference; nothing
/// mutates it across calls.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
}

impl Credentials {
    pub fn new(secret: &ClientSecret, refresh_token: SecretString) -> Self {
        Self {
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            refresh_token,
        }
    }
}

// ── Access-token validation ──────────────────────────────────────────

/// Reject token strings that don't carry the expected `ya29.` prefix.
///
/// A malformed token here usually means the endpoint answered with an
/// error document that slipped through as a 200.
pub(crate) fn ensure_token_shape(token: &str) -> Result<(), Error> {
    if token.starts_with(ACCESS_TOKEN_PREFIX) {
        Ok(())
    } else {
        let got = token.chars().take(16).collect::<String>();
        Err(Error::MalformedAccessToken { got })
    }
}

// ── AuthManager ──────────────────────────────────────────────────────

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges the refresh token for bearer access tokens.
///
/// Tokens are cached until shortly before their reported expiry and
/// refreshed on demand; callers just ask for [`AuthManager::access_token`]
/// before each request.
pub struct AuthManager {
    credentials: Credentials,
    http: reqwest::Client,
    token_url: Url,
    cached: Mutex<Option<CachedToken>>,
}

impl AuthManager {
    pub fn new(credentials: Credentials, http: reqwest::Client, token_url: Url) -> Self {
        Self {
            credentials,
            http,
            token_url,
            cached: Mutex::new(None),
        }
    }

    /// A currently-valid bearer token, refreshed if the cached one is
    /// absent or expires within the refresh margin.
    pub async fn access_token(&self) -> Result<String, Error> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            let deadline = Utc::now() + Duration::seconds(EARLY_REFRESH_MARGIN_SECS);
            if token.expires_at > deadline {
                return Ok(token.access_token.clone());
            }
            debug!("cached access token near expiry, refreshing");
        }

        let fresh = self.refresh_access_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    /// POST a `grant_type=refresh_token` exchange to the token endpoint.
    ///
    /// On non-success the raw response body is surfaced unchanged so the
    /// caller sees exactly what the endpoint rejected.
    async fn refresh_access_token(&self) -> Result<CachedToken, Error> {
        debug!("refreshing access token at {}", self.token_url);

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.client_id.as_str()),
            (
                "client_secret",
                self.credentials.client_secret.expose_secret(),
            ),
            (
                "refresh_token",
                self.credentials.refresh_token.expose_secret(),
            ),
        ];

        let resp = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::TokenRefresh {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        ensure_token_shape(&token.access_token)?;

        let lifetime = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        })
    }
}

// ── Consent flow ─────────────────────────────────────────────────────

/// Interactive token acquisition, pluggable so automated tests can
/// substitute a stub returning a fixed token pair.
#[allow(async_fn_in_trait)]
pub trait ConsentFlow {
    /// Run the flow to completion and return the issued token pair.
    async fn authorize(&self, secret: &ClientSecret) -> Result<TokenPair, Error>;
}

/// The production consent flow: print a consent URL, listen on a loopback
/// port for the browser redirect, then exchange the authorization code.
///
/// Blocks until the user completes consent in a browser. The refresh
/// token it yields makes sense to obtain only once; store it and exchange
/// it for access tokens afterwards.
pub struct LocalRedirectFlow {
    port: u16,
    token_url: Url,
    http: reqwest::Client,
}

impl LocalRedirectFlow {
    /// Default flow on port 8080 against the production token endpoint.
    pub fn new() -> Self {
        Self {
            port: 8080,
            token_url: Url::parse(DEFAULT_TOKEN_URL).expect("invalid token URL"),
            http: reqwest::Client::new(),
        }
    }

    /// Flow wired to a specific transport (mock servers in tests).
    pub fn from_transport(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            port: 8080,
            token_url: transport.token_url.clone(),
            http: transport.build_client()?,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Build the URL the user must visit to grant consent.
    fn consent_url(&self, secret: &ClientSecret) -> Result<Url, Error> {
        let mut url = Url::parse(&secret.auth_uri).map_err(Error::InvalidUrl)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &secret.client_id)
            .append_pair("redirect_uri", &self.redirect_uri())
            .append_pair("scope", &FITNESS_SCOPES.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url)
    }

    /// Accept one connection on the loopback listener and pull the
    /// authorization code out of the redirect query string.
    async fn wait_for_code(&self) -> Result<String, Error> {
        let listener = TcpListener::bind(("127.0.0.1", self.port))
            .await
            .map_err(|e| Error::ConsentFlow(format!("cannot listen on port {}: {e}", self.port)))?;

        let (mut stream, peer) = listener
            .accept()
            .await
            .map_err(|e| Error::ConsentFlow(format!("accept failed: {e}")))?;
        debug!("consent redirect from {}", peer);

        let mut request_line = String::new();
        {
            let mut reader = BufReader::new(&mut stream);
            reader
                .read_line(&mut request_line)
                .await
                .map_err(|e| Error::ConsentFlow(format!("failed to read redirect: {e}")))?;
        }

        // "GET /?code=... HTTP/1.1"
        let path = request_line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| Error::ConsentFlow("malformed redirect request".into()))?;
        let redirect =
            Url::parse(&format!("http://localhost{path}")).map_err(Error::InvalidUrl)?;

        let mut code = None;
        for (key, value) in redirect.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "error" => {
                    return Err(Error::ConsentFlow(format!("consent denied: {value}")));
                }
                _ => {}
            }
        }

        let response = "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\n\r\n\
                        The auth flow is complete; you may close this window.";
        stream
            .write_all(response.as_bytes())
            .await
            .map_err(|e| Error::ConsentFlow(format!("failed to answer browser: {e}")))?;
        stream.flush().await.ok();

        code.ok_or_else(|| Error::ConsentFlow("redirect carried no authorization code".into()))
    }

    /// Exchange the authorization code for an access + refresh token pair.
    async fn exchange_code(&self, secret: &ClientSecret, code: &str) -> Result<TokenPair, Error> {
        let redirect_uri = self.redirect_uri();
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &secret.client_id),
            ("client_secret", secret.client_secret.expose_secret()),
            ("redirect_uri", &redirect_uri),
        ];

        let resp = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::TokenRefresh {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            })?;

        let refresh_token = token.refresh_token.ok_or_else(|| {
            Error::ConsentFlow("token endpoint issued no refresh token".into())
        })?;

        Ok(TokenPair {
            access_token: token.access_token,
            refresh_token,
        })
    }
}

impl Default for LocalRedirectFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsentFlow for LocalRedirectFlow {
    async fn authorize(&self, secret: &ClientSecret) -> Result<TokenPair, Error> {
        let url = self.consent_url(secret)?;
        eprintln!("Please visit this URL: {url}");

        let code = self.wait_for_code().await?;
        debug!("authorization code received, exchanging for tokens");
        self.exchange_code(secret, &code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_google_shaped_tokens() {
        assert!(ensure_token_shape("ya29.a0AfB_byCdEf").is_ok());
    }

    #[test]
    fn rejects_foreign_tokens() {
        let err = ensure_token_shape("{\"error\": \"invalid_grant\"}")
            .expect_err("non-ya29 token must be rejected");
        assert!(matches!(err, Error::MalformedAccessToken { .. }));
    }

    #[test]
    fn parses_installed_app_secret() {
        let raw = r#"{
            "installed": {
                "client_id": "1099052750196.apps.googleusercontent.com",
                "client_secret": "shhh",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://accounts.google.com/o/oauth2/token",
                "redirect_uris": ["http://localhost"]
            }
        }"#;
        let secret = ClientSecret::from_json(raw).expect("valid secret file");
        assert_eq!(secret.client_id, "1099052750196.apps.googleusercontent.com");
        assert_eq!(secret.auth_uri, "https://accounts.google.com/o/oauth2/auth");
    }

    #[test]
    fn secret_without_auth_uri_gets_default() {
        let raw = r#"{"installed": {"client_id": "id", "client_secret": "s"}}"#;
        let secret = ClientSecret::from_json(raw).expect("valid secret file");
        assert_eq!(secret.auth_uri, DEFAULT_AUTH_URI);
    }

    #[test]
    fn consent_url_carries_scopes_and_redirect() {
        let secret = ClientSecret {
            client_id: "id".into(),
            client_secret: SecretString::from("s"),
            auth_uri: DEFAULT_AUTH_URI.into(),
        };
        let flow = LocalRedirectFlow::new().with_port(9191);
        let url = flow.consent_url(&secret).expect("consent url builds");
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("response_type".into(), "code".into())));
        assert!(query.contains(&("redirect_uri".into(), "http://localhost:9191".into())));
        assert!(query.contains(&("access_type".into(), "offline".into())));
        let scope = query
            .iter()
            .find(|(k, _)| k == "scope")
            .map(|(_, v)| v.clone())
            .expect("scope param present");
        assert!(scope.contains("fitness.activity.write"));
    }
}
