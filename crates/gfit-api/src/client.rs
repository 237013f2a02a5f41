// Fit REST client
//
// Wraps `reqwest::Client` with bearer-auth request helpers and Google
// error-envelope parsing. Endpoint operations (data source, steps) are
// implemented as inherent methods in separate files to keep this module
// focused on transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::{AuthManager, Credentials};
use crate::error::Error;
use crate::models::ApiErrorEnvelope;
use crate::transport::TransportConfig;

/// Client for the Google Fit REST API, bound to one account's credentials.
///
/// Construction walks a fixed sequence -- acquire an access token, then
/// resolve the data-source id -- and aborts with a descriptive error if
/// either step fails. Once built, every operation refreshes the bearer
/// token on demand through the shared [`AuthManager`].
pub struct FitClient {
    http: reqwest::Client,
    auth: AuthManager,
    api_base: Url,
    data_source_id: String,
}

impl FitClient {
    /// Connect with the given credentials: validates auth by acquiring an
    /// access token, then registers-or-resolves the step data source.
    pub async fn connect(
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let auth = AuthManager::new(credentials, http.clone(), transport.token_url.clone());

        // Fail fast on bad credentials before touching the Fitness API.
        auth.access_token().await?;

        let mut client = Self {
            http,
            auth,
            api_base: transport.api_base.clone(),
            data_source_id: String::new(),
        };
        client.data_source_id = client.ensure_data_source().await?;
        debug!("fit client ready, data source {}", client.data_source_id);
        Ok(client)
    }

    /// The resolved composite data-source id.
    pub fn data_source_id(&self) -> &str {
        &self.data_source_id
    }

    /// Build a full URL under the Fitness API base.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        self.api_base.join(path).map_err(Error::InvalidUrl)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authorized POST with JSON body and decode the response.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_response(resp).await
    }

    /// Send an authorized PATCH with JSON body and decode the response.
    pub(crate) async fn patch_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        debug!("PATCH {}", url);

        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .patch(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_response(resp).await
    }

    /// Decode a 2xx body as `T`, or map an error status through the
    /// `{error: {code, status, message}}` envelope.
    async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "access token expired or revoked".into(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(&body) {
                return Err(Error::Api {
                    message: envelope.error.message,
                    code: envelope.error.status,
                    status: status.as_u16(),
                });
            }
            return Err(Error::Api {
                message: body,
                code: None,
                status: status.as_u16(),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
