//! Shared helpers for command handlers.

use std::time::Duration;

use secrecy::SecretString;

use gfit_api::auth::ClientSecret;
use gfit_api::{Credentials, FitClient, TransportConfig};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

/// Build a connected [`FitClient`] from config + flags.
///
/// Resolves the client secret and stored refresh token, then runs the
/// client's connect sequence (token check + data-source registration).
pub async fn connect(global: &GlobalOpts) -> Result<FitClient, CliError> {
    let cfg = config::load_config_or_default(global);

    let secret_path = config::resolve_client_secret(global, &cfg)?;
    let secret = ClientSecret::from_file(&secret_path)?;

    let token_path = config::resolve_token_file(global, &cfg);
    let refresh_token = config::read_refresh_token(&token_path)?;

    let credentials = Credentials::new(&secret, SecretString::from(refresh_token));
    let transport = TransportConfig {
        timeout: Duration::from_secs(global.timeout),
        ..TransportConfig::default()
    };

    Ok(FitClient::connect(credentials, &transport).await?)
}
