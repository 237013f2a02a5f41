//! CLI configuration.
//!
//! TOML config at the platform config dir merged with `GFIT_*` env vars
//! via figment; `GlobalOpts` flags override both. Holds the paths to the
//! OAuth client secret and the stored refresh token, plus output defaults.

use std::path::PathBuf;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Path to the OAuth client secret JSON.
    pub client_secret: Option<PathBuf>,

    /// Path to the stored refresh token.
    pub token_file: Option<PathBuf>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    if let Some(ref path) = global.config {
        return path.clone();
    }
    ProjectDirs::from("com", "gfit", "gfit").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default refresh-token path, next to the config file.
pub fn default_token_path(global: &GlobalOpts) -> PathBuf {
    let mut p = config_path(global);
    p.set_file_name("refresh_token");
    p
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("gfit");
    p
}

// ── Config loading / saving ─────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_path(global);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("GFIT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default(global: &GlobalOpts) -> Config {
    load_config(global).unwrap_or_default()
}

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let path = config_path(global);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: format!("failed to serialize config: {e}"),
    })?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Resolution (flag > env > config > default) ──────────────────────

/// Resolve the client-secret path. The clap `env` attribute already folds
/// `GFIT_CLIENT_SECRET` into the flag, so the chain here is flag > config.
pub fn resolve_client_secret(global: &GlobalOpts, cfg: &Config) -> Result<PathBuf, CliError> {
    global
        .client_secret
        .clone()
        .or_else(|| cfg.client_secret.clone())
        .ok_or(CliError::NoClientSecret)
}

/// Resolve the refresh-token path, falling back to a file next to the
/// config when nothing is configured.
pub fn resolve_token_file(global: &GlobalOpts, cfg: &Config) -> PathBuf {
    global
        .token_file
        .clone()
        .or_else(|| cfg.token_file.clone())
        .unwrap_or_else(|| default_token_path(global))
}

/// Read the stored refresh token, trimming trailing whitespace.
pub fn read_refresh_token(path: &std::path::Path) -> Result<String, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|_| CliError::NoRefreshToken {
        path: path.display().to_string(),
    })?;
    let token = raw.trim().to_string();
    if token.is_empty() {
        return Err(CliError::NoRefreshToken {
            path: path.display().to_string(),
        });
    }
    Ok(token)
}
