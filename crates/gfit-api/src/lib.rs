// gfit-api: Async Rust client for the Google Fit REST API
// (OAuth2 token handling + step-count dataset operations)

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod time;
pub mod transport;

mod datasource;
mod steps;

pub use auth::{AuthManager, ClientSecret, ConsentFlow, Credentials, LocalRedirectFlow};
pub use client::FitClient;
pub use error::Error;
pub use transport::TransportConfig;
