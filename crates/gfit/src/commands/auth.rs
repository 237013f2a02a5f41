//! Auth subcommand handlers.

use owo_colors::OwoColorize;

use gfit_api::auth::ClientSecret;
use gfit_api::{ConsentFlow, LocalRedirectFlow};

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: AuthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        AuthCommand::Login { force, port } => login(global, force, port).await,
    }
}

/// Run the interactive consent flow and persist the refresh token.
///
/// Refuses to overwrite an existing token unless `--force` is given --
/// Google invalidates the old refresh token when a new one is issued
/// with `prompt=consent`.
async fn login(global: &GlobalOpts, force: bool, port: u16) -> Result<(), CliError> {
    let cfg = config::load_config_or_default(global);

    let token_path = config::resolve_token_file(global, &cfg);
    if token_path.exists() && !force {
        return Err(CliError::TokenExists {
            path: token_path.display().to_string(),
        });
    }

    let secret_path = config::resolve_client_secret(global, &cfg)?;
    let secret = ClientSecret::from_file(&secret_path)?;

    eprintln!("Waiting for the browser redirect on http://localhost:{port} ...");
    let flow = LocalRedirectFlow::new().with_port(port);
    let pair = flow.authorize(&secret).await?;

    if let Some(parent) = token_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&token_path, &pair.refresh_token)?;

    let check = if output::should_color(&global.color) {
        "✓".green().to_string()
    } else {
        "✓".to_string()
    };
    eprintln!("{check} Refresh token stored at {}", token_path.display());
    eprintln!("  Test it: gfit steps get");
    Ok(())
}
