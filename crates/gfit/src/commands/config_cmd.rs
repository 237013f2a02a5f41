//! Config subcommand handlers.

use dialoguer::Input;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path(global);
            eprintln!("gfit — configuration wizard");
            eprintln!("  Config path: {}\n", config_path.display());

            let client_secret: String = Input::new()
                .with_prompt("Path to client_secret.json")
                .interact_text()
                .map_err(prompt_err)?;

            if client_secret.is_empty() {
                return Err(CliError::Validation {
                    field: "client_secret".into(),
                    reason: "path cannot be empty".into(),
                });
            }

            let token_default = config::default_token_path(global).display().to_string();
            let token_file: String = Input::new()
                .with_prompt("Where to store the refresh token")
                .default(token_default)
                .interact_text()
                .map_err(prompt_err)?;

            let cfg = Config {
                client_secret: Some(client_secret.into()),
                token_file: Some(token_file.into()),
                defaults: crate::config::Defaults::default(),
            };
            config::save_config(global, &cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Next: gfit auth login");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default(global);
            let out = output::render_value(&global.output, &cfg, |c| format!("{c:#?}"));
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default(global);

            match key.as_str() {
                "client_secret" | "client-secret" => cfg.client_secret = Some(value.into()),
                "token_file" | "token-file" => cfg.token_file = Some(value.into()),
                "output" => {
                    let valid = ["table", "json", "json-compact", "yaml", "plain"];
                    if !valid.contains(&value.as_str()) {
                        return Err(CliError::Validation {
                            field: "output".into(),
                            reason: format!("must be one of: {}", valid.join(", ")),
                        });
                    }
                    cfg.defaults.output = value;
                }
                "timeout" => {
                    cfg.defaults.timeout =
                        value.parse().map_err(|_| CliError::Validation {
                            field: "timeout".into(),
                            reason: "must be a number (seconds)".into(),
                        })?;
                }
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: client_secret, \
                             token_file, output, timeout"
                        ),
                    });
                }
            }

            config::save_config(global, &cfg)?;
            eprintln!("✓ Set {key}");
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path(global).display());
            Ok(())
        }
    }
}
