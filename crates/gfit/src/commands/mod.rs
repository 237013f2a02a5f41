//! Command dispatch: bridges CLI args -> API client -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod steps;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an API-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Auth(args) => auth::handle(args, global).await,
        Command::Steps(args) => steps::handle(args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
