//! Clap derive structures for the `gfit` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// gfit -- command-line client for Google Fit step data
#[derive(Debug, Parser)]
#[command(
    name = "gfit",
    version,
    about = "Read and write Google Fit step counts from the command line",
    long_about = "A CLI for the Google Fit REST API.\n\n\
        Authenticates with OAuth2 (one interactive consent, then a stored\n\
        refresh token), registers a derived step data source, and reads or\n\
        writes step counts against it.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file path (overrides the platform default)
    #[arg(long, env = "GFIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the OAuth client secret JSON (Developers Console download)
    #[arg(long, env = "GFIT_CLIENT_SECRET", global = true)]
    pub client_secret: Option<PathBuf>,

    /// Path to the stored refresh token
    #[arg(long, env = "GFIT_TOKEN_FILE", global = true)]
    pub token_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "GFIT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds
    #[arg(long, env = "GFIT_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authentication and token management
    Auth(AuthArgs),

    /// Read and write step counts
    #[command(alias = "s")]
    Steps(StepsArgs),

    /// Manage gfit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Run the interactive consent flow and store the refresh token
    Login {
        /// Overwrite an existing refresh token
        #[arg(long)]
        force: bool,

        /// Loopback port for the browser redirect
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

// ── Steps ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StepsArgs {
    #[command(subcommand)]
    pub command: StepsCommand,
}

#[derive(Debug, Subcommand)]
pub enum StepsCommand {
    /// Aggregate step counts over a time window (daily buckets)
    Get {
        /// Single day to query (shorthand for --start/--end, e.g. 2024-03-15)
        #[arg(long, conflicts_with_all = ["start", "end"])]
        date: Option<NaiveDate>,

        /// Window start (local time, e.g. 2024-03-15T00:00:00)
        #[arg(long, requires = "end")]
        start: Option<NaiveDateTime>,

        /// Window end (local time, exclusive)
        #[arg(long, requires = "start")]
        end: Option<NaiveDateTime>,
    },

    /// Write a verified step count over a time window
    Set {
        /// Window start (local time)
        #[arg(long)]
        start: NaiveDateTime,

        /// Window end (local time, exclusive)
        #[arg(long)]
        end: NaiveDateTime,

        /// Step count to write
        #[arg(long)]
        count: i64,
    },

    /// Backfill random step counts for each elapsed day of this month
    Fill {
        /// Minimum steps per day
        #[arg(long, default_value = "2500")]
        min: i64,

        /// Maximum steps per day
        #[arg(long, default_value = "3100")]
        max: i64,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the effective configuration
    Show,

    /// Set a configuration value (client_secret, token_file, output, timeout)
    Set { key: String, value: String },

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
