//! Clap derive structures for the `waitroom` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// waitroom -- queue for and monitor virtual waiting rooms
#[derive(Debug, Parser)]
#[command(
    name = "waitroom",
    version,
    about = "Join virtual waiting rooms and watch their capacity",
    long_about = "A client for serverless virtual waiting rooms.\n\n\
        `join` takes a place in the queue, waits to be served, obtains an\n\
        admission token and completes checkout on the protected site.\n\
        `capacity` shows the operator counters and remaining capacity.",
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
    /// Waiting room profile to use
    #[arg(long, short = 'p', env = "WAITROOM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Public queue API base URL (overrides profile)
    #[arg(long, env = "WAITROOM_PUBLIC_API", global = true)]
    pub public_api: Option<String>,

    /// Private (operator) API base URL (overrides profile)
    #[arg(long, env = "WAITROOM_PRIVATE_API", global = true)]
    pub private_api: Option<String>,

    /// Commerce API base URL (overrides profile)
    #[arg(long, env = "WAITROOM_COMMERCE_API", global = true)]
    pub commerce_api: Option<String>,

    /// Event id (overrides profile)
    #[arg(long, short = 'e', env = "WAITROOM_EVENT_ID", global = true)]
    pub event_id: Option<String>,

    /// Private API key
    #[arg(long, env = "WAITROOM_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WAITROOM_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "WAITROOM_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "WAITROOM_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Time between polls (e.g. "2s", "500ms")
    #[arg(long, env = "WAITROOM_POLL_INTERVAL", global = true)]
    pub poll_interval: Option<humantime::Duration>,
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
    /// Join the queue, wait for a token and check out
    #[command(alias = "j")]
    Join(JoinArgs),

    /// Show operator counters and remaining capacity
    #[command(alias = "cap")]
    Capacity(CapacityArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Join ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct JoinArgs {
    /// Query string the user arrived with, passed through to the protected site
    #[arg(long)]
    pub launch_query: Option<String>,

    /// Stop once a token is issued instead of checking out
    #[arg(long)]
    pub no_checkout: bool,
}

// ── Capacity ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CapacityArgs {
    /// Keep polling and print every change until interrupted
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Let N more users in by advancing the serving counter, then report
    #[arg(long, value_name = "N", conflicts_with = "watch", value_parser = clap::value_parser!(u32).range(1..))]
    pub admit: Option<u32>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Store the private API key in the system keyring
    SetKey {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
