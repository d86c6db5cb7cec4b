//! Clap derive structures for the `kasactl` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// kasactl -- drive a fleet of smart plugs from the command line
#[derive(Debug, Parser)]
#[command(
    name = "kasactl",
    version,
    about = "Drive a fleet of smart plugs from the command line",
    long_about = "Enumerates networked smart plugs (including multi-outlet strips) \
        into a flat channel space: switches, power and cloud indicators, and \
        metering gauges, addressable by index or name.",
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
    /// Config profile to use
    #[arg(long, short = 'p', env = "KASACTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Fleet spec file for the simulated backend (overrides profile)
    #[arg(long, env = "KASACTL_FLEET", global = true)]
    pub fleet: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "KASACTL_OUTPUT",
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
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
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
    /// List every channel in the fleet
    #[command(alias = "ls")]
    Channels,

    /// List discovered devices and their capabilities
    #[command(alias = "dev")]
    Devices,

    /// Read a channel's on/off state
    Get {
        /// Channel index or name
        channel: String,
    },

    /// Drive a switch channel to a state, with verification
    Set {
        /// Channel index or name
        channel: String,
        /// Desired state: on, off, true, false, 1, 0
        state: String,
    },

    /// Read a meter gauge's numeric value
    Meter {
        /// Channel index or name
        channel: String,
    },

    /// Describe a channel's backing unit and current reading
    Describe {
        /// Channel index or name
        channel: String,
    },

    /// Driver identity, config location, and credential presence
    Status,

    /// Manage configuration and credentials
    Config(ConfigArgs),
}

// ── Config subcommands ───────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Store vendor account credentials in the OS keyring
    SetCredentials {
        /// Account email (prompts when omitted)
        #[arg(long)]
        email: Option<String>,
        /// Account password (prompts when omitted; prefer the prompt so
        /// the secret stays out of shell history)
        #[arg(long)]
        password: Option<String>,
    },

    /// Remove stored credentials from the OS keyring
    ClearCredentials,

    /// Show the effective configuration (secrets as presence only)
    Show,

    /// Print the config file path
    Path,
}
