//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable
//! help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use kasactl_core::CoreError;

/// Exit codes for scripting.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const READ_ONLY: i32 = 5;
    pub const STATE_MISMATCH: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Channels ─────────────────────────────────────────────────────
    #[error("No channel matches '{identifier}'")]
    #[diagnostic(
        code(kasactl::channel_not_found),
        help("Run: kasactl channels to see the fleet's channel table")
    )]
    ChannelNotFound { identifier: String },

    #[error("Channel '{name}' is read-only")]
    #[diagnostic(
        code(kasactl::read_only),
        help("Only switch channels accept writes; indicators and gauges are read-only.")
    )]
    ReadOnly { name: String },

    #[error("Channel '{name}' did not reach the requested state after {attempts} attempts")]
    #[diagnostic(
        code(kasactl::state_mismatch),
        help(
            "The command was sent but the device kept reporting the old state.\n\
             Check the device's power and network, then retry."
        )
    )]
    StateMismatch { name: String, attempts: u32 },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Not connected to the fleet")]
    #[diagnostic(code(kasactl::not_connected))]
    NotConnected,

    #[error("Backend failure: {message}")]
    #[diagnostic(
        code(kasactl::backend),
        help("Check that the devices are powered and reachable on the local network.")
    )]
    Backend { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(kasactl::timeout),
        help("Raise op_timeout_secs in your profile or check device responsiveness.")
    )]
    Timeout { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(kasactl::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Profile '{profile}' has no fleet spec")]
    #[diagnostic(
        code(kasactl::no_fleet),
        help(
            "Point the CLI at a fleet file with --fleet <path> or set\n\
             `fleet = \"...\"` in the profile."
        )
    )]
    NoFleet { profile: String },

    #[error("Fleet spec {path} is unusable: {reason}")]
    #[diagnostic(
        code(kasactl::fleet_file),
        help("The fleet spec is TOML with one [[device]] table per device.")
    )]
    FleetFile { path: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(kasactl::validation))]
    Validation { field: String, reason: String },

    // ── Pass-through ─────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(kasactl::config))]
    Config(#[from] kasactl_config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Prompt aborted: {0}")]
    #[diagnostic(code(kasactl::prompt))]
    Prompt(#[from] dialoguer::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ChannelNotFound { .. } => exit_code::NOT_FOUND,
            Self::ReadOnly { .. } => exit_code::READ_ONLY,
            Self::StateMismatch { .. } => exit_code::STATE_MISMATCH,
            Self::NotConnected | Self::Backend { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoFleet { .. } | Self::ProfileNotFound { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::OutOfRange { index, .. } => Self::ChannelNotFound {
                identifier: index.to_string(),
            },
            CoreError::NotFound { name } => Self::ChannelNotFound { identifier: name },
            CoreError::ReadOnly { name } => Self::ReadOnly { name },
            CoreError::StateMismatch { name, attempts, .. } => {
                Self::StateMismatch { name, attempts }
            }
            CoreError::NotConnected => Self::NotConnected,
            CoreError::Timeout { .. } => Self::Timeout {
                message: err.to_string(),
            },
            CoreError::Backend { .. } => Self::Backend {
                message: err.to_string(),
            },
        }
    }
}
