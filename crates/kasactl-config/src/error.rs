// ── Configuration error type ──

use std::path::PathBuf;

use thiserror::Error;

/// Errors from config loading, saving, and credential resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },

    #[error("failed to write config to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config serialization failed: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("credential store error: {0}")]
    Keyring(#[from] keyring::Error),
}
