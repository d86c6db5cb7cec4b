//! Shared configuration for kasactl tools.
//!
//! A small layered setup: a TOML config file holding named profiles,
//! overridden by `KASACTL_`-prefixed environment variables, with account
//! credentials resolved separately through the OS keyring (never stored
//! in the file). Consumers pick a profile and hand its embedded
//! [`ControllerConfig`] to the core crate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use tracing::warn;

use kasactl_core::ControllerConfig;

pub mod credentials;
mod error;

pub use credentials::{Credentials, clear_credentials, resolve_credentials, store_credentials};
pub use error::ConfigError;

// ── Config types ────────────────────────────────────────────────────

/// Root of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,
    /// Named profiles.
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// Look up a profile, falling back to the default profile name and
    /// then to `"default"`.
    pub fn profile(&self, name: Option<&str>) -> (String, Option<&Profile>) {
        let resolved = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        let profile = self.profiles.get(&resolved);
        (resolved, profile)
    }
}

/// One named controller profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Fleet spec file for the simulated backend (development mode).
    pub fleet: Option<PathBuf>,
    /// Controller tunables.
    pub controller: ControllerConfig,
}

// ── Loading / saving ────────────────────────────────────────────────

/// Default config file location (`~/.config/kasactl/config.toml` on
/// Linux, the platform equivalent elsewhere).
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "stray-signal", "kasactl")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("kasactl.toml"))
}

/// Load configuration from a file plus `KASACTL_` environment overrides.
///
/// A missing file is not an error -- the environment layer alone can
/// describe a working setup.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("KASACTL_").split("__"))
        .extract()
        .map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
}

/// Load from the default path, or fall back to defaults with a warning.
pub fn load_config_or_default() -> Config {
    let path = config_path();
    match load_config(&path) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "config unreadable, using defaults");
            Config::default()
        }
    }
}

/// Write the config back out, creating parent directories as needed.
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, rendered).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        figment::Jail::expect_with(|jail| {
            let config = load_config(&jail.directory().join("nope.toml")).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn file_profiles_round_trip() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                default_profile = "bench"

                [profiles.bench]
                fleet = "fleet.toml"

                [profiles.bench.controller]
                write_attempts = 5
                settle_delay_ms = 250
                "#,
            )?;

            let config = load_config(&jail.directory().join("config.toml")).unwrap();
            let (name, profile) = config.profile(None);
            assert_eq!(name, "bench");
            let profile = profile.unwrap();
            assert_eq!(profile.fleet.as_deref(), Some(Path::new("fleet.toml")));
            assert_eq!(profile.controller.write_attempts, 5);
            assert_eq!(profile.controller.settle_delay_ms, 250);
            // Unset fields keep their defaults.
            assert_eq!(profile.controller.op_timeout_secs, 5);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", r#"default_profile = "home""#)?;
            jail.set_env("KASACTL_DEFAULT_PROFILE", "lab");

            let config = load_config(&jail.directory().join("config.toml")).unwrap();
            assert_eq!(config.default_profile.as_deref(), Some("lab"));
            Ok(())
        });
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            default_profile: Some("bench".into()),
            profiles: BTreeMap::from([("bench".into(), Profile::default())]),
        };

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn unknown_profile_reports_its_resolved_name() {
        let config = Config::default();
        let (name, profile) = config.profile(Some("garage"));
        assert_eq!(name, "garage");
        assert!(profile.is_none());
    }
}
