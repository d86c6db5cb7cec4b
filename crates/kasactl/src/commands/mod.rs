//! Command handlers and shared plumbing.

pub mod channels;
pub mod config_cmd;
pub mod devices;
pub mod state;
pub mod status;

use std::sync::Arc;

use tracing::debug;

use kasactl_backend::PlugBackend;
use kasactl_backend::sim::{FleetSpec, SimBackend};
use kasactl_config::Profile;
use kasactl_core::{Channel, ChannelId, PlugController};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build a controller from the active profile plus CLI overrides.
///
/// The CLI drives the simulated backend from a fleet spec; a real vendor
/// transport would be wired here instead once one exists.
pub fn build_controller(global: &GlobalOpts) -> Result<PlugController, CliError> {
    let config = kasactl_config::load_config_or_default();
    let (profile_name, profile) = config.profile(global.profile.as_deref());

    // An explicitly named profile must exist; the implicit default may not.
    let profile = match profile {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: config
                    .profiles
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        None => Profile::default(),
    };

    let fleet_path = global
        .fleet
        .clone()
        .or(profile.fleet)
        .ok_or(CliError::NoFleet {
            profile: profile_name,
        })?;

    let raw = std::fs::read_to_string(&fleet_path).map_err(|err| CliError::FleetFile {
        path: fleet_path.display().to_string(),
        reason: err.to_string(),
    })?;
    let spec: FleetSpec = toml::from_str(&raw).map_err(|err| CliError::FleetFile {
        path: fleet_path.display().to_string(),
        reason: err.to_string(),
    })?;

    debug!(fleet = %fleet_path.display(), devices = spec.device.len(), "building simulated fleet");
    let backend: Arc<dyn PlugBackend> = Arc::new(SimBackend::from_spec(&spec));
    Ok(PlugController::new(backend, profile.controller))
}

/// Connect, run the handler, always disconnect.
pub fn with_controller<T>(
    global: &GlobalOpts,
    f: impl FnOnce(&PlugController) -> Result<T, CliError>,
) -> Result<T, CliError> {
    let controller = build_controller(global)?;
    controller.connect()?;
    let result = f(&controller);
    controller.disconnect();
    result
}

/// Resolve a raw identifier argument to a channel.
pub fn resolve(controller: &PlugController, identifier: &str) -> Result<Channel, CliError> {
    Ok(controller.resolve(&ChannelId::parse(identifier))?)
}
