//! `kasactl status` -- driver identity and configuration summary.
//!
//! Deliberately offline: it reports what the CLI would use, without
//! touching the fleet.

use serde_json::json;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let config = kasactl_config::load_config_or_default();
    let (profile_name, profile) = config.profile(global.profile.as_deref());
    let fleet = global
        .fleet
        .clone()
        .or_else(|| profile.and_then(|p| p.fleet.clone()));
    let credentials = kasactl_config::resolve_credentials()?.is_some();

    let payload = json!({
        "driver": kasactl_core::DRIVER_NAME,
        "description": kasactl_core::DRIVER_DESCRIPTION,
        "version": env!("CARGO_PKG_VERSION"),
        "interface_version": kasactl_core::INTERFACE_VERSION,
        "config_path": kasactl_config::config_path().display().to_string(),
        "profile": profile_name,
        "fleet": fleet.as_ref().map(|p| p.display().to_string()),
        "credentials": if credentials { "stored" } else { "absent" },
    });

    let rendered = output::render_single(
        &global.output,
        &payload,
        |_| {
            format!(
                "{} {} -- {}\n\
                 interface version: {}\n\
                 config:            {}\n\
                 profile:           {}\n\
                 fleet:             {}\n\
                 credentials:       {}",
                kasactl_core::DRIVER_NAME,
                env!("CARGO_PKG_VERSION"),
                kasactl_core::DRIVER_DESCRIPTION,
                kasactl_core::INTERFACE_VERSION,
                kasactl_config::config_path().display(),
                profile_name,
                fleet
                    .as_ref()
                    .map_or_else(|| "(none)".into(), |p| p.display().to_string()),
                if credentials { "stored" } else { "absent" },
            )
        },
        |_| kasactl_core::DRIVER_NAME.into(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
