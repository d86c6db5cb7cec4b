//! `kasactl devices` -- list discovered devices and their capabilities.

use tabled::Tabled;

use kasactl_core::{DeviceSummary, PlugController};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ALIAS")]
    alias: String,
    #[tabled(rename = "HOST")]
    host: String,
    #[tabled(rename = "OUTLETS")]
    outlets: String,
    #[tabled(rename = "METER")]
    meter: &'static str,
    #[tabled(rename = "CLOUD")]
    cloud: &'static str,
}

fn to_row(device: &DeviceSummary) -> DeviceRow {
    DeviceRow {
        alias: device.alias.clone(),
        host: device.host.clone(),
        outlets: if device.child_aliases.is_empty() {
            "-".into()
        } else {
            device.child_aliases.join(", ")
        },
        meter: if device.caps.has_metering { "yes" } else { "no" },
        cloud: if device.caps.has_cloud { "yes" } else { "no" },
    }
}

pub fn list(controller: &PlugController, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = controller.devices();
    let rendered = output::render_list(&global.output, &devices, to_row, |d| d.alias.clone());
    output::print_output(&rendered, global.quiet);
    Ok(())
}
