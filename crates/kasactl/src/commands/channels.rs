//! `kasactl channels` -- list the fleet's channel table.

use tabled::Tabled;

use kasactl_core::{Channel, PlugController};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "IDX")]
    index: usize,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "KIND")]
    kind: &'static str,
    #[tabled(rename = "WRITE")]
    write: &'static str,
    #[tabled(rename = "GUID")]
    guid: String,
}

fn to_row(channel: &Channel) -> ChannelRow {
    ChannelRow {
        index: channel.index,
        name: channel.name.clone(),
        kind: channel.kind_label(),
        write: if channel.is_writable() { "rw" } else { "ro" },
        guid: channel.guid().to_string(),
    }
}

pub fn list(controller: &PlugController, global: &GlobalOpts) -> Result<(), CliError> {
    let channels = controller.channels();
    let rendered = output::render_list(&global.output, &channels, to_row, |c| c.name.clone());
    output::print_output(&rendered, global.quiet);
    Ok(())
}
