//! `kasactl get` / `set` / `meter` / `describe` -- per-channel operations.

use owo_colors::OwoColorize;
use serde_json::json;

use kasactl_core::PlugController;

use crate::cli::GlobalOpts;
use crate::commands::resolve;
use crate::error::CliError;
use crate::output;

fn state_word(on: bool, color: bool) -> String {
    match (on, color) {
        (true, true) => "on".green().to_string(),
        (true, false) => "on".into(),
        (false, true) => "off".red().to_string(),
        (false, false) => "off".into(),
    }
}

pub fn get(controller: &PlugController, identifier: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let channel = resolve(controller, identifier)?;
    let on = controller.read(&channel)?;
    let color = output::should_color(&global.color);

    let payload = json!({ "index": channel.index, "name": channel.name, "on": on });
    let rendered = output::render_single(
        &global.output,
        &payload,
        |_| format!("{} is {}", channel.name, state_word(on, color)),
        |_| state_word(on, false),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

pub fn set(
    controller: &PlugController,
    identifier: &str,
    state: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let desired = parse_state(state)?;
    let channel = resolve(controller, identifier)?;
    controller.write(&channel, desired)?;

    let color = output::should_color(&global.color);
    let payload = json!({ "index": channel.index, "name": channel.name, "on": desired });
    let rendered = output::render_single(
        &global.output,
        &payload,
        |_| format!("{} is now {}", channel.name, state_word(desired, color)),
        |_| state_word(desired, false),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

pub fn meter(
    controller: &PlugController,
    identifier: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let channel = resolve(controller, identifier)?;
    let value = controller.read_metric(&channel)?;

    let payload = json!({ "index": channel.index, "name": channel.name, "value": value });
    let rendered = output::render_single(
        &global.output,
        &payload,
        |_| match value {
            Some(v) => format!("{}: {v}", channel.name),
            None => format!("{}: no reading", channel.name),
        },
        |_| value.map_or_else(|| "null".into(), |v| v.to_string()),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

pub fn describe(
    controller: &PlugController,
    identifier: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let channel = resolve(controller, identifier)?;
    let text = controller.describe(&channel)?;

    let payload = json!({ "index": channel.index, "name": channel.name, "description": text });
    let rendered =
        output::render_single(&global.output, &payload, |_| text.clone(), |_| text.clone());
    output::print_output(&rendered, global.quiet);
    Ok(())
}

/// Accept the state spellings requests arrive with off the wire.
fn parse_state(raw: &str) -> Result<bool, CliError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => Err(CliError::Validation {
            field: "state".into(),
            reason: format!("expected on/off/true/false/1/0, got '{raw}'"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn state_spellings_parse() {
        for raw in ["on", "ON", "true", "1", " 1 "] {
            assert!(parse_state(raw).unwrap());
        }
        for raw in ["off", "False", "0"] {
            assert!(!parse_state(raw).unwrap());
        }
        assert!(matches!(
            parse_state("maybe"),
            Err(CliError::Validation { .. })
        ));
    }
}
