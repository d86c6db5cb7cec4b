//! `kasactl config` -- configuration and credential management.

use dialoguer::Input;

use crate::cli::{ConfigAction, ConfigArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.action {
        ConfigAction::SetCredentials { email, password } => set_credentials(email, password, global),
        ConfigAction::ClearCredentials => {
            kasactl_config::clear_credentials()?;
            output::print_output("Credentials removed.", global.quiet);
            Ok(())
        }
        ConfigAction::Show => show(global),
        ConfigAction::Path => {
            output::print_output(
                &kasactl_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }
    }
}

fn set_credentials(
    email: Option<String>,
    password: Option<String>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let email = match email {
        Some(email) => email,
        None => Input::new().with_prompt("Account email").interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => rpassword::prompt_password("Account password: ")?,
    };

    kasactl_config::store_credentials(&email, &password)?;
    output::print_output("Credentials stored in the OS keyring.", global.quiet);
    Ok(())
}

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let config = kasactl_config::load_config_or_default();
    let credentials = kasactl_config::resolve_credentials()?.is_some();

    let mut rendered = toml::to_string_pretty(&config)
        .map_err(kasactl_config::ConfigError::from)?;
    rendered.push_str(&format!(
        "\n# credentials: {}\n",
        if credentials { "stored" } else { "absent" }
    ));
    output::print_output(rendered.trim_end(), global.quiet);
    Ok(())
}
