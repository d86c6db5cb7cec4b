mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;

    match command {
        // Config and status don't need a fleet connection
        Command::Config(args) => commands::config_cmd::handle(args, &global),
        Command::Status => commands::status::handle(&global),

        // Everything else connects, runs, and disconnects
        Command::Channels => {
            commands::with_controller(&global, |c| commands::channels::list(c, &global))
        }
        Command::Devices => {
            commands::with_controller(&global, |c| commands::devices::list(c, &global))
        }
        Command::Get { channel } => {
            commands::with_controller(&global, |c| commands::state::get(c, &channel, &global))
        }
        Command::Set { channel, state } => commands::with_controller(&global, |c| {
            commands::state::set(c, &channel, &state, &global)
        }),
        Command::Meter { channel } => {
            commands::with_controller(&global, |c| commands::state::meter(c, &channel, &global))
        }
        Command::Describe { channel } => {
            commands::with_controller(&global, |c| commands::state::describe(c, &channel, &global))
        }
    }
}
