use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tsh::{config::USAGE, Cli, Config, Shell};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) if !cli.help => cli,
        _ => {
            print!("{}", USAGE);
            return ExitCode::from(1);
        }
    };

    // Diagnostics go to stderr; RUST_LOG overrides the default level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match Shell::new(Config::from_cli(&cli)).run() {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("tsh: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
