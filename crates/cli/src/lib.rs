pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "forecast",
    about = "Sales forecast operator CLI",
    long_about = "Apply database migrations, build the random-forest artifact, and check runtime readiness.",
    after_help = "Examples:\n  forecast migrate\n  forecast train --force\n  forecast doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Train the random-forest model and cache it at scoring.model_path")]
    Train {
        #[arg(long, help = "Retrain even when a readable artifact already exists")]
        force: bool,
    },
    #[command(about = "Validate config, DB connectivity, and model artifact readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Train { force } => commands::train::run(force),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
