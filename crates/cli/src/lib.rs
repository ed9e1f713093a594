pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "pourwatch",
    about = "Pourwatch operator CLI",
    long_about = "Operate Pourwatch migrations, demo data, on-demand evaluation, config inspection, and readiness checks.",
    after_help = "Examples:\n  pourwatch doctor --json\n  pourwatch seed\n  pourwatch evaluate --organization org-demo --window-hours 24"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo bar dataset (idempotent)")]
    Seed,
    #[command(about = "Run one reconciliation and alert evaluation pass for an organization")]
    Evaluate {
        #[arg(long, help = "Organization to evaluate")]
        organization: String,
        #[arg(long, help = "Trailing window size; defaults to scheduler.window_hours")]
        window_hours: Option<u32>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, notification readiness, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Evaluate { organization, window_hours } => {
            commands::evaluate::run(&organization, window_hours)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
