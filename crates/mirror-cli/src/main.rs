//! Mirror CLI
//!
//! Command-line front end for the mirror reconciliation engine.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            eprintln!("{}: tracing already initialised", "warning".yellow());
        }
        tracing::debug!(config = %cli.config.display(), "Verbose mode enabled");
    }

    execute_command(&cli.config, cli.command)
}

fn execute_command(config: &std::path::Path, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { source, target } => commands::run_init(config, &source, &target),
        Commands::Status { json } => commands::run_status(config, json),
        Commands::List => commands::run_list(config),
        Commands::Mount => commands::run_mount(config),
        Commands::Unmount => commands::run_unmount(config),
        Commands::ForceUnmount => commands::run_force_unmount(config),
        Commands::Add { path, dry_run } => commands::run_add(config, &path, dry_run),
        Commands::Remove { path, dry_run } => commands::run_remove(config, &path, dry_run),
    }
}
