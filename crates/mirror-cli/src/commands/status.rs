//! Status and list command implementations

use std::path::Path;

use colored::Colorize;
use mirror_core::{Status, StatusReport};

use super::Session;
use crate::error::Result;

/// Run the status command
pub fn run_status(config: &Path, json: bool) -> Result<()> {
    let session = Session::open(config)?;
    let report = session.controller.report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report, session.controller.declared().len());
    Ok(())
}

fn print_report(report: &StatusReport, declared: usize) {
    let label = match report.status {
        Status::Full => "FULL".green().bold(),
        Status::Partial => "PARTIAL".yellow().bold(),
        Status::None => "NONE".blue().bold(),
        Status::Invalid => "INVALID".red().bold(),
    };
    println!("{} ({} declared)", label, declared);

    for point in &report.missing {
        println!("   {} {} (not mounted)", "-".yellow(), point.to_string().cyan());
    }
    for point in &report.unexpected {
        println!("   {} {} (mounted, not declared)", "!".red(), point.to_string().cyan());
    }
    for message in &report.messages {
        println!("   {} {}", "!".red(), message);
    }

    match report.status {
        Status::Invalid => {
            println!();
            println!("Run {} to recover.", "mirror force-unmount".cyan());
        }
        Status::Partial | Status::None if declared > 0 => {
            println!();
            println!("Run {} to converge.", "mirror mount".cyan());
        }
        _ => {}
    }
}

/// Run the list command
pub fn run_list(config: &Path) -> Result<()> {
    let session = Session::open(config)?;
    let declared = session.controller.declared();

    if declared.is_empty() {
        println!("No points declared.");
        return Ok(());
    }
    for point in declared {
        println!("{}", point);
    }
    Ok(())
}
