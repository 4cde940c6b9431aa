//! Mount, unmount and forced unmount command implementations

use std::path::Path;

use colored::Colorize;
use mirror_core::OperationReport;

use super::Session;
use crate::error::{CliError, Result};

/// Run the mount command
pub fn run_mount(config: &Path) -> Result<()> {
    println!("{} Mounting declared points...", "=>".blue().bold());
    let session = Session::open_locked(config)?;
    let report = session.controller.mount_all()?;
    print_operation(&report);
    Ok(())
}

/// Run the unmount command
pub fn run_unmount(config: &Path) -> Result<()> {
    println!("{} Unmounting points...", "=>".blue().bold());
    let session = Session::open_locked(config)?;
    let report = session.controller.unmount_all()?;
    print_operation(&report);
    Ok(())
}

/// Run the force-unmount command
pub fn run_force_unmount(config: &Path) -> Result<()> {
    println!("{} Forcing unmount of all mirror mounts...", "=>".yellow().bold());
    let session = Session::open_locked(config)?;
    let report = session.controller.force_unmount()?;

    for error in &report.errors {
        println!("   {} {}", "!".red(), error);
    }
    if report.complete {
        println!(
            "{} Nothing mounted after {} pass(es). Status: {}",
            "OK".green().bold(),
            report.passes,
            report.status
        );
        return Ok(());
    }

    for mount_point in &report.remaining {
        println!("   {} {}", "-".red(), mount_point.cyan());
    }
    Err(CliError::Incomplete {
        remaining: report.remaining.len(),
    })
}

fn print_operation(report: &OperationReport) {
    for action in &report.actions {
        println!("   {} {}", "+".green(), action);
    }
    for error in &report.errors {
        println!("   {} {}", "!".red(), error);
    }
    if report.actions.is_empty() && report.is_clean() {
        println!("   Nothing to do.");
    }

    let status = report.status.to_string();
    if report.is_clean() {
        println!("{} Status: {}", "OK".green().bold(), status.bold());
    } else {
        println!(
            "{} {} point(s) failed. Status: {}",
            "WARN".yellow().bold(),
            report.errors.len(),
            status.bold()
        );
    }
}
