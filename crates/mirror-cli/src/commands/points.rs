//! Add and remove command implementations
//!
//! Both edit the declaration and apply any live effect under the session
//! lock. The declaration is saved whenever the declared points changed, even
//! if a live step failed afterwards.

use std::path::Path;

use colored::Colorize;
use mirror_core::PointChanges;

use super::Session;
use crate::error::Result;

/// Run the add command
pub fn run_add(config: &Path, path: &str, dry_run: bool) -> Result<()> {
    let mut session = Session::open_locked(config)?;
    let result = session.controller.insert_point(path, dry_run);
    session.persist()?;
    let changes = result?;

    if changes.is_empty() {
        println!("{} {} is already covered.", "OK".green().bold(), path.cyan());
        return Ok(());
    }
    print_changes(&changes, dry_run);
    Ok(())
}

/// Run the remove command
pub fn run_remove(config: &Path, path: &str, dry_run: bool) -> Result<()> {
    let mut session = Session::open_locked(config)?;
    let result = session.controller.remove_point(path, dry_run);
    session.persist()?;
    let changes = result?;

    if changes.is_empty() {
        println!("{} Nothing declared at or below {}.", "OK".green().bold(), path.cyan());
        return Ok(());
    }
    print_changes(&changes, dry_run);
    Ok(())
}

fn print_changes(changes: &PointChanges, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    for point in &changes.inserted {
        println!("{}{} {}", prefix, "+".green(), point.to_string().cyan());
    }
    for point in &changes.removed {
        println!("{}{} {}", prefix, "-".red(), point.to_string().cyan());
    }
    for action in &changes.actions {
        println!("   {}", action.dimmed());
    }
}
