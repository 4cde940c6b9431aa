//! Init command implementation

use std::path::Path;

use colored::Colorize;
use mirror_core::Declaration;

use crate::error::{CliError, Result};

/// Run the init command
///
/// Writes an empty declaration between two roots. Relative roots are made
/// absolute against the current directory.
pub fn run_init(config: &Path, source: &Path, target: &Path) -> Result<()> {
    if config.exists() {
        return Err(CliError::user(format!(
            "{} already exists",
            config.display()
        )));
    }

    let source = std::path::absolute(source)?;
    let target = std::path::absolute(target)?;
    if source == target {
        return Err(CliError::user("source and target must differ"));
    }

    Declaration::new(&source, &target).save(config)?;

    println!(
        "{} Initialized {} ({} -> {})",
        "OK".green().bold(),
        config.display().to_string().cyan(),
        source.display(),
        target.display()
    );
    Ok(())
}
