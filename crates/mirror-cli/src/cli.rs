//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mirror - keep a set of bind mounts converged with a declaration
#[derive(Parser, Debug)]
#[command(name = "mirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Declaration file
    #[arg(short, long, global = true, env = "MIRROR_CONFIG", default_value = "mirror.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create an empty declaration
    ///
    /// Examples:
    ///   mirror init --source /persist --target /
    Init {
        /// Directory the mirrored content lives in
        #[arg(short, long)]
        source: PathBuf,

        /// Directory the content is mounted into
        #[arg(short, long)]
        target: PathBuf,
    },

    /// Show how live mounts relate to the declaration
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List declared points
    List,

    /// Mount every declared point
    Mount,

    /// Unmount every mounted point
    Unmount,

    /// Tear down every mirror mount, declared or not
    ///
    /// Only runs when status is INVALID. Exits with status 2 if mounts remain.
    ForceUnmount,

    /// Declare a point, mounting it if the mirror is fully mounted
    ///
    /// A trailing '/' declares a directory. Without one the kind is taken
    /// from whichever endpoint exists, else directory.
    ///
    /// Examples:
    ///   mirror add /etc/ssh/
    ///   mirror add /etc/machine-id --dry-run
    Add {
        /// Absolute path relative to the mirror roots
        path: String,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove a declared point, or every declared point below a path
    Remove {
        /// Absolute path relative to the mirror roots
        path: String,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,
    },
}
