//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - list: list persisted loops
//! - status: show one loop's state
//! - progress: print a loop's progress log

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Shepherd - drives a coding agent through bounded, unattended work sessions
#[derive(Parser, Debug)]
#[command(name = "shepherd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List persisted loops
    List {
        /// Show only active loops
        #[arg(short, long)]
        active: bool,

        /// Filter by mode (ralph, lisa)
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Show the state of one loop
    Status {
        /// Loop id (as shown by `list`) or session id
        id: String,

        /// Include the full phase history
        #[arg(short, long)]
        detailed: bool,
    },

    /// Print a loop's progress log
    Progress {
        /// Loop id or session id
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_list() {
        let cli = Cli::try_parse_from(["shepherd", "list", "--active"]).unwrap();
        match cli.command {
            Commands::List { active, mode } => {
                assert!(active);
                assert!(mode.is_none());
            }
            _ => panic!("expected list command"),
        }
    }

    #[test]
    fn test_cli_parses_status_with_flags() {
        let cli = Cli::try_parse_from(["shepherd", "-v", "status", "abc-123", "--detailed"]).unwrap();
        assert!(cli.is_verbose());
        match cli.command {
            Commands::Status { id, detailed } => {
                assert_eq!(id, "abc-123");
                assert!(detailed);
            }
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["shepherd"]).is_err());
    }
}
