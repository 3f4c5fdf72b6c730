//! CLI module for shepherd - command-line interface and subcommands.
//!
//! Provides inspection commands over the persisted loop state files; the
//! state files are the durable contract, so the CLI never touches a live
//! driver.

pub mod commands;

pub use commands::Cli;
