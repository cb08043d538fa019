//! Defines the command-line arguments and subcommands for the weakspec CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::OutputFormat;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "weakspec",
    version,
    about = "Deterministic conformance runner for weak-reference lifecycle tests."
)]
pub struct WeakspecArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every built-in conformance group and report the results.
    Run {
        /// Output format; overrides the config file.
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Disable colored output.
        #[arg(long)]
        no_color: bool,
        /// YAML file with harness settings.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List groups and their cases in execution order.
    List,
}
