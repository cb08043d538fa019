//! The weakspec Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::process::ExitCode;

use clap::Parser;
use miette::Report;

use crate::cli::args::{Command, WeakspecArgs};
use crate::config::{HarnessConfig, OutputFormat};
use crate::errors::HarnessError;
use crate::report::{print_reports, RunSummary};
use crate::runner::SpecRunner;
use crate::suites;

pub mod args;

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = WeakspecArgs::parse();

    let result = match args.command {
        Command::Run {
            format,
            no_color,
            config,
        } => resolve_config(config.as_deref(), format, no_color).and_then(|c| handle_run(&c)),
        Command::List => handle_list(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:?}", Report::new(e));
            ExitCode::from(2)
        }
    }
}

/// File settings first, then flags on top.
fn resolve_config(
    path: Option<&std::path::Path>,
    format: Option<OutputFormat>,
    no_color: bool,
) -> Result<HarnessConfig, HarnessError> {
    let mut config = match path {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(format) = format {
        config.format = format;
    }
    if no_color {
        config.use_colors = false;
    }
    Ok(config)
}

/// Handles the `run` subcommand.
fn handle_run(config: &HarnessConfig) -> Result<ExitCode, HarnessError> {
    let runner = SpecRunner::new();
    let reports = runner.run_all(suites::builtin()?);
    print_reports(&reports, config).map_err(|e| crate::err_msg!(Internal, "cannot write report: {}", e))?;

    if RunSummary::from_reports(&reports).has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Handles the `list` subcommand.
fn handle_list() -> Result<ExitCode, HarnessError> {
    for group in suites::builtin()? {
        println!("{}", group.name);
        for name in group.case_names() {
            println!("  {}", name);
        }
    }
    Ok(ExitCode::SUCCESS)
}
