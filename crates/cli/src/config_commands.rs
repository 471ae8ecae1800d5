use std::path::Path;

use {anyhow::Result, clap::Subcommand};

use pinsaver_config::{Diagnostic, Requirements, Severity, ValidationResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration and report errors/warnings.
    Check {
        /// Skip the bot token check (for `extract`-only setups).
        #[arg(long)]
        offline: bool,
    },
}

pub fn handle_config(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check { offline } => check(config_path, offline),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config_path: Option<&Path>, offline: bool) -> Result<()> {
    let config = pinsaver_config::discover_and_load(config_path)?;
    let result = pinsaver_config::validate(&config, Requirements {
        telegram: !offline,
    });

    for d in &result.diagnostics {
        eprintln!("  {}", render(d));
    }
    if !result.diagnostics.is_empty() {
        eprintln!();
    }

    let (errors, warnings) = counts(&result);
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}

fn render(d: &Diagnostic) -> String {
    let color = match d.severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
    };
    format!("{BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message)
}

fn counts(result: &ValidationResult) -> (usize, usize) {
    result
        .diagnostics
        .iter()
        .fold((0, 0), |(errors, warnings), d| match d.severity {
            Severity::Error => (errors + 1, warnings),
            Severity::Warning => (errors, warnings + 1),
        })
}
