//! Semantic checks on a loaded configuration.

use std::collections::HashSet;

use url::Url;

use crate::schema::PinsaverConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "fetch.max_bytes"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.path, self.message)
    }
}

/// Which features the caller is about to use.
#[derive(Debug, Clone, Copy, Default)]
pub struct Requirements {
    /// The Telegram transport will be started.
    pub telegram: bool,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Check a configuration for values that would break the pipeline at runtime.
#[must_use]
pub fn validate(config: &PinsaverConfig, requires: Requirements) -> ValidationResult {
    let mut result = ValidationResult::default();

    if requires.telegram && !config.telegram.has_token() {
        result.push(
            Severity::Error,
            "telegram.token",
            "BOT_TOKEN is missing (set it in the environment or the config file)",
        );
    }

    for (path, value) in [
        ("http.request_timeout_secs", config.http.request_timeout_secs),
        ("fetch.timeout_secs", config.fetch.timeout_secs),
        ("fetch.max_bytes", config.fetch.max_bytes),
        ("downloader.timeout_secs", config.downloader.timeout_secs),
        ("pipeline.link_budget_secs", config.pipeline.link_budget_secs),
    ] {
        if value == 0 {
            result.push(Severity::Error, path, "must be greater than zero");
        }
    }

    for (path, value) in [
        ("platform.canonical_base", &config.platform.canonical_base),
        ("platform.oembed_endpoint", &config.platform.oembed_endpoint),
    ] {
        if let Err(e) = Url::parse(value) {
            result.push(Severity::Error, path, format!("not a valid URL: {e}"));
        }
    }

    if config.platform.short_link_host.is_empty() && config.platform.domain_fragment.is_empty() {
        result.push(
            Severity::Error,
            "platform",
            "short_link_host and domain_fragment are both empty; no link would ever match",
        );
    }

    if config.pipeline.strategies.is_empty() {
        result.push(
            Severity::Error,
            "pipeline.strategies",
            "at least one strategy is required",
        );
    }
    let mut seen = HashSet::new();
    for kind in &config.pipeline.strategies {
        if !seen.insert(*kind) {
            result.push(
                Severity::Warning,
                "pipeline.strategies",
                format!("{kind} listed more than once"),
            );
        }
    }

    let strategy_timeout = config
        .http
        .request_timeout_secs
        .max(config.downloader.timeout_secs);
    if config.pipeline.link_budget_secs < strategy_timeout {
        result.push(
            Severity::Warning,
            "pipeline.link_budget_secs",
            "shorter than a single strategy timeout; later strategies may never run",
        );
    }

    result
}
