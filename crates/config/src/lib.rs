//! Configuration loading, validation and env substitution.
//!
//! Config files: `pinsaver.toml`, `pinsaver.yaml`, `pinsaver.yml` or
//! `pinsaver.json`, searched in `./` then `~/.config/pinsaver/`.
//!
//! Supports `${ENV_VAR}` substitution in the raw file text.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        DownloaderConfig, FetchConfig, HttpConfig, PinsaverConfig, PipelineConfig, PlatformConfig,
        StrategyKind, TelegramConfig,
    },
    validate::{Diagnostic, Requirements, Severity, ValidationResult, validate},
};
