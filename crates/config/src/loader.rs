use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::PinsaverConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "pinsaver.toml",
    "pinsaver.yaml",
    "pinsaver.yml",
    "pinsaver.json",
];

/// Environment variables that carry the bot token, highest priority first.
const TOKEN_ENV_VARS: &[&str] = &["PINSAVER_BOT_TOKEN", "BOT_TOKEN"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<PinsaverConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Load configuration, apply environment overrides, and return it.
///
/// An explicit path must exist. Without one, standard locations are searched:
/// 1. `./pinsaver.{toml,yaml,yml,json}`
/// 2. `~/.config/pinsaver/pinsaver.{toml,yaml,yml,json}`
///
/// Defaults are used when nothing is found.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<PinsaverConfig> {
    let mut config = match explicit.map(Path::to_path_buf).or_else(find_config_file) {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config(&path)?
        },
        None => {
            debug!("no config file found, using defaults");
            PinsaverConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Overlay values taken from the environment.
pub fn apply_env_overrides(config: &mut PinsaverConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(token) = TOKEN_ENV_VARS
        .iter()
        .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
    {
        config.telegram.token = Secret::new(token);
    }
}

/// Returns the user-global config directory (`~/.config/pinsaver/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pinsaver").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<PinsaverConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pinsaver.yaml");
        std::fs::write(
            &path,
            "fetch:\n  max_bytes: 2048\nplatform:\n  short_link_host: pin.example\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.fetch.max_bytes, 2048);
        assert_eq!(cfg.platform.short_link_host, "pin.example");
        assert_eq!(cfg.fetch.timeout_secs, 60);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = discover_and_load(Some(&missing)).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pinsaver.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pinsaver.toml");
        std::fs::write(&path, "[fetch\nmax_bytes = ").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("pinsaver.toml"));
    }

    #[test]
    fn env_token_overrides_file_value() {
        let mut cfg = PinsaverConfig::default();
        apply_env_overrides(&mut cfg, |name| match name {
            "BOT_TOKEN" => Some("from-env".into()),
            _ => None,
        });
        assert_eq!(cfg.telegram.token.expose_secret(), "from-env");
    }

    #[test]
    fn blank_prefixed_token_falls_back_to_bot_token() {
        let mut cfg = PinsaverConfig::default();
        apply_env_overrides(&mut cfg, |name| match name {
            "PINSAVER_BOT_TOKEN" => Some("  ".into()),
            "BOT_TOKEN" => Some("fallback".into()),
            _ => None,
        });
        assert_eq!(cfg.telegram.token.expose_secret(), "fallback");
    }
}
