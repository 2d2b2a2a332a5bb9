//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate only ever sees the
//! [`EngineLimits`] section.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. `TRELLIS_*` environment variables, `__` between sections
//!    (`TRELLIS_ENGINE__MAX_DEPTH=32`)
//! 3. Config file (`--config`, or `config.toml` in the platform config dir)
//! 4. Built-in defaults (always present)
//!
//! ```toml
//! [engine]
//! max_depth = 32
//! max_download_bytes = 10485760
//!
//! [output]
//! no_color = false
//! format = "auto"
//!
//! [defaults]
//! overwrite = false
//! run_hooks = true
//! project_name = "demo"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use trellis_core::domain::EngineLimits;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TRELLIS";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Resource bounds handed to the engine.
    pub engine: EngineLimits,
    /// Output settings.
    pub output: OutputConfig,
    /// Defaults for `create` flags.
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    /// `auto`, `human`, `plain` or `json`; used when `--output-format` is
    /// left at `auto`.
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            format: "auto".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Overwrite existing files even without `--overwrite`.
    pub overwrite: bool,
    /// `false` behaves as if `--no-hooks` were always passed.
    pub run_hooks: bool,
    /// Fallback for `--project-name`.
    pub project_name: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            overwrite: false,
            run_hooks: true,
            project_name: None,
        }
    }
}

impl AppConfig {
    /// Load configuration, layering file and environment over the defaults.
    ///
    /// An explicit `config_file` must exist; the default location is optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let default_path = Self::config_path();
        let (path, required) = match config_file {
            Some(path) => (path.as_path(), true),
            None => (default_path.as_path(), false),
        };
        Self::load_from(path, required, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(path: &Path, required: bool, env: Environment) -> anyhow::Result<Self> {
        let defaults =
            Config::try_from(&Self::default()).context("Failed to build default configuration")?;

        let merged = Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        merged
            .try_deserialize()
            .context("Configuration has invalid values")
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.trellis.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "trellis", "trellis")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".trellis.toml"))
    }

    /// Look up a dotted key such as `engine.max_depth`.
    ///
    /// Returns `None` for unknown keys; unset optional values print as an
    /// empty string.
    pub fn get(&self, key: &str) -> Option<String> {
        let tree = serde_json::to_value(self).ok()?;
        let found = key
            .split('.')
            .try_fold(&tree, |node, part| node.get(part))?;
        Some(match found {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use super::*;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::new()))
    }

    #[test]
    fn defaults_match_engine_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.engine, EngineLimits::default());
        assert!(cfg.defaults.run_hooks);
        assert!(!cfg.defaults.overwrite);
        assert_eq!(cfg.output.format, "auto");
    }

    #[test]
    fn missing_optional_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(&dir.path().join("absent.toml"), false, no_env()).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load_from(&dir.path().join("absent.toml"), true, no_env()).is_err());
    }

    #[test]
    fn file_overrides_only_what_it_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[engine]\nmax_depth = 8\n\n[defaults]\nproject_name = \"demo\"\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path, true, no_env()).unwrap();
        assert_eq!(cfg.engine.max_depth, 8);
        assert_eq!(cfg.engine.max_repeat, EngineLimits::default().max_repeat);
        assert_eq!(cfg.defaults.project_name.as_deref(), Some("demo"));
        assert!(cfg.defaults.run_hooks);
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine]\nmax_depth = 8\n").unwrap();

        let env = Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::from([
            ("TRELLIS_ENGINE__MAX_DEPTH".to_owned(), "4".to_owned()),
            ("TRELLIS_DEFAULTS__RUN_HOOKS".to_owned(), "false".to_owned()),
        ])));
        let cfg = AppConfig::load_from(&path, true, env).unwrap();
        assert_eq!(cfg.engine.max_depth, 4);
        assert!(!cfg.defaults.run_hooks);
    }

    #[test]
    fn get_known_keys() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.get("engine.max_depth").as_deref(), Some("64"));
        assert_eq!(cfg.get("output.no_color").as_deref(), Some("false"));
        assert_eq!(cfg.get("output.format").as_deref(), Some("auto"));
        assert_eq!(cfg.get("defaults.project_name").as_deref(), Some(""));
    }

    #[test]
    fn get_unknown_key_is_none() {
        assert!(AppConfig::default().get("does.not.exist").is_none());
    }

    #[test]
    fn config_path_is_not_empty() {
        assert!(!AppConfig::config_path().as_os_str().is_empty());
    }
}
