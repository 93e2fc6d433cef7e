//! Configuration loading and config file resolution
//!
//! Tolerances and logging settings come from an optional TOML file,
//! resolved with the following priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MURRE_CONFIG`)
//! 3. Default path (`murre.toml` in the working directory)
//! 4. Built-in defaults (no file at all)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "MURRE_CONFIG";

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "murre.toml";

/// Agreement tolerances used by the reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Two timestamps within this many seconds are treated as agreeing
    pub date_tolerance_seconds: f64,
    /// Two durations within this many seconds are treated as agreeing
    pub duration_tolerance_seconds: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            date_tolerance_seconds: 2.0,
            duration_tolerance_seconds: 0.5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Tool configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub tolerances: Tolerances,
    pub logging: LoggingConfig,
}

/// Resolve the config file path following the priority order above.
///
/// Returns `None` when no candidate exists on disk and no explicit
/// path was given; an explicitly named file that is missing is an error
/// surfaced by [`load_config`].
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Default path, only if present
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default.exists() {
        return Some(default);
    }

    // Priority 4: Built-in defaults
    None
}

/// Load configuration, falling back to built-in defaults when no file
/// is resolved.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = resolve_config_path(cli_arg) else {
        tracing::debug!("No config file found, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let config: TomlConfig = toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Write configuration to a TOML file
pub fn write_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.tolerances.date_tolerance_seconds, 2.0);
        assert_eq!(config.tolerances.duration_tolerance_seconds, 0.5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [tolerances]
            date_tolerance_seconds = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(config.tolerances.date_tolerance_seconds, 5.0);
        // Unspecified fields fall back to defaults
        assert_eq!(config.tolerances.duration_tolerance_seconds, 0.5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "tolerances = \"not a table\"").unwrap();

        let result = load_config(Some(path.as_path()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_round_trip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("murre.toml");

        let config = TomlConfig {
            tolerances: Tolerances {
                date_tolerance_seconds: 10.0,
                duration_tolerance_seconds: 1.5,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        };

        write_config(&config, &path).unwrap();
        let loaded = load_config(Some(path.as_path())).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    #[serial]
    fn test_cli_arg_beats_env_var() {
        let temp_dir = TempDir::new().unwrap();
        let cli_path = temp_dir.path().join("cli.toml");
        let env_path = temp_dir.path().join("env.toml");
        std::fs::write(&cli_path, "").unwrap();
        std::fs::write(&env_path, "").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, &env_path);
        let resolved = resolve_config_path(Some(cli_path.as_path()));
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(resolved, Some(cli_path));
    }

    #[test]
    #[serial]
    fn test_env_var_used_when_no_cli_arg() {
        let temp_dir = TempDir::new().unwrap();
        let env_path = temp_dir.path().join("env.toml");
        std::fs::write(&env_path, "").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, &env_path);
        let resolved = resolve_config_path(None);
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(resolved, Some(env_path));
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_error() {
        std::env::remove_var(CONFIG_ENV_VAR);
        let result = load_config(Some(Path::new("/nonexistent/murre.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
