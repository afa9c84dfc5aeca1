// =============================================================================
// CONFIGURATION - Load logging settings from config.toml
// =============================================================================
//
// Only logging is configurable. The window (800x600 "Vulkan") and validation
// (debug builds only) are fixed and live next to the code that uses them.
// A missing config.toml means defaults; a broken one means defaults plus a
// warning once the logger is up.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::Deserialize;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logging: LoggingConfig,
}

/// Logging settings
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub to_file: bool,
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to_file: false,
            file: "vk_bootstrap.log".to_string(),
        }
    }
}

impl Config {
    /// Load config.toml from the working directory.
    ///
    /// Runs before logging exists, so a load failure is handed back for the
    /// caller to log instead of being logged here.
    pub fn load() -> (Self, Option<anyhow::Error>) {
        Self::load_or_default("config.toml")
    }

    /// Load `path`, falling back to defaults and returning why
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<anyhow::Error>) {
        match Self::load_from_path(path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Log level as a `log` filter
    pub fn log_level(&self) -> LevelFilter {
        self.logging.level.parse().unwrap_or_else(|_| {
            // Logger isn't up yet when this runs, so stderr it is
            eprintln!(
                "Unknown log level '{}', defaulting to info",
                self.logging.level
            );
            LevelFilter::Info
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_file(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("vk-bootstrap-{}-{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.log_level(), LevelFilter::Info);
        assert!(!config.logging.to_file);
        assert_eq!(config.logging.file, "vk_bootstrap.log");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = Config::from_toml_str(
            r#"
            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level(), LevelFilter::Debug);
        assert!(!config.logging.to_file);
    }

    #[test]
    fn window_and_validation_are_not_configurable() {
        assert!(Config::from_toml_str("[window]\nwidth = 1920\nheight = 1080").is_err());
        assert!(Config::from_toml_str("[debug]\nvalidation_layers = false").is_err());
        assert!(Config::from_toml_str("[logging]\nvalidation_layers = false").is_err());
    }

    #[test]
    fn malformed_value_is_an_error() {
        assert!(Config::from_toml_str("[logging]\nto_file = \"yes please\"").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let (config, reason) = Config::load_or_default("definitely/not/here/config.toml");
        assert!(reason.is_none());
        assert_eq!(config.log_level(), LevelFilter::Info);
    }

    #[test]
    fn malformed_file_falls_back_with_a_reason() {
        let path = scratch_file("malformed.toml", "[logging\nlevel = ");

        assert!(Config::load_from_path(&path).is_err());

        let (config, reason) = Config::load_or_default(&path);
        let reason = reason.expect("fallback reason");
        assert!(format!("{:#}", reason).contains("Failed to parse config file"));
        assert_eq!(config.log_level(), LevelFilter::Info);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn valid_file_is_loaded() {
        let path = scratch_file("valid.toml", "[logging]\nlevel = \"warn\"\n");

        let (config, reason) = Config::load_or_default(&path);
        assert!(reason.is_none());
        assert_eq!(config.log_level(), LevelFilter::Warn);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let mut config = Config::default();
        config.logging.level = "chatty".into();
        assert_eq!(config.log_level(), LevelFilter::Info);
    }
}
