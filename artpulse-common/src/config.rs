//! Configuration loading for ArtPulse services
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const ENV_CONFIG_FILE: &str = "ARTPULSE_CONFIG";
/// Environment variable overriding the database path
pub const ENV_DATABASE_PATH: &str = "ARTPULSE_DATABASE";
/// Environment variable overriding the listen port
pub const ENV_PORT: &str = "ARTPULSE_PORT";

/// Raw TOML config file contents
///
/// All fields optional; missing fields fall back to env vars or defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Load a TOML config file. A missing file is not an error - services
    /// must start with defaults when no config is present.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl ServiceConfig {
    /// Resolve configuration from CLI arguments, environment, TOML file and
    /// compiled defaults, in that priority order.
    pub fn resolve(
        cli_config_file: Option<&Path>,
        cli_database: Option<&Path>,
        cli_port: Option<u16>,
        default_port: u16,
    ) -> Result<Self> {
        let config_path = cli_config_file
            .map(PathBuf::from)
            .or_else(|| std::env::var(ENV_CONFIG_FILE).ok().map(PathBuf::from));

        let toml_config = match &config_path {
            Some(path) => TomlConfig::load(path)?,
            None => TomlConfig::default(),
        };

        let database_path = cli_database
            .map(PathBuf::from)
            .or_else(|| std::env::var(ENV_DATABASE_PATH).ok().map(PathBuf::from))
            .or(toml_config.database_path)
            .unwrap_or_else(|| PathBuf::from("artpulse.db"));

        let port = cli_port
            .or_else(|| {
                std::env::var(ENV_PORT)
                    .ok()
                    .and_then(|v| v.parse::<u16>().ok())
            })
            .or(toml_config.port)
            .unwrap_or(default_port);

        let host = toml_config.host.unwrap_or_else(|| "0.0.0.0".to_string());
        let log_level = toml_config.log_level.unwrap_or_else(|| "info".to_string());

        Ok(Self {
            database_path,
            host,
            port,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_uses_defaults() {
        let config = TomlConfig::load(Path::new("/nonexistent/artpulse.toml")).unwrap();
        assert!(config.database_path.is_none());
        assert!(config.port.is_none());
    }

    #[test]
    fn cli_database_beats_toml() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("config.toml");
        std::fs::write(&config_file, "database_path = \"/from/toml.db\"\nport = 9000\n")
            .unwrap();

        let resolved = ServiceConfig::resolve(
            Some(&config_file),
            Some(Path::new("/from/cli.db")),
            None,
            5600,
        )
        .unwrap();

        assert_eq!(resolved.database_path, PathBuf::from("/from/cli.db"));
        assert_eq!(resolved.port, 9000);
    }

    #[test]
    fn default_port_applies_when_unset() {
        let resolved = ServiceConfig::resolve(None, Some(Path::new("x.db")), None, 5600).unwrap();
        assert_eq!(resolved.port, 5600);
        assert_eq!(resolved.host, "0.0.0.0");
        assert_eq!(resolved.log_level, "info");
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("config.toml");
        std::fs::write(&config_file, "port = \"not a number").unwrap();

        let result = ServiceConfig::resolve(Some(&config_file), None, None, 5600);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
