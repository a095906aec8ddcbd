//! Configuration structures for deserialisation.
//!
//! These map directly to the JSON configuration file. Every field has a
//! default, so `{}` is a valid configuration.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::mcp::protocol::SERVER_NAME;
use crate::mcp::server::ServerInfo;
use crate::registry::DuplicatePolicy;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Identity reported to clients.
    #[serde(default)]
    pub server: ServerConfig,

    /// Registration behaviour.
    #[serde(default)]
    pub registration: RegistrationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::validation("server.name must not be empty"));
        }

        if !is_semver(&self.server.version) {
            return Err(ConfigError::validation(format!(
                "Invalid server.version '{}'. Expected <major>.<minor>.<patch>",
                self.server.version
            )));
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::validation(format!(
                "Invalid logging.level '{}'. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Server identity for the initialisation handshake.
    #[must_use]
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.server.name.clone(),
            version: self.server.version.clone(),
        }
    }
}

fn is_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

/// Server identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Version reported in `serverInfo`.
    #[serde(default = "default_server_version")]
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
        }
    }
}

fn default_server_name() -> String {
    SERVER_NAME.to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Registration behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationConfig {
    /// What to do when a name or URI is registered twice.
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.name, "easy-mcp");
        assert_eq!(config.registration.on_duplicate, DuplicatePolicy::Overwrite);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "server": { "name": "files", "version": "2.1.0" },
            "registration": { "on_duplicate": "reject" },
            "logging": { "level": "debug" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.server_info(),
            ServerInfo {
                name: "files".to_string(),
                version: "2.1.0".to_string()
            }
        );
        assert_eq!(config.registration.on_duplicate, DuplicatePolicy::Reject);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn reject_empty_name() {
        let config: Config = serde_json::from_str(r#"{"server": {"name": " "}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_bad_version() {
        for version in ["1.0", "1.0.x", "v1.0.0", "1..0"] {
            let json = format!(r#"{{"server": {{"version": "{version}"}}}}"#);
            let config: Config = serde_json::from_str(&json).unwrap();
            assert!(config.validate().is_err(), "{version}");
        }
    }

    #[test]
    fn reject_bad_log_level() {
        let config: Config = serde_json::from_str(r#"{"logging": {"level": "loud"}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_duplicate_policy() {
        let result: Result<Config, _> =
            serde_json::from_str(r#"{"registration": {"on_duplicate": "merge"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let result: Result<Config, _> = serde_json::from_str(r#"{"unknown_field": "value"}"#);
        assert!(result.is_err());
    }
}
