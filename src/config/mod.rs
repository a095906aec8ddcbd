//! Configuration file loading and parsing.
//!
//! # Configuration File Locations
//!
//! 1. Path given as the CLI positional argument (must exist)
//! 2. Default location, used only if present:
//!    - **Linux/macOS:** `~/.easy-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.easy-mcp\config.json`
//!
//! Without any file the built-in defaults apply.
//!
//! # Example Configuration
//!
//! See `config/example-config.json`.

mod settings;

pub use settings::{Config, LoggingConfig, RegistrationConfig, ServerConfig};

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.easy-mcp/`
/// - **Windows:** `%USERPROFILE%\.easy-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".easy-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and validates the configuration.
///
/// An explicit `path` must exist. With `None`, the default location is
/// read if present and the built-in defaults are used otherwise.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - A field is invalid
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => {
                debug!("No configuration file, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DuplicatePolicy;
    use std::io::Write;

    #[test]
    fn default_config_path_ends_with_file_name() {
        let path = default_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("config.json"));
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            load_config(Some(&missing)),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn loads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"registration": {{"on_duplicate": "reject"}}}}"#).unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.registration.on_duplicate, DuplicatePolicy::Reject);
    }

    #[test]
    fn shipped_example_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/example-config.json");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.name, "easy-mcp");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            load_config(Some(file.path())),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn invalid_file_is_validation_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"version": "one"}}}}"#).unwrap();
        assert!(matches!(
            load_config(Some(file.path())),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
