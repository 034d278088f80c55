//! Configuration management for tax-records.
//!
//! Configuration is loaded with figment from (highest precedence first):
//! 1. Environment variables prefixed with `TAX_RECORDS_` (nested keys split on `__`,
//!    e.g. `TAX_RECORDS_AUTH__JWT_SECRET`)
//! 2. A TOML file (`tax-records.toml` in the working directory by default)
//! 3. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "tax-records.toml";

/// Environment variable prefix.
const ENV_PREFIX: &str = "TAX_RECORDS_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// Allow cross-origin requests from any origin.
    pub cors_permissive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require a signed-in session for the record routes.
    pub enabled: bool,
    /// HS256 signing secret for session tokens.
    pub jwt_secret: String,
    /// Session token lifetime in hours.
    pub token_ttl_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Seconds an error message stays on screen.
    pub error_display_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("tax-records.db"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            cors_permissive: true,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jwt_secret: String::new(),
            token_ttl_hours: 24,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            error_display_secs: 5,
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.token_ttl_hours))
    }
}

impl UiConfig {
    pub fn error_display(&self) -> Duration {
        Duration::from_secs(self.error_display_secs)
    }
}

impl Config {
    /// Load configuration from the default file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let config = Self::load_from_unchecked(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load without running [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if loading or parsing fails.
    pub fn load_from_unchecked(config_path: Option<&Path>) -> Result<Self> {
        let config_file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        Ok(Self::figment(&config_file).extract()?)
    }

    fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind_address.trim().is_empty() {
            return Err(Error::ConfigValidation(
                "server.bind_address must not be empty".to_string(),
            ));
        }

        if self.auth.enabled && self.auth.jwt_secret.trim().is_empty() {
            return Err(Error::ConfigValidation(
                "auth.jwt_secret must be set when auth is enabled".to_string(),
            ));
        }

        if self.auth.token_ttl_hours == 0 {
            return Err(Error::ConfigValidation(
                "auth.token_ttl_hours must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.database_path, PathBuf::from("tax-records.db"));
        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
        assert!(config.auth.enabled);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.ui.error_display(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_requires_secret() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("jwt_secret"));
    }

    #[test]
    fn test_auth_disabled_needs_no_secret() {
        let mut config = Config::default();
        config.auth.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config.auth.token_ttl_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [storage]
                database_path = "/tmp/years.db"

                [auth]
                jwt_secret = "from-file"
                "#,
            )?;
            jail.set_env("TAX_RECORDS_SERVER__BIND_ADDRESS", "0.0.0.0:8080");

            let config = Config::load_from(Some(Path::new("custom.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.storage.database_path, PathBuf::from("/tmp/years.db"));
            assert_eq!(config.auth.jwt_secret, "from-file");
            assert_eq!(config.server.bind_address, "0.0.0.0:8080");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("TAX_RECORDS_AUTH__ENABLED", "false");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert!(!config.auth.enabled);
            assert_eq!(config.ui.error_display_secs, 5);
            Ok(())
        });
    }
}
