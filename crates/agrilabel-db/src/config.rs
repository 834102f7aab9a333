//! # Application Configuration
//!
//! Settings that live outside the database: where the database is, which
//! company prefix numbers the SSCCs, and who the sender is on labels and
//! transport documents.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     AGRILABEL_DB_PATH, AGRILABEL_COMPANY_PREFIX,                       │
//! │     AGRILABEL_EXTENSION_DIGIT, AGRILABEL_SENDER_NAME,                  │
//! │     AGRILABEL_STRICT_WEIGHTS, AGRILABEL_LOG                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/agrilabel/agrilabel.toml (Linux)                         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/agrilabel/agrilabel.db"
//!
//! [company]
//! prefix = "8012345"
//! extension_digit = 0
//! first_serial = 1
//!
//! [sender]
//! name = "Azienda Agricola Rossi"
//! address = "Via delle Vigne 12, 00100 Roma (RM)"
//! vat = "01234567890"
//!
//! [weighing]
//! strict_input = false
//!
//! [logging]
//! filter = "info,agrilabel=debug,sqlx=warn"
//! ```
//!
//! The `[company]` section only seeds the counter of a fresh database;
//! afterwards the stored serial state wins.

use agrilabel_core::validation::{validate_company_prefix, validate_extension_digit};
use agrilabel_core::{InputPolicy, SerialState};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::pool::DbConfig;

const CONFIG_FILE_NAME: &str = "agrilabel.toml";
const DATABASE_FILE_NAME: &str = "agrilabel.db";

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Default: platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("it", "agrilabel", "agrilabel")
        .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
        }
    }
}

/// `[company]`: SSCC numbering for a fresh database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySettings {
    /// GS1 company prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub extension_digit: u8,

    /// Serial the first unit receives.
    #[serde(default = "default_first_serial")]
    pub first_serial: u64,
}

fn default_prefix() -> String {
    SerialState::default().company_prefix
}

fn default_first_serial() -> u64 {
    1
}

impl Default for CompanySettings {
    fn default() -> Self {
        CompanySettings {
            prefix: default_prefix(),
            extension_digit: 0,
            first_serial: default_first_serial(),
        }
    }
}

/// `[sender]`: printed in the header of labels and transport documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderSettings {
    pub name: String,
    pub address: String,
    pub vat: String,
    pub phone: String,
    pub email: String,
}

impl Default for SenderSettings {
    fn default() -> Self {
        SenderSettings {
            name: "Azienda Agricola Rossi".to_string(),
            address: "Via delle Vigne 12, 00100 Roma (RM)".to_string(),
            vat: "01234567890".to_string(),
            phone: "+39 080 1234567".to_string(),
            email: "info@aziendaagricola.it".to_string(),
        }
    }
}

/// `[weighing]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeighingSettings {
    /// Reject malformed weights and counts instead of reading them as zero.
    #[serde(default)]
    pub strict_input: bool,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info,agrilabel=debug,sqlx=warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub company: CompanySettings,

    #[serde(default)]
    pub sender: SenderSettings,

    #[serde(default)]
    pub weighing: WeighingSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (agrilabel.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_company_prefix(&self.company.prefix)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        validate_extension_digit(self.company.extension_digit)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.sender.name.trim().is_empty() {
            return Err(ConfigError::Invalid("sender.name must not be empty".into()));
        }

        Ok(())
    }

    /// Applies environment overrides read through `var`.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("AGRILABEL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(prefix) = var("AGRILABEL_COMPANY_PREFIX") {
            debug!(prefix = %prefix, "Overriding company prefix from environment");
            self.company.prefix = prefix.trim().to_string();
        }

        if let Some(digit) = var("AGRILABEL_EXTENSION_DIGIT") {
            match digit.trim().parse::<u8>() {
                Ok(d) => self.company.extension_digit = d,
                Err(_) => warn!(value = %digit, "Ignoring non-numeric extension digit"),
            }
        }

        if let Some(name) = var("AGRILABEL_SENDER_NAME") {
            self.sender.name = name;
        }

        if let Some(strict) = var("AGRILABEL_STRICT_WEIGHTS") {
            match strict.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.weighing.strict_input = true,
                "0" | "false" | "no" | "off" => self.weighing.strict_input = false,
                _ => warn!(value = %strict, "Unknown AGRILABEL_STRICT_WEIGHTS value"),
            }
        }

        if let Some(filter) = var("AGRILABEL_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("it", "agrilabel", "agrilabel")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool configuration for the configured database file.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
    }

    /// Counter used when the database has no stored serial state.
    pub fn initial_serial(&self) -> SerialState {
        SerialState {
            company_prefix: self.company.prefix.clone(),
            extension_digit: self.company.extension_digit,
            next_serial: self.company.first_serial,
        }
    }

    /// How weight and count text fields are parsed.
    pub fn input_policy(&self) -> InputPolicy {
        if self.weighing.strict_input {
            InputPolicy::Strict
        } else {
            InputPolicy::Lenient
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_serial(), SerialState::default());
        assert_eq!(config.input_policy(), InputPolicy::Lenient);
        assert_eq!(config.sender.name, "Azienda Agricola Rossi");
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.company.prefix = "80A2345".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.company.prefix = "8".repeat(18);
        assert!(config.validate().is_err());

        config.company.prefix = "8012345".to_string();
        config.company.extension_digit = 10;
        assert!(config.validate().is_err());

        config.company.extension_digit = 9;
        config.sender.name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AGRILABEL_DB_PATH", "/tmp/other.db"),
            ("AGRILABEL_COMPANY_PREFIX", " 0123456789 "),
            ("AGRILABEL_EXTENSION_DIGIT", "3"),
            ("AGRILABEL_SENDER_NAME", "Cooperativa Sud"),
            ("AGRILABEL_STRICT_WEIGHTS", "yes"),
            ("AGRILABEL_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.company.prefix, "0123456789");
        assert_eq!(config.company.extension_digit, 3);
        assert_eq!(config.sender.name, "Cooperativa Sud");
        assert_eq!(config.input_policy(), InputPolicy::Strict);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| match key {
            "AGRILABEL_EXTENSION_DIGIT" => Some("x".to_string()),
            "AGRILABEL_STRICT_WEIGHTS" => Some("maybe".to_string()),
            _ => None,
        });

        assert_eq!(config.company.extension_digit, 0);
        assert!(!config.weighing.strict_input);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.database.path = dir.path().join("data.db");
        config.company.prefix = "80123456".to_string();
        config.weighing.strict_input = true;
        config.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[company]"));
        assert!(text.contains("[sender]"));

        let loaded: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded: AppConfig = toml::from_str(
            r#"
            [company]
            prefix = "0123456"
            "#,
        )
        .unwrap();

        assert_eq!(loaded.company.prefix, "0123456");
        assert_eq!(loaded.company.first_serial, 1);
        assert_eq!(loaded.sender, SenderSettings::default());
        assert_eq!(loaded.logging.filter, default_log_filter());
    }

    #[test]
    fn test_invalid_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[company\nprefix = ").unwrap();

        let err = AppConfig::load(Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed(_)));
    }
}
