use crate::adapters::snapshot::DEFAULT_SNAPSHOT_FILE;
use crate::core::address::DEFAULT_STATE;
use crate::utils::error::{RegistryError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "asset-registry.toml";
pub const DEFAULT_CHANGE_REASON: &str = "Regenerating locations (bad initial Location assignment)";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub repair: RepairConfig,
    #[serde(default)]
    pub carto: CartoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".to_string()],
            request_timeout_secs: 30,
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub snapshot_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            snapshot_file: DEFAULT_SNAPSHOT_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Geocodio results below this accuracy are ignored.
    pub min_accuracy: f64,
    pub timeout_seconds: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.geocod.io/v1.7".to_string(),
            api_key: None,
            min_accuracy: 0.0,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub default_state: String,
    pub change_reason: String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            default_state: DEFAULT_STATE.to_string(),
            change_reason: DEFAULT_CHANGE_REASON.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CartoConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub table_name: String,
}

impl Default for CartoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://wprdc.carto.com".to_string(),
            api_key: None,
            table_name: "assets".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads `path`, or the built-in defaults when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RegistryError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RegistryError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| RegistryError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn snapshot_path(&self) -> std::path::PathBuf {
        Path::new(&self.storage.data_dir).join(&self.storage.snapshot_file)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        validation::validate_positive_number(
            "server.request_timeout_secs",
            self.server.request_timeout_secs,
            1,
        )?;
        for origin in &self.server.cors_origins {
            validation::validate_url("server.cors_origins", origin)?;
        }

        validation::validate_path("storage.data_dir", &self.storage.data_dir)?;
        validation::validate_path("storage.snapshot_file", &self.storage.snapshot_file)?;

        validation::validate_url("geocoder.base_url", &self.geocoder.base_url)?;
        validation::validate_range("geocoder.min_accuracy", self.geocoder.min_accuracy, 0.0, 1.0)?;
        validation::validate_positive_number(
            "geocoder.timeout_seconds",
            self.geocoder.timeout_seconds,
            1,
        )?;
        if let Some(key) = &self.geocoder.api_key {
            if key.starts_with("${") {
                return Err(RegistryError::InvalidConfigValueError {
                    field: "geocoder.api_key".to_string(),
                    value: key.clone(),
                    reason: "environment variable is not set".to_string(),
                });
            }
        }

        validation::validate_non_empty_string("repair.default_state", &self.repair.default_state)?;
        validation::validate_non_empty_string("repair.change_reason", &self.repair.change_reason)?;

        validation::validate_url("carto.base_url", &self.carto.base_url)?;
        validation::validate_non_empty_string("carto.table_name", &self.carto.table_name)?;
        if !self
            .carto
            .table_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(RegistryError::InvalidConfigValueError {
                field: "carto.table_name".to_string(),
                value: self.carto.table_name.clone(),
                reason: "only letters, digits and underscores are allowed".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.repair.default_state, "PA");
        assert_eq!(config.repair.change_reason, DEFAULT_CHANGE_REASON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("ASSET_REGISTRY_TEST_GEOCODIO_KEY", "abc123");
        let config = AppConfig::from_toml_str(
            r#"
[geocoder]
api_key = "${ASSET_REGISTRY_TEST_GEOCODIO_KEY}"
min_accuracy = 0.8

[storage]
data_dir = "/var/lib/assets"
"#,
        )
        .unwrap();

        assert_eq!(config.geocoder.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.geocoder.min_accuracy, 0.8);
        assert_eq!(
            config.snapshot_path(),
            Path::new("/var/lib/assets").join("registry.json")
        );
    }

    #[test]
    fn test_unset_variable_fails_validation() {
        let config = AppConfig::from_toml_str(
            r#"
[geocoder]
api_key = "${ASSET_REGISTRY_TEST_UNSET_VARIABLE}"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = AppConfig::default();
        config.geocoder.min_accuracy = 2.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.carto.table_name = "assets; DROP TABLE x".to_string();
        assert!(config.validate().is_err());

        assert!(AppConfig::from_toml_str("[server]\nport = \"eighty\"").is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = AppConfig::load("/definitely/not/here.toml").unwrap();
        assert_eq!(config.storage.snapshot_file, "registry.json");
    }
}
