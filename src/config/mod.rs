pub mod toml_config;

pub use toml_config::{
    AppConfig, CartoConfig, GeocoderConfig, RepairConfig, ServerConfig, StorageConfig,
    DEFAULT_CONFIG_FILE,
};
