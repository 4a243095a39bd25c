pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{
    carto::CartoClient, geocodio::GeocodioClient, memory::InMemoryRegistry,
    snapshot::SnapshotStore, storage::LocalStorage,
};
pub use config::AppConfig;
pub use core::{
    merge::{MergeMode, MergeUploader},
    split::{LocationSplitter, SplitOptions, SplitReport},
};
pub use utils::error::{RegistryError, Result};
