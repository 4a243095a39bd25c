use std::sync::Arc;

use crate::adapters::snapshot::SnapshotStore;
use crate::adapters::storage::LocalStorage;
use crate::config::AppConfig;
use crate::core::split::SplitOptions;
use crate::domain::ports::{Geocoder, Registry};
use crate::utils::error::Result;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn Registry>,
    pub geocoder: Arc<dyn Geocoder>,
    /// Where writes are persisted; `None` keeps the registry in memory only.
    pub snapshots: Option<Arc<SnapshotStore<LocalStorage>>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        registry: Arc<dyn Registry>,
        geocoder: Arc<dyn Geocoder>,
        snapshots: Option<SnapshotStore<LocalStorage>>,
        config: AppConfig,
    ) -> Self {
        Self {
            registry,
            geocoder,
            snapshots: snapshots.map(Arc::new),
            config: Arc::new(config),
        }
    }

    pub fn split_options(&self) -> SplitOptions {
        SplitOptions::from(&self.config.repair)
    }

    /// Writes the current registry to the snapshot file, if one is configured.
    pub async fn persist(&self) -> Result<()> {
        if let Some(store) = &self.snapshots {
            store.save_registry(self.registry.as_ref()).await?;
        }
        Ok(())
    }
}
