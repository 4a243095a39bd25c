use crate::adapters::memory::InMemoryRegistry;
use crate::adapters::storage::LocalStorage;
use crate::config::StorageConfig;
use crate::domain::model::RegistrySnapshot;
use crate::domain::ports::{Registry, Storage};
use crate::utils::error::Result;

pub const DEFAULT_SNAPSHOT_FILE: &str = "registry.json";

/// Loads and saves the whole registry as one JSON document.
pub struct SnapshotStore<S: Storage> {
    storage: S,
    file_name: String,
}

impl<S: Storage> SnapshotStore<S> {
    pub fn new(storage: S, file_name: impl Into<String>) -> Self {
        Self {
            storage,
            file_name: file_name.into(),
        }
    }

    /// An absent snapshot file is an empty registry.
    pub async fn load(&self) -> Result<RegistrySnapshot> {
        if !self.storage.exists(&self.file_name).await {
            tracing::info!("No snapshot at {}, starting empty", self.file_name);
            return Ok(RegistrySnapshot::default());
        }

        let data = self.storage.read_file(&self.file_name).await?;
        let snapshot: RegistrySnapshot = serde_json::from_slice(&data)?;
        tracing::debug!(
            "Loaded snapshot: {} assets, {} locations, {} raw assets",
            snapshot.assets.len(),
            snapshot.locations.len(),
            snapshot.raw_assets.len()
        );
        Ok(snapshot)
    }

    pub async fn load_registry(&self) -> Result<InMemoryRegistry> {
        Ok(InMemoryRegistry::from_snapshot(self.load().await?))
    }

    pub async fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        tracing::debug!("Writing snapshot ({} bytes) to storage", json.len());
        self.storage.write_file(&self.file_name, &json).await
    }

    pub async fn save_registry(&self, registry: &dyn Registry) -> Result<()> {
        let snapshot = registry.snapshot().await?;
        self.save(&snapshot).await
    }
}

impl SnapshotStore<LocalStorage> {
    /// `{data_dir}/{snapshot_file}` on the local filesystem.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            LocalStorage::new(&config.data_dir),
            config.snapshot_file.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::RegistryError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                RegistryError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(path)
        }
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let store = SnapshotStore::new(MockStorage::default(), DEFAULT_SNAPSHOT_FILE);
        assert_eq!(store.load().await.unwrap(), RegistrySnapshot::default());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let storage = MockStorage::default();
        storage
            .write_file(DEFAULT_SNAPSHOT_FILE, b"not json")
            .await
            .unwrap();

        let store = SnapshotStore::new(storage, DEFAULT_SNAPSHOT_FILE);
        assert!(matches!(
            store.load().await,
            Err(RegistryError::SerializationError(_))
        ));
    }

    #[tokio::test]
    async fn test_save_and_reload_registry() {
        use crate::domain::model::{LookupKind, NewAsset};

        let storage = MockStorage::default();
        let store = SnapshotStore::new(storage.clone(), DEFAULT_SNAPSHOT_FILE);

        let registry = InMemoryRegistry::new();
        let tag = registry
            .get_or_create_lookup(LookupKind::Tag, "free")
            .await
            .unwrap();
        registry
            .insert_asset(
                NewAsset {
                    name: "Community Clinic".to_string(),
                    tag_ids: vec![tag.id],
                    ..NewAsset::default()
                },
                "import",
            )
            .await
            .unwrap();
        store.save_registry(&registry).await.unwrap();

        let reloaded = SnapshotStore::new(storage, DEFAULT_SNAPSHOT_FILE)
            .load_registry()
            .await
            .unwrap();
        let asset = reloaded.get_asset(1).await.unwrap();
        assert_eq!(asset.name, "Community Clinic");
        assert_eq!(asset.tag_ids, vec![tag.id]);
    }
}
