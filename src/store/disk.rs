use crate::store::StateStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Fjall-backed store. One partition holds all keys; each value is the
/// JSON-serialized state tree.
pub struct DiskStore {
    // The keyspace owns the journal; it must outlive the partition handle.
    keyspace: Arc<Keyspace>,
    partition: PartitionHandle,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let partition = keyspace
            .open_partition("app", PartitionCreateOptions::default())
            .context("Failed to open store partition")?;
        Ok(Self {
            keyspace: Arc::new(keyspace),
            partition,
        })
    }
}

#[async_trait]
impl StateStore for DiskStore {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        match self.partition.get(key)? {
            Some(bytes) => {
                debug!("Disk store load hit for {key}");
                let value = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupt value stored under {key}"))?;
                Ok(Some(value))
            }
            None => {
                debug!("Disk store load miss for {key}");
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.partition
            .insert(key, bytes)
            .with_context(|| format!("Failed to persist {key}"))?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to sync store journal")?;
        debug!("Disk store save for {key}");
        Ok(())
    }
}
