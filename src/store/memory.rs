use crate::store::StateStore;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory store, used by tests and as a fallback when no data directory
/// is available.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let map = self.inner.lock().await;
        let value = map.get(key).cloned();
        debug!(
            "Memory store load for {key}: {}",
            if value.is_some() { "hit" } else { "miss" }
        );
        Ok(value)
    }

    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        let mut map = self.inner.lock().await;
        debug!("Memory store save for {key}");
        map.insert(key.to_string(), value.clone());
        Ok(())
    }
}
