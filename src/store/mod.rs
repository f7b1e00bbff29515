//! Key-value persistence behind the state manager.
//!
//! Values are opaque JSON trees; the store neither inspects nor migrates
//! them. Writes replace the whole value for a key.

pub mod disk;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the value stored under `key`, or `None` when nothing has been
    /// saved yet.
    async fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Full-replace write of `value` under `key`.
    async fn save(&self, key: &str, value: &Value) -> Result<()>;
}
