use crate::error::StateStoreError;

pub mod memory;
pub mod paging;
pub mod sled_store;

/// Durable string key-value storage behind a `PagingStateStore`.
pub trait StateBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StateStoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), StateStoreError>;
    fn remove(&self, key: &str) -> Result<(), StateStoreError>;
    /// Keys stored under `prefix`, in key order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StateStoreError>;
}
