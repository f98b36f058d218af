use crate::common::DEFAULT_BATCH_SIZE;
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for an in-memory store.
///
/// # Characteristics
/// - **Batching**: cursors hand documents out in batches of `batch_size`
/// - **Latency**: an optional delay applied before every store call,
///   including connect and shutdown, used to exercise deadlines without a
///   real network
/// - **Unique fields**: per-collection fields that must be unique, in
///   addition to `_id`
///
/// ```text
/// let config = InMemoryStoreConfig::new()
///     .with_batch_size(1)
///     .with_unique_field("users", "email");
/// let store = InMemoryStore::new("app", config);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStoreConfig {
    batch_size: usize,
    latency: Option<Duration>,
    unique_fields: HashMap<String, Vec<String>>,
}

impl InMemoryStoreConfig {
    pub fn new() -> InMemoryStoreConfig {
        InMemoryStoreConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            latency: None,
            unique_fields: HashMap::new(),
        }
    }

    /// Sets the cursor batch size. A size of zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Delays every store call by `latency`, connecting and shutting down
    /// included.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Declares `field` unique within `collection`.
    pub fn with_unique_field(mut self, collection: &str, field: &str) -> Self {
        self.unique_fields
            .entry(collection.to_string())
            .or_default()
            .push(field.to_string());
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    /// Unique fields declared for `collection`.
    pub fn unique_fields(&self, collection: &str) -> &[String] {
        self.unique_fields
            .get(collection)
            .map(|fields| fields.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        InMemoryStoreConfig::new()
    }
}
