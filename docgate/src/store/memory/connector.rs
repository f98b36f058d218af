use super::store::InMemoryDatabase;
use super::{InMemoryStore, InMemoryStoreConfig};
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use crate::store::{StoreConnector, StoreProvider};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// URI scheme handled by [InMemoryConnector].
pub const MEMORY_SCHEME: &str = "memory://";

/// Connects to in-memory databases addressed by `memory://` URIs.
///
/// Connections made through the same connector to the same `(uri, database)`
/// pair see the same data. Each connection is shut down independently.
///
/// ```text
/// let connector = InMemoryConnector::new();
/// let handle = connect(&connector, "memory://local", "app").await?;
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    inner: Arc<InMemoryConnectorInner>,
}

#[derive(Default)]
struct InMemoryConnectorInner {
    config: InMemoryStoreConfig,
    databases: DashMap<String, Arc<InMemoryDatabase>>,
}

impl InMemoryConnector {
    pub fn new() -> InMemoryConnector {
        InMemoryConnector::with_config(InMemoryStoreConfig::new())
    }

    /// A connector whose stores all use `config`.
    pub fn with_config(config: InMemoryStoreConfig) -> InMemoryConnector {
        InMemoryConnector {
            inner: Arc::new(InMemoryConnectorInner {
                config,
                databases: DashMap::new(),
            }),
        }
    }

    /// Opens a concrete store, for callers that need [InMemoryStore]
    /// specifics such as `snapshot`.
    pub fn open(&self, uri: &str, database: &str) -> GatewayResult<InMemoryStore> {
        if !uri.starts_with(MEMORY_SCHEME) {
            log::error!("Unsupported URI for in-memory store: {}", uri);
            return Err(GatewayError::new(
                &format!("unsupported URI '{}', expected {}", uri, MEMORY_SCHEME),
                ErrorKind::InvalidOperation,
            ));
        }
        if database.is_empty() {
            log::error!("Database name cannot be empty");
            return Err(GatewayError::new(
                "database name cannot be empty",
                ErrorKind::InvalidOperation,
            ));
        }

        let key = format!("{}/{}", uri.trim_end_matches('/'), database);
        let data = self
            .inner
            .databases
            .entry(key)
            .or_insert_with(|| Arc::new(InMemoryDatabase::new()))
            .value()
            .clone();
        Ok(InMemoryStore::attach(database, data, self.inner.config.clone()))
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect(&self, uri: &str, database: &str) -> GatewayResult<Arc<dyn StoreProvider>> {
        if let Some(latency) = self.inner.config.latency() {
            tokio::time::sleep(latency).await;
        }
        let store = self.open(uri, database)?;
        log::debug!("Connected to in-memory database {} at {}", database, uri);
        Ok(Arc::new(store))
    }
}
