use super::{InMemoryStoreConfig, Matcher};
use crate::collection::{Document, DocumentId, Filter};
use crate::common::OPERATOR_PREFIX;
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use crate::store::{
    DeleteOptions, DocumentCursor, InsertManyOptions, InsertManyResult, StoreProvider,
};
use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Records = IndexMap<DocumentId, Document>;

/// Collections of one in-memory database, shared by every connection to it.
#[derive(Default)]
pub(crate) struct InMemoryDatabase {
    collections: DashMap<String, Arc<RwLock<Records>>>,
}

impl InMemoryDatabase {
    pub(crate) fn new() -> Self {
        InMemoryDatabase::default()
    }

    fn collection(&self, name: &str) -> Arc<RwLock<Records>> {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(IndexMap::new())))
            .value()
            .clone()
    }

    fn existing(&self, name: &str) -> Option<Arc<RwLock<Records>>> {
        self.collections.get(name).map(|entry| entry.value().clone())
    }
}

/// In-memory implementation of a document store.
///
/// # Purpose
/// `InMemoryStore` keeps collections in process memory and evaluates filters
/// itself. It backs the `memory://` scheme and is what the test suites run
/// against.
///
/// # Characteristics
/// - **Thread-Safe**: collections live in a `DashMap`, each behind its own lock
/// - **Ordered**: documents are kept and returned in insertion order
/// - **Store-assigned ids**: documents without `_id` receive a new object id
/// - **Per-connection lifecycle**: shutting a store down closes this
///   connection only; the data stays visible to other connections
///
/// ```text
/// let store = InMemoryStore::new("app", InMemoryStoreConfig::new());
/// let id = store.insert_one("users", doc!{ name: "john" }).await?;
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

impl InMemoryStore {
    /// Creates a store over a fresh, unshared database.
    pub fn new(database: &str, config: InMemoryStoreConfig) -> InMemoryStore {
        InMemoryStore::attach(database, Arc::new(InMemoryDatabase::new()), config)
    }

    pub(crate) fn attach(
        database: &str,
        data: Arc<InMemoryDatabase>,
        config: InMemoryStoreConfig,
    ) -> InMemoryStore {
        InMemoryStore {
            inner: Arc::new(InMemoryStoreInner {
                name: database.to_string(),
                data,
                config,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }

    /// Copies the documents of `collection` in store order, bypassing the
    /// store lifecycle. Intended for test assertions.
    pub fn snapshot(&self, collection: &str) -> Vec<Document> {
        match self.inner.data.existing(collection) {
            Some(records) => records.read().values().cloned().collect(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl StoreProvider for InMemoryStore {
    fn database_name(&self) -> &str {
        &self.inner.name
    }

    async fn ping(&self) -> GatewayResult<()> {
        self.inner.prepare().await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> GatewayResult<DocumentId> {
        self.inner.prepare().await?;
        self.inner.insert_one(collection, document)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        options: &InsertManyOptions,
    ) -> GatewayResult<InsertManyResult> {
        self.inner.prepare().await?;
        Ok(self.inner.insert_many(collection, documents, options))
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> GatewayResult<Option<Document>> {
        self.inner.prepare().await?;
        self.inner.find_one(collection, filter)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> GatewayResult<DocumentCursor> {
        self.inner.prepare().await?;
        let documents = self.inner.find(collection, filter)?;
        let batches = documents
            .chunks(self.inner.config.batch_size())
            .map(|chunk| chunk.to_vec())
            .collect();
        Ok(DocumentCursor::from_batches(batches))
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &DeleteOptions,
    ) -> GatewayResult<u64> {
        self.inner.prepare().await?;
        self.inner.delete(collection, filter, options, false)
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &DeleteOptions,
    ) -> GatewayResult<u64> {
        self.inner.prepare().await?;
        self.inner.delete(collection, filter, options, true)
    }

    async fn shutdown(&self) -> GatewayResult<()> {
        if !self.inner.closed.load(Ordering::Relaxed) {
            if let Some(latency) = self.inner.config.latency() {
                tokio::time::sleep(latency).await;
            }
        }
        if self.inner.closed.swap(true, Ordering::Relaxed) {
            log::debug!("In-memory store {} already shut down", self.inner.name);
        } else {
            log::debug!("In-memory store {} shut down", self.inner.name);
        }
        Ok(())
    }
}

struct InMemoryStoreInner {
    name: String,
    data: Arc<InMemoryDatabase>,
    config: InMemoryStoreConfig,
    closed: AtomicBool,
}

impl InMemoryStoreInner {
    /// Rejects calls on a closed store, then applies the configured latency.
    async fn prepare(&self) -> GatewayResult<()> {
        self.check_opened()?;
        if let Some(latency) = self.config.latency() {
            tokio::time::sleep(latency).await;
        }
        self.check_opened()
    }

    fn check_opened(&self) -> GatewayResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("In-memory store {} is closed", self.name);
            return Err(GatewayError::new(
                &format!("store {} is closed", self.name),
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }

    fn insert_one(&self, collection: &str, document: Document) -> GatewayResult<DocumentId> {
        let records = self.data.collection(collection);
        let mut records = records.write();
        self.insert_locked(collection, &mut records, document)
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        options: &InsertManyOptions,
    ) -> InsertManyResult {
        let records = self.data.collection(collection);
        let mut records = records.write();
        let mut result = InsertManyResult::new();

        for (index, document) in documents.into_iter().enumerate() {
            match self.insert_locked(collection, &mut records, document) {
                Ok(id) => result.record_inserted(index, id),
                Err(err) => {
                    result.record_failure(index, err);
                    if options.ordered {
                        break;
                    }
                }
            }
        }
        result
    }

    fn insert_locked(
        &self,
        collection: &str,
        records: &mut Records,
        mut document: Document,
    ) -> GatewayResult<DocumentId> {
        if let Some(field) = document.fields().find(|f| f.starts_with(OPERATOR_PREFIX)) {
            log::error!("Field name {} in {} starts with $", field, collection);
            return Err(GatewayError::new(
                &format!("field name '{}' must not start with '$'", field),
                ErrorKind::ValidationError,
            ));
        }

        let id = match document.id() {
            Some(id) => id.clone(),
            None => {
                let id = DocumentId::new();
                document.set_id(id.clone());
                id
            }
        };

        if records.contains_key(&id) {
            return Err(duplicate_key(collection, "_id", &id.to_string()));
        }

        for field in self.config.unique_fields(collection) {
            if let Some(value) = document.get(field) {
                if records.values().any(|existing| existing.get(field) == Some(value)) {
                    return Err(duplicate_key(collection, field, &value.to_string()));
                }
            }
        }

        records.insert(id.clone(), document);
        Ok(id)
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> GatewayResult<Option<Document>> {
        filter.validate()?;
        let matcher = Matcher::new(None)?;
        let records = match self.data.existing(collection) {
            Some(records) => records,
            None => return Ok(None),
        };

        let records = records.read();
        for document in records.values() {
            if matcher.matches(document, filter.as_document())? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    fn find(&self, collection: &str, filter: &Filter) -> GatewayResult<Vec<Document>> {
        filter.validate()?;
        let matcher = Matcher::new(None)?;
        let records = match self.data.existing(collection) {
            Some(records) => records,
            None => return Ok(Vec::new()),
        };

        let records = records.read();
        let mut documents = Vec::new();
        for document in records.values() {
            if matcher.matches(document, filter.as_document())? {
                documents.push(document.clone());
            }
        }
        Ok(documents)
    }

    fn delete(
        &self,
        collection: &str,
        filter: &Filter,
        options: &DeleteOptions,
        many: bool,
    ) -> GatewayResult<u64> {
        filter.validate()?;
        let matcher = Matcher::new(options.collation.as_ref())?;
        let records = match self.data.existing(collection) {
            Some(records) => records,
            None => return Ok(0),
        };

        let mut records = records.write();
        let mut doomed = Vec::new();
        for (id, document) in records.iter() {
            if matcher.matches(document, filter.as_document())? {
                doomed.push(id.clone());
                if !many {
                    break;
                }
            }
        }

        for id in &doomed {
            records.shift_remove(id);
        }
        Ok(doomed.len() as u64)
    }
}

fn duplicate_key(collection: &str, field: &str, value: &str) -> GatewayError {
    log::error!("Duplicate key in {}: {} = {}", collection, field, value);
    GatewayError::new(
        &format!(
            "E11000 duplicate key error collection: {} index: {} dup key: {}",
            collection, field, value
        ),
        ErrorKind::DuplicateKey,
    )
}
