use crate::collection::{Document, DocumentId, Filter};
use crate::common::Collation;
use crate::errors::{GatewayError, GatewayResult};
use crate::store::DocumentCursor;
use async_trait::async_trait;
use std::sync::Arc;

/// Establishes connections to a document store.
///
/// The connector owns URI parsing, authentication and client construction;
/// docgate only forwards the string it was given and bounds the call with the
/// connect deadline.
///
/// # Implementations
/// - `InMemoryConnector`: `memory://` URIs, for tests and local development
/// - `MongoConnector` (`docgate-mongodb-adapter`): `mongodb://` and
///   `mongodb+srv://` URIs
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Connects and selects `database`. Collections are resolved per operation.
    async fn connect(&self, uri: &str, database: &str) -> GatewayResult<Arc<dyn StoreProvider>>;
}

/// The capability set docgate needs from a connected store.
///
/// A provider is bound to a single database and must be safe to share between
/// any number of concurrent callers; pooling is the provider's own concern.
/// Providers report failures with cause kinds such as `DuplicateKey`,
/// `TransportError` or `DecodingError`; gateways wrap them into the facade
/// taxonomy.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// Name of the database this provider is bound to.
    fn database_name(&self) -> &str;

    /// Round-trip liveness probe against the primary.
    async fn ping(&self) -> GatewayResult<()>;

    /// Inserts one document, returning the identifier the store assigned
    /// (or the `_id` the document already carried).
    async fn insert_one(&self, collection: &str, document: Document) -> GatewayResult<DocumentId>;

    /// Inserts many documents. Per-document failures are reported in the
    /// result; an `Err` means the call as a whole failed.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        options: &InsertManyOptions,
    ) -> GatewayResult<InsertManyResult>;

    /// Returns the first matching document in store order, if any.
    async fn find_one(&self, collection: &str, filter: &Filter) -> GatewayResult<Option<Document>>;

    /// Opens a cursor over every matching document in store order.
    async fn find(&self, collection: &str, filter: &Filter) -> GatewayResult<DocumentCursor>;

    /// Removes the first matching document, returning how many were removed.
    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &DeleteOptions,
    ) -> GatewayResult<u64>;

    /// Removes every matching document, returning how many were removed.
    async fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &DeleteOptions,
    ) -> GatewayResult<u64>;

    /// Releases the underlying client. Later calls fail with
    /// `StoreAlreadyClosed`.
    async fn shutdown(&self) -> GatewayResult<()>;
}

/// Options for [StoreProvider::insert_many].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertManyOptions {
    /// When `false`, a failing document does not stop the remaining ones.
    pub ordered: bool,
}

impl InsertManyOptions {
    pub fn unordered() -> Self {
        InsertManyOptions { ordered: false }
    }
}

impl Default for InsertManyOptions {
    fn default() -> Self {
        InsertManyOptions { ordered: true }
    }
}

/// Options for the delete calls of a [StoreProvider].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub collation: Option<Collation>,
}

impl DeleteOptions {
    pub fn with_collation(collation: Collation) -> Self {
        DeleteOptions {
            collation: Some(collation),
        }
    }
}

/// A document the store refused during an insert-many.
#[derive(Debug, Clone)]
pub struct WriteFailure {
    index: usize,
    error: GatewayError,
}

impl WriteFailure {
    pub fn new(index: usize, error: GatewayError) -> Self {
        WriteFailure { index, error }
    }

    /// Position of the document in the input.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn error(&self) -> &GatewayError {
        &self.error
    }
}

/// Outcome of an insert-many: every identifier the store assigned and every
/// document it refused, each keyed by input position.
#[derive(Debug, Clone, Default)]
pub struct InsertManyResult {
    inserted: Vec<(usize, DocumentId)>,
    failures: Vec<WriteFailure>,
}

impl InsertManyResult {
    pub fn new() -> Self {
        InsertManyResult::default()
    }

    pub fn record_inserted(&mut self, index: usize, id: DocumentId) {
        self.inserted.push((index, id));
    }

    pub fn record_failure(&mut self, index: usize, error: GatewayError) {
        self.failures.push(WriteFailure::new(index, error));
    }

    /// Identifiers in input order.
    pub fn inserted_ids(&self) -> Vec<DocumentId> {
        let mut inserted = self.inserted.clone();
        inserted.sort_by_key(|(index, _)| *index);
        inserted.into_iter().map(|(_, id)| id).collect()
    }

    /// `(input index, identifier)` pairs.
    pub fn inserted(&self) -> &[(usize, DocumentId)] {
        &self.inserted
    }

    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }

    pub fn failures(&self) -> &[WriteFailure] {
        &self.failures
    }

    /// `true` when no document was refused.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
