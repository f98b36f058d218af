//! Store handles: connect, ping and disconnect.

use crate::collection::{Document, DocumentId, Filter};
use crate::config::Deadlines;
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use crate::gateway;
use crate::gateway::with_deadline;
use crate::store::{InsertManyResult, StoreConnector, StoreProvider};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A live connection to one database of a document store.
///
/// A handle is obtained from [connect] (or [StoreHandle::builder]) and must be
/// released with [disconnect], which consumes it. A handle that is dropped
/// without being disconnected, for instance on an early return or while a
/// panic unwinds, logs a warning and shuts the store down in the background on
/// the current tokio runtime.
///
/// The handle is shared by reference: any number of tasks may run operations
/// through `&StoreHandle` (or an `Arc<StoreHandle>`) at the same time.
///
/// # Examples
///
/// ```rust,ignore
/// let connector = InMemoryConnector::new();
/// let handle = connect(&connector, "memory://local", "app").await?;
/// assert!(ping(&handle).await);
/// disconnect(handle).await?;
/// ```
pub struct StoreHandle {
    inner: Arc<HandleInner>,
}

impl StoreHandle {
    /// Returns a builder for connecting with non-default deadlines.
    pub fn builder() -> HandleBuilder {
        HandleBuilder::new()
    }

    fn new(provider: Arc<dyn StoreProvider>, database: &str, deadlines: Deadlines) -> Self {
        StoreHandle {
            inner: Arc::new(HandleInner {
                provider,
                database: database.to_string(),
                deadlines,
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Narrows the handle to a named collection.
    ///
    /// The collection is not resolved against the store; a missing collection
    /// simply behaves as empty on reads.
    pub fn collection(&self, name: &str) -> CollectionRef {
        CollectionRef {
            handle: self.inner.clone(),
            name: name.to_string(),
        }
    }

    pub fn database(&self) -> &str {
        &self.inner.database
    }

    pub fn deadlines(&self) -> &Deadlines {
        &self.inner.deadlines
    }

    /// The store capability behind this handle.
    pub fn provider(&self) -> &Arc<dyn StoreProvider> {
        &self.inner.provider
    }

    /// See [ping].
    pub async fn ping(&self) -> bool {
        ping(self).await
    }

    /// See [disconnect].
    pub async fn disconnect(self) -> GatewayResult<()> {
        disconnect(self).await
    }
}

impl Debug for StoreHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("database", &self.inner.database)
            .field("deadlines", &self.inner.deadlines)
            .finish()
    }
}

struct HandleInner {
    provider: Arc<dyn StoreProvider>,
    database: String,
    deadlines: Deadlines,
    released: AtomicBool,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if self.released.load(Ordering::Acquire) {
            return;
        }

        log::warn!(
            "Store handle for database {} dropped without disconnect",
            self.database
        );
        let provider = self.provider.clone();
        let database = self.database.clone();
        let deadline = self.deadlines.connect;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    match with_deadline("disconnect", deadline, provider.shutdown()).await {
                        Ok(()) => log::debug!("Background shutdown of database {} done", database),
                        Err(err) => log::warn!(
                            "Background shutdown of database {} failed: {}",
                            database,
                            err
                        ),
                    }
                });
            }
            Err(_) => log::warn!(
                "No tokio runtime to shut down the store for database {}",
                database
            ),
        }
    }
}

/// Builder for a [StoreHandle].
///
/// Configuration errors are captured and returned from [HandleBuilder::connect]
/// before any connection attempt is made.
///
/// ```rust,ignore
/// let handle = StoreHandle::builder()
///     .deadlines(Deadlines::default().with_find(Duration::from_secs(60)))
///     .connect(&connector, "memory://local", "app")
///     .await?;
/// ```
#[derive(Default)]
pub struct HandleBuilder {
    error: Option<GatewayError>,
    deadlines: Deadlines,
}

impl HandleBuilder {
    pub fn new() -> Self {
        HandleBuilder {
            error: None,
            deadlines: Deadlines::default(),
        }
    }

    /// Sets the deadlines for every operation made through the handle.
    ///
    /// A zero deadline is captured as an error and reported by `connect`.
    pub fn deadlines(mut self, deadlines: Deadlines) -> Self {
        if self.error.is_none() {
            if let Err(e) = deadlines.validate() {
                self.error = Some(e);
                return self;
            }
        }
        self.deadlines = deadlines;
        self
    }

    /// Connects to `database` through `connector` within the connect deadline.
    ///
    /// `uri` is forwarded to the connector untouched; its parsing and any
    /// authentication are the connector's business. The database is selected
    /// but no collection is resolved.
    pub async fn connect<C>(self, connector: &C, uri: &str, database: &str) -> GatewayResult<StoreHandle>
    where
        C: StoreConnector + ?Sized,
    {
        if let Some(error) = self.error {
            return Err(connection_error("connect", database, error));
        }

        if database.is_empty() {
            return Err(connection_error(
                "connect",
                database,
                GatewayError::new("database name cannot be empty", ErrorKind::InvalidOperation),
            ));
        }

        log::debug!("Connecting to database {}", database);
        let provider = with_deadline(
            "connect",
            self.deadlines.connect,
            connector.connect(uri, database),
        )
        .await
        .map_err(|cause| connection_error("connect", database, cause))?;

        log::debug!("Connected to database {}", database);
        Ok(StoreHandle::new(provider, database, self.deadlines))
    }
}

/// Connects to `database` with the default deadlines.
///
/// Fails with `ConnectionError` when the connector cannot reach the store
/// within the connect deadline (10s by default).
pub async fn connect<C>(connector: &C, uri: &str, database: &str) -> GatewayResult<StoreHandle>
where
    C: StoreConnector + ?Sized,
{
    HandleBuilder::new().connect(connector, uri, database).await
}

/// Issues a liveness probe against the primary within the ping deadline.
///
/// Returns `false` on any failure, including a timeout; the failure is only
/// logged.
pub async fn ping(handle: &StoreHandle) -> bool {
    let deadline = handle.deadlines().ping;
    match with_deadline("ping", deadline, handle.provider().ping()).await {
        Ok(()) => true,
        Err(err) => {
            log::warn!("Ping to database {} failed: {}", handle.database(), err);
            false
        }
    }
}

/// Releases the store behind `handle`.
///
/// Consumes the handle, so it cannot be released twice. The shutdown is
/// bounded by the connect deadline. Collection references created from the
/// handle stay valid as values but their operations fail afterwards.
pub async fn disconnect(handle: StoreHandle) -> GatewayResult<()> {
    handle.inner.released.store(true, Ordering::Release);
    let database = handle.database().to_string();
    let deadline = handle.deadlines().connect;

    log::debug!("Disconnecting from database {}", database);
    with_deadline("disconnect", deadline, handle.provider().shutdown())
        .await
        .map_err(|cause| connection_error("disconnect", &database, cause))
}

fn connection_error(operation: &'static str, database: &str, cause: GatewayError) -> GatewayError {
    log::error!("Could not {} database {}: {}", operation, database, cause);
    GatewayError::new_with_cause(
        &format!("could not {} database {}: {}", operation, database, cause),
        ErrorKind::ConnectionError,
        cause,
    )
    .with_operation(operation)
}

/// A [StoreHandle] narrowed to one collection.
///
/// Cheap to clone and safe to move between tasks. Every gateway operation is
/// also available as a method.
///
/// ```rust,ignore
/// let users = handle.collection("users");
/// let id = users.insert_one(doc! { name: "john" }).await?;
/// let john = users.find_one(&Filter::by_id(&id)).await?;
/// ```
#[derive(Clone)]
pub struct CollectionRef {
    handle: Arc<HandleInner>,
    name: String,
}

impl CollectionRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.handle.database
    }

    pub fn deadlines(&self) -> &Deadlines {
        &self.handle.deadlines
    }

    pub fn provider(&self) -> &Arc<dyn StoreProvider> {
        &self.handle.provider
    }

    pub async fn insert_one(&self, document: Document) -> GatewayResult<DocumentId> {
        gateway::insert_one(self, document).await
    }

    pub async fn insert_many(&self, documents: Vec<Document>) -> GatewayResult<InsertManyResult> {
        gateway::insert_many(self, documents).await
    }

    pub async fn find_one(&self, filter: &Filter) -> GatewayResult<Document> {
        gateway::find_one(self, filter).await
    }

    pub async fn find_many(&self, filter: &Filter) -> GatewayResult<Vec<Document>> {
        gateway::find_many(self, filter).await
    }

    pub async fn find_all(&self) -> GatewayResult<Vec<Document>> {
        gateway::find_all(self).await
    }

    pub async fn delete_one(&self, filter: &Filter) -> GatewayResult<u64> {
        gateway::delete_one(self, filter).await
    }

    pub async fn delete_many(&self, filter: &Filter) -> GatewayResult<u64> {
        gateway::delete_many(self, filter).await
    }
}

impl Debug for CollectionRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionRef")
            .field("database", &self.handle.database)
            .field("name", &self.name)
            .finish()
    }
}
