use docgate::collection::{Document, DocumentId, Filter};
use docgate::config::Deadlines;
use docgate::errors::{ErrorKind, GatewayError, GatewayResult};
use docgate::store::memory::{InMemoryConnector, InMemoryStoreConfig};
use docgate::{doc, CollectionRef, StoreHandle};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Collections the suites write to; `cleanup` empties them on shared stores.
pub const TEST_COLLECTIONS: [&str; 3] = ["users", "orders", "test"];

pub const MEMORY_URI: &str = "memory://docgate-test";

/// Runs an async test between `before` and `after` on a fresh runtime,
/// retrying when any of the three steps returns an error.
///
/// `after` runs even when the test fails. Panics (failed assertions) are not
/// retried.
pub fn run_test<B, BF, T, TF, A, AF>(before: B, test: T, after: A)
where
    B: Fn() -> BF,
    BF: Future<Output = GatewayResult<TestContext>>,
    T: Fn(TestContext) -> TF,
    TF: Future<Output = GatewayResult<()>>,
    A: Fn(TestContext) -> AF,
    AF: Future<Output = GatewayResult<()>>,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => panic!("Failed to build test runtime: {}", e),
    };

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result: Result<(), String> = runtime.block_on(async {
            let ctx = before()
                .await
                .map_err(|e| format!("Before run failed: {:?}", e))?;
            match test(ctx.clone()).await {
                Ok(_) => after(ctx)
                    .await
                    .map_err(|e| format!("After run failed: {:?}", e)),
                Err(e) => {
                    let _ = after(ctx).await;
                    Err(format!("Test failed: {:?}", e))
                }
            }
        });

        match result {
            Ok(_) => return,
            Err(e) => {
                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                        attempt,
                        MAX_RETRIES,
                        start_time.elapsed()
                    );
                    eprintln!("Error: {}", e);
                    eprintln!("Retrying in {}ms...\n", 100 * attempt);
                    std::thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
                last_error = Some(e);
            }
        }
    }

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    database: String,
    handle: Arc<StoreHandle>,
    shared: bool,
}

impl TestContext {
    pub fn new(database: String, handle: StoreHandle, shared: bool) -> Self {
        Self {
            database,
            handle: Arc::new(handle),
            shared,
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    /// The handle behind an `Arc`, for moving into spawned tasks.
    pub fn shared_handle(&self) -> Arc<StoreHandle> {
        self.handle.clone()
    }

    pub fn collection(&self, name: &str) -> CollectionRef {
        self.handle.collection(name)
    }
}

pub fn random_database() -> String {
    format!("docgate_test_{:08x}", rand::random::<u32>())
}

/// Opens a handle on the store selected by the crate features: the
/// in-memory store by default, MongoDB with the `mongodb` feature.
#[cfg(not(feature = "mongodb"))]
pub async fn create_test_context() -> GatewayResult<TestContext> {
    create_memory_context(InMemoryStoreConfig::new(), Deadlines::default()).await
}

#[cfg(feature = "mongodb")]
pub async fn create_test_context() -> GatewayResult<TestContext> {
    use docgate_mongodb_adapter::MongoConnector;

    let uri = std::env::var("DOCGATE_MONGODB_URI").map_err(|_| {
        GatewayError::new(
            "DOCGATE_MONGODB_URI must name a MongoDB deployment",
            ErrorKind::InvalidOperation,
        )
    })?;
    let database = random_database();
    let connector = MongoConnector::with_config()
        .app_name("docgate-int-test")
        .server_selection_timeout(Duration::from_secs(5))
        .build();
    let handle = docgate::connect(&connector, &uri, &database).await?;
    Ok(TestContext::new(database, handle, true))
}

/// Opens a handle on a private in-memory database.
pub async fn create_memory_context(
    config: InMemoryStoreConfig,
    deadlines: Deadlines,
) -> GatewayResult<TestContext> {
    let database = random_database();
    let connector = InMemoryConnector::with_config(config);
    let handle = StoreHandle::builder()
        .deadlines(deadlines)
        .connect(&connector, MEMORY_URI, &database)
        .await?;
    Ok(TestContext::new(database, handle, false))
}

/// An in-memory store that takes `latency` to answer any call, with every
/// deadline set to `deadline`.
pub async fn create_slow_test_context(
    latency: Duration,
    deadline: Duration,
) -> GatewayResult<TestContext> {
    let config = InMemoryStoreConfig::new().with_latency(latency);
    let deadlines = Deadlines::uniform(deadline).with_connect(Duration::from_secs(10));
    create_memory_context(config, deadlines).await
}

/// An in-memory store handing out cursor batches of `batch_size`.
pub async fn create_batched_test_context(batch_size: usize) -> GatewayResult<TestContext> {
    create_memory_context(
        InMemoryStoreConfig::new().with_batch_size(batch_size),
        Deadlines::default(),
    )
    .await
}

/// An in-memory store where `email` is unique in `users`.
pub async fn create_unique_email_context() -> GatewayResult<TestContext> {
    create_memory_context(
        InMemoryStoreConfig::new().with_unique_field("users", "email"),
        Deadlines::default(),
    )
    .await
}

pub async fn cleanup(ctx: TestContext) -> GatewayResult<()> {
    if ctx.shared {
        for name in TEST_COLLECTIONS {
            ctx.collection(name).delete_many(&Filter::all()).await?;
        }
    }

    match Arc::try_unwrap(ctx.handle) {
        Ok(handle) => docgate::disconnect(handle).await,
        Err(_) => {
            log::warn!(
                "Handle for {} is still shared, leaving shutdown to drop",
                ctx.database
            );
            Ok(())
        }
    }
}

/// Two records of the same user, as a store would return them over two
/// cursor batches.
pub fn create_john_docs() -> Vec<Document> {
    vec![
        doc! { name: "john", email: "testEmail1" },
        doc! { name: "john", email: "testEmail2" },
    ]
}

pub fn create_test_docs() -> Vec<Document> {
    let doc1 = doc! {
        first_name: "fn1",
        last_name: "ln1",
        age: 31,
        arr: [1, 2, 3],
        address: { city: "Berlin", zip: 10115 },
        body: "a quick brown fox jump over the lazy dog",
    };

    let doc2 = doc! {
        first_name: "fn2",
        last_name: "ln2",
        age: 42,
        arr: [3, 4, 3],
        address: { city: "Paris", zip: 75001 },
        body: "quick hello world from docgate",
    };

    let doc3 = doc! {
        first_name: "fn3",
        last_name: "ln2",
        age: 27,
        arr: [9, 4, 8],
        address: { city: "berlin", zip: 10117 },
        body: "Lorem ipsum dolor sit amet, consectetur \
        adipiscing elit. Sed nunc mi, mattis ullamcorper \
        dignissim vitae, condimentum non lorem.",
    };

    vec![doc1, doc2, doc3]
}

pub async fn insert_test_documents(collection: &CollectionRef) -> GatewayResult<Vec<DocumentId>> {
    let result = collection.insert_many(create_test_docs()).await?;
    if !result.is_complete() {
        return Err(GatewayError::new(
            "fixture documents were rejected",
            ErrorKind::InternalError,
        ));
    }
    Ok(result.inserted_ids())
}

/// Reads a string field, for terse assertions.
pub fn text_field(document: &Document, field: &str) -> Option<String> {
    document
        .get(field)
        .and_then(|value| value.as_string())
        .cloned()
}
