use super::{check_collection_name, with_deadline, CollectionTarget, FIND_ALL, FIND_MANY, FIND_ONE};
use crate::collection::{Document, Filter};
use crate::errors::{ErrorKind, GatewayError, GatewayResult};

/// Returns the first document matching `filter` within the find-one deadline
/// (5s by default).
///
/// Zero matches is a `NotFound` error, never an empty success. Other failures
/// are a `ReadError`. Both echo the filter.
pub async fn find_one<T: CollectionTarget>(target: T, filter: &Filter) -> GatewayResult<Document> {
    let collection = target.collection_name();
    check_collection_name(collection)
        .map_err(|cause| read_error(FIND_ONE, collection, filter, cause))?;
    filter
        .validate()
        .map_err(|cause| read_error(FIND_ONE, collection, filter, cause))?;

    log::debug!("Finding one document in {} matching {}", collection, filter);
    let found = with_deadline(
        FIND_ONE,
        target.deadlines().find_one,
        target.provider().find_one(collection, filter),
    )
    .await
    .map_err(|cause| read_error(FIND_ONE, collection, filter, cause))?;

    match found {
        Some(document) => Ok(document),
        None => {
            log::debug!("No record in {} matches {}", collection, filter);
            Err(GatewayError::new(
                &format!("no record in {} matches {}", collection, filter),
                ErrorKind::NotFound,
            )
            .with_operation(FIND_ONE)
            .with_collection(collection)
            .with_filter(filter))
        }
    }
}

/// Returns every document matching `filter`, in store order, within the find
/// deadline (30s by default).
///
/// The cursor is drained record by record across however many batches the
/// store uses. The deadline covers opening the cursor and the whole
/// iteration. If iteration fails part way, the documents read so far are
/// discarded and only the `ReadError` is returned.
pub async fn find_many<T: CollectionTarget>(target: T, filter: &Filter) -> GatewayResult<Vec<Document>> {
    find_with(FIND_MANY, &target, filter).await
}

/// Returns every document of the collection; `find_many` with the empty
/// filter.
pub async fn find_all<T: CollectionTarget>(target: T) -> GatewayResult<Vec<Document>> {
    find_with(FIND_ALL, &target, &Filter::all()).await
}

async fn find_with<T: CollectionTarget>(
    operation: &'static str,
    target: &T,
    filter: &Filter,
) -> GatewayResult<Vec<Document>> {
    let collection = target.collection_name();
    check_collection_name(collection)
        .map_err(|cause| read_error(operation, collection, filter, cause))?;
    filter
        .validate()
        .map_err(|cause| read_error(operation, collection, filter, cause))?;

    log::debug!("Finding documents in {} matching {}", collection, filter);
    let provider = target.provider();
    let documents = with_deadline(operation, target.deadlines().find, async {
        let cursor = provider.find(collection, filter).await?;
        cursor.collect_all().await
    })
    .await
    .map_err(|cause| read_error(operation, collection, filter, cause))?;

    log::debug!("Found {} documents in {}", documents.len(), collection);
    Ok(documents)
}

fn read_error(
    operation: &'static str,
    collection: &str,
    filter: &Filter,
    cause: GatewayError,
) -> GatewayError {
    log::error!(
        "Could not find records in {} matching {} with error: {}",
        collection,
        filter,
        cause
    );
    GatewayError::new_with_cause(
        &format!(
            "could not find records in {} matching {} with error: {}",
            collection, filter, cause
        ),
        ErrorKind::ReadError,
        cause,
    )
    .with_operation(operation)
    .with_collection(collection)
    .with_filter(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Deadlines;
    use crate::gateway::test_support::{FixedTarget, UnreachableStore};
    use crate::store::memory::{InMemoryConnector, InMemoryStoreConfig};
    use crate::store::{
        CursorProvider, DeleteOptions, DocumentCursor, InsertManyOptions, InsertManyResult,
        StoreProvider,
    };
    use crate::collection::DocumentId;
    use crate::{connect, doc, StoreHandle};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    async fn seeded(config: InMemoryStoreConfig) -> StoreHandle {
        let connector = InMemoryConnector::with_config(config);
        let handle = connect(&connector, "memory://local", "app").await.unwrap();
        let users = handle.collection("users");
        users
            .insert_many(vec![
                doc! { name: "john", email: "testEmail1" },
                doc! { name: "john", email: "testEmail2" },
                doc! { name: "jane", email: "testEmail3" },
            ])
            .await
            .unwrap();
        handle
    }

    #[tokio::test]
    async fn find_one_returns_first_match() {
        let handle = seeded(InMemoryStoreConfig::new()).await;
        let john = find_one((&handle, "users"), &Filter::eq("name", "john")).await.unwrap();
        assert_eq!(john.get("email"), Some(&"testEmail1".into()));
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn find_one_without_match_is_not_found() {
        let handle = seeded(InMemoryStoreConfig::new()).await;
        let filter = Filter::eq("name", "nobody");
        let err = find_one((&handle, "users"), &filter).await.err().unwrap();
        assert!(err.is_not_found());
        assert_eq!(err.filter(), Some(&filter));
        assert_eq!(err.collection(), Some("users"));
        assert!(err.message().contains("nobody"));
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn find_many_spans_batches_in_order() {
        let handle = seeded(InMemoryStoreConfig::new().with_batch_size(1)).await;
        let users = handle.collection("users");
        let johns = find_many(&users, &Filter::eq("name", "john")).await.unwrap();
        let emails: Vec<_> = johns.iter().filter_map(|d| d.get("email")).cloned().collect();
        assert_eq!(emails, vec!["testEmail1".into(), "testEmail2".into()]);
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn find_all_returns_everything() {
        let handle = seeded(InMemoryStoreConfig::new()).await;
        let everyone = find_all((&handle, "users")).await.unwrap();
        assert_eq!(everyone.len(), 3);
        assert!(find_all((&handle, "empty")).await.unwrap().is_empty());
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn filter_is_left_untouched() {
        let handle = seeded(InMemoryStoreConfig::new()).await;
        let filter = Filter::new(doc! { name: { "$in": ["john", "jane"] } });
        let before = filter.clone();
        find_many((&handle, "users"), &filter).await.unwrap();
        assert_eq!(filter, before);
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_filter_is_read_error() {
        let handle = seeded(InMemoryStoreConfig::new()).await;
        let filter = Filter::new(doc! { name: { "$regex": "(" } });
        let err = find_many((&handle, "users"), &filter).await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ReadError);
        assert_eq!(err.cause().map(|c| c.kind()), Some(&ErrorKind::FilterError));
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_filter_never_reaches_the_store() {
        let handle = seeded(InMemoryStoreConfig::new()).await;
        let filter = Filter::eq("", "john");
        let err = find_one((&handle, "users"), &filter).await.err().unwrap();
        assert!(!err.is_not_found());
        assert_eq!(err.cause().map(|c| c.kind()), Some(&ErrorKind::FilterError));
        let err = find_many((&handle, "users"), &filter).await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ReadError);
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn dotted_filter_matches_embedded_field() {
        let handle = seeded(InMemoryStoreConfig::new()).await;
        let users = handle.collection("users");
        users
            .insert_one(doc! { name: "pierre", address: { city: "Paris", zip: 75001 } })
            .await
            .unwrap();

        let found = find_many(&users, &crate::filter! { "address.city": "Paris" }).await.unwrap();
        assert_eq!(found.len(), 1);
        let found = find_one(&users, &Filter::eq("address.zip", 75001)).await.unwrap();
        assert_eq!(found.get("name"), Some(&"pierre".into()));
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn transport_failure_is_read_error() {
        let target = FixedTarget::new(Arc::new(UnreachableStore));
        let err = find_one(&target, &Filter::all()).await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ReadError);
        let err = find_all(&target).await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ReadError);
        assert_eq!(err.operation(), Some(FIND_ALL));
    }

    #[tokio::test]
    async fn mid_iteration_failure_discards_results() {
        let target = FixedTarget::new(Arc::new(CorruptStore));
        let err = find_many(&target, &Filter::all()).await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ReadError);
        assert_eq!(err.cause().map(|c| c.kind()), Some(&ErrorKind::DecodingError));
    }

    #[tokio::test]
    async fn deadline_covers_whole_iteration() {
        let target = FixedTarget::new(Arc::new(CorruptStore))
            .with_deadlines(Deadlines::default().with_find(Duration::from_millis(30)));
        let err = find_many(&target, &Filter::eq("slow", true)).await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ReadError);
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn find_one_times_out() {
        let handle = StoreHandle::builder()
            .deadlines(Deadlines::default().with_find_one(Duration::from_millis(20)))
            .connect(
                &InMemoryConnector::with_config(
                    InMemoryStoreConfig::new().with_latency(Duration::from_millis(200)),
                ),
                "memory://local",
                "app",
            )
            .await
            .unwrap();
        let err = find_one((&handle, "users"), &Filter::all()).await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ReadError);
        assert!(err.is_timeout());
        handle.disconnect().await.unwrap();
    }

    /// Opens cursors that serve one good batch, then either fail to decode
    /// or (for `{slow: true}`) stall.
    struct CorruptStore;

    struct CorruptCursor {
        served: bool,
        slow: bool,
    }

    #[async_trait]
    impl CursorProvider for CorruptCursor {
        async fn next_batch(&mut self) -> GatewayResult<Option<Vec<Document>>> {
            if !self.served {
                self.served = true;
                return Ok(Some(vec![doc! { name: "john" }]));
            }
            if self.slow {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Err(GatewayError::new("invalid record", ErrorKind::DecodingError))
        }
    }

    #[async_trait]
    impl StoreProvider for CorruptStore {
        fn database_name(&self) -> &str {
            "corrupt"
        }

        async fn ping(&self) -> GatewayResult<()> {
            Ok(())
        }

        async fn insert_one(&self, _: &str, _: Document) -> GatewayResult<DocumentId> {
            Ok(DocumentId::new())
        }

        async fn insert_many(
            &self,
            _: &str,
            _: Vec<Document>,
            _: &InsertManyOptions,
        ) -> GatewayResult<InsertManyResult> {
            Ok(InsertManyResult::new())
        }

        async fn find_one(&self, _: &str, _: &Filter) -> GatewayResult<Option<Document>> {
            Ok(None)
        }

        async fn find(&self, _: &str, filter: &Filter) -> GatewayResult<DocumentCursor> {
            let slow = filter.as_document().contains_key("slow");
            Ok(DocumentCursor::new(CorruptCursor {
                served: false,
                slow,
            }))
        }

        async fn delete_one(&self, _: &str, _: &Filter, _: &DeleteOptions) -> GatewayResult<u64> {
            Ok(0)
        }

        async fn delete_many(&self, _: &str, _: &Filter, _: &DeleteOptions) -> GatewayResult<u64> {
            Ok(0)
        }

        async fn shutdown(&self) -> GatewayResult<()> {
            Ok(())
        }
    }
}
