use super::{check_collection_name, with_deadline, CollectionTarget, DELETE_MANY, DELETE_ONE};
use crate::collection::Filter;
use crate::common::Collation;
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use crate::store::DeleteOptions;

/// Removes the first document matching `filter` within the delete deadline
/// (2s by default) and returns how many were removed.
///
/// String matching is case-insensitive (`en_US`, primary strength), so
/// `{name: "Bob"}` removes a document whose name is `"bob"`. Zero matches is
/// `Ok(0)`, not an error.
pub async fn delete_one<T: CollectionTarget>(target: T, filter: &Filter) -> GatewayResult<u64> {
    let collection = target.collection_name();
    check_collection_name(collection)
        .map_err(|cause| delete_error(DELETE_ONE, collection, filter, cause))?;
    filter
        .validate()
        .map_err(|cause| delete_error(DELETE_ONE, collection, filter, cause))?;

    log::debug!("Deleting one document from {} matching {}", collection, filter);
    let options = DeleteOptions::with_collation(Collation::case_insensitive());
    let removed = with_deadline(
        DELETE_ONE,
        target.deadlines().delete,
        target.provider().delete_one(collection, filter, &options),
    )
    .await
    .map_err(|cause| delete_error(DELETE_ONE, collection, filter, cause))?;

    log::debug!("Deleted {} document from {}", removed, collection);
    Ok(removed)
}

/// Removes every document matching `filter` within the delete deadline (2s
/// by default), with the same case-insensitive matching as [delete_one].
pub async fn delete_many<T: CollectionTarget>(target: T, filter: &Filter) -> GatewayResult<u64> {
    let collection = target.collection_name();
    check_collection_name(collection)
        .map_err(|cause| delete_error(DELETE_MANY, collection, filter, cause))?;
    filter
        .validate()
        .map_err(|cause| delete_error(DELETE_MANY, collection, filter, cause))?;

    log::debug!("Deleting documents from {} matching {}", collection, filter);
    let options = DeleteOptions::with_collation(Collation::case_insensitive());
    let removed = with_deadline(
        DELETE_MANY,
        target.deadlines().delete,
        target.provider().delete_many(collection, filter, &options),
    )
    .await
    .map_err(|cause| delete_error(DELETE_MANY, collection, filter, cause))?;

    log::debug!("Deleted {} documents from {}", removed, collection);
    Ok(removed)
}

fn delete_error(
    operation: &'static str,
    collection: &str,
    filter: &Filter,
    cause: GatewayError,
) -> GatewayError {
    log::error!(
        "Could not delete from {} matching {} with error: {}",
        collection,
        filter,
        cause
    );
    GatewayError::new_with_cause(
        &format!(
            "could not delete from {} matching {} with error: {}",
            collection, filter, cause
        ),
        ErrorKind::DeleteError,
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
    use crate::{connect, doc, StoreHandle};
    use std::sync::Arc;
    use std::time::Duration;

    async fn seeded() -> StoreHandle {
        let connector = InMemoryConnector::new();
        let handle = connect(&connector, "memory://local", "app").await.unwrap();
        handle
            .collection("users")
            .insert_many(vec![
                doc! { name: "bob" },
                doc! { name: "BOB" },
                doc! { name: "alice" },
            ])
            .await
            .unwrap();
        handle
    }

    #[tokio::test]
    async fn delete_one_ignores_case() {
        let handle = seeded().await;
        let users = handle.collection("users");
        let removed = delete_one(&users, &Filter::eq("name", "Bob")).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(users.find_all().await.unwrap().len(), 2);
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn delete_many_ignores_case() {
        let handle = seeded().await;
        let removed = delete_many((&handle, "users"), &Filter::eq("name", "Bob"))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn no_match_deletes_nothing() {
        let handle = seeded().await;
        let filter = Filter::eq("name", "carol");
        assert_eq!(delete_one((&handle, "users"), &filter).await.unwrap(), 0);
        assert_eq!(delete_many((&handle, "users"), &filter).await.unwrap(), 0);
        assert_eq!(delete_many((&handle, "missing"), &filter).await.unwrap(), 0);
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_filter_deletes_nothing() {
        let handle = seeded().await;
        let users = handle.collection("users");
        let filter = Filter::eq("_id", "no-such-id");

        let err = delete_many(&users, &filter).await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::DeleteError);
        assert_eq!(err.cause().map(|c| c.kind()), Some(&ErrorKind::FilterError));
        let err = delete_one(&users, &filter).await.err().unwrap();
        assert_eq!(err.cause().map(|c| c.kind()), Some(&ErrorKind::FilterError));

        assert_eq!(users.find_all().await.unwrap().len(), 3);
        handle.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn transport_failure_is_delete_error() {
        let target = FixedTarget::new(Arc::new(UnreachableStore));
        let filter = Filter::eq("name", "bob");
        let err = delete_many(&target, &filter).await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::DeleteError);
        assert_eq!(err.operation(), Some(DELETE_MANY));
        assert_eq!(err.filter(), Some(&filter));
        assert_eq!(err.cause().map(|c| c.kind()), Some(&ErrorKind::TransportError));
    }

    #[tokio::test]
    async fn delete_times_out() {
        let connector = InMemoryConnector::with_config(
            InMemoryStoreConfig::new().with_latency(Duration::from_millis(200)),
        );
        let handle = StoreHandle::builder()
            .deadlines(Deadlines::default().with_delete(Duration::from_millis(20)))
            .connect(&connector, "memory://local", "app")
            .await
            .unwrap();
        let err = delete_one((&handle, "users"), &Filter::all()).await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::DeleteError);
        assert!(err.is_timeout());
        handle.disconnect().await.unwrap();
    }
}
