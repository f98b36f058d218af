use super::{check_collection_name, with_deadline, CollectionTarget, INSERT_MANY, INSERT_ONE};
use crate::collection::{Document, DocumentId};
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use crate::store::{InsertManyOptions, InsertManyResult};

/// Inserts one document within the insert-one deadline (5s by default).
///
/// Returns the identifier the store assigned, or the `_id` the document
/// already carried. Any store failure (duplicate key, rejected document,
/// transport, timeout) is a `WriteError` naming the collection, with the
/// store's error as cause.
pub async fn insert_one<T: CollectionTarget>(target: T, document: Document) -> GatewayResult<DocumentId> {
    let collection = target.collection_name();
    check_collection_name(collection).map_err(|cause| write_error(INSERT_ONE, collection, cause))?;

    log::debug!("Inserting one document into {}", collection);
    let id = with_deadline(
        INSERT_ONE,
        target.deadlines().insert_one,
        target.provider().insert_one(collection, document),
    )
    .await
    .map_err(|cause| write_error(INSERT_ONE, collection, cause))?;

    log::debug!("Inserted document {} into {}", id, collection);
    Ok(id)
}

/// Inserts many documents as one unordered request within the insert-many
/// deadline (20s by default).
///
/// A document the store refuses does not stop the others: the result lists
/// every identifier assigned and every failure by input index. A
/// `WriteError` is returned only when the request as a whole fails. An empty
/// input returns an empty result without contacting the store.
pub async fn insert_many<T: CollectionTarget>(
    target: T,
    documents: Vec<Document>,
) -> GatewayResult<InsertManyResult> {
    let collection = target.collection_name();
    check_collection_name(collection).map_err(|cause| write_error(INSERT_MANY, collection, cause))?;

    if documents.is_empty() {
        log::debug!("Nothing to insert into {}", collection);
        return Ok(InsertManyResult::new());
    }

    let total = documents.len();
    log::debug!("Inserting {} documents into {}", total, collection);
    let result = with_deadline(
        INSERT_MANY,
        target.deadlines().insert_many,
        target
            .provider()
            .insert_many(collection, documents, &InsertManyOptions::unordered()),
    )
    .await
    .map_err(|cause| write_error(INSERT_MANY, collection, cause))?;

    if !result.is_complete() {
        log::warn!(
            "{} of {} documents were rejected by {}",
            result.failures().len(),
            total,
            collection
        );
    }
    Ok(result)
}

fn write_error(operation: &'static str, collection: &str, cause: GatewayError) -> GatewayError {
    log::error!("Could not create record into {} with error: {}", collection, cause);
    GatewayError::new_with_cause(
        &format!("could not create record into {} with error: {}", collection, cause),
        ErrorKind::WriteError,
        cause,
    )
    .with_operation(operation)
    .with_collection(collection)
}
