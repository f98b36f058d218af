use crate::config::MongoConfig;
use crate::convert::{from_bson_document, id_from_bson, to_bson_document};
use crate::cursor::MongoCursor;
use crate::wrapper::{code_kind, to_gateway_error};
use async_trait::async_trait;
use docgate::collection::{Document, DocumentId, Filter};
use docgate::common::{Collation, CollationStrength};
use docgate::errors::{ErrorKind, GatewayError, GatewayResult};
use docgate::store::{
    DeleteOptions, DocumentCursor, InsertManyOptions, InsertManyResult, StoreProvider,
};
use mongodb::bson::{doc, Document as BsonDocument};
use mongodb::error::ErrorKind as MongoErrorKind;
use mongodb::options::{self as driver, ReadPreference, SelectionCriteria};
use mongodb::{Client, Collection, Database};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A MongoDB database exposed as a docgate store.
///
/// Cheap to clone; all clones share one driver client and its connection
/// pool.
#[derive(Clone)]
pub struct MongoStore {
    inner: Arc<MongoStoreInner>,
}

struct MongoStoreInner {
    client: Client,
    database: Database,
    name: String,
    config: MongoConfig,
    closed: AtomicBool,
}

impl MongoStore {
    pub(crate) fn new(client: Client, database: &str, config: MongoConfig) -> MongoStore {
        let handle = client.database(database);
        MongoStore {
            inner: Arc::new(MongoStoreInner {
                client,
                database: handle,
                name: database.to_string(),
                config,
                closed: AtomicBool::new(false),
            }),
        }
    }

    fn collection(&self, name: &str) -> GatewayResult<Collection<BsonDocument>> {
        if self.inner.closed.load(Ordering::Relaxed) {
            log::error!("MongoDB store {} is closed", self.inner.name);
            return Err(GatewayError::new(
                &format!("store {} is closed", self.inner.name),
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(self.inner.database.collection::<BsonDocument>(name))
    }
}

#[async_trait]
impl StoreProvider for MongoStore {
    fn database_name(&self) -> &str {
        &self.inner.name
    }

    async fn ping(&self) -> GatewayResult<()> {
        if self.inner.closed.load(Ordering::Relaxed) {
            return Err(GatewayError::new(
                &format!("store {} is closed", self.inner.name),
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        self.inner
            .database
            .run_command(doc! { "ping": 1 })
            .selection_criteria(SelectionCriteria::ReadPreference(ReadPreference::Primary))
            .await
            .map(|_| ())
            .map_err(to_gateway_error)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> GatewayResult<DocumentId> {
        let collection = self.collection(collection)?;
        let result = collection
            .insert_one(to_bson_document(&document))
            .await
            .map_err(to_gateway_error)?;
        id_from_bson(&result.inserted_id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        options: &InsertManyOptions,
    ) -> GatewayResult<InsertManyResult> {
        let collection = self.collection(collection)?;

        // ids are assigned client side so the inserted set is known even when
        // the server reports per-document failures
        let mut ids = Vec::with_capacity(documents.len());
        let mut records = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = match document.id() {
                Some(id) => id.clone(),
                None => {
                    let id = DocumentId::new();
                    document.set_id(id.clone());
                    id
                }
            };
            ids.push(id);
            records.push(to_bson_document(&document));
        }

        let mut insert_options = driver::InsertManyOptions::default();
        insert_options.ordered = Some(options.ordered);

        let mut result = InsertManyResult::new();
        match collection
            .insert_many(records)
            .with_options(insert_options)
            .await
        {
            Ok(_) => {
                for (index, id) in ids.into_iter().enumerate() {
                    result.record_inserted(index, id);
                }
                Ok(result)
            }
            Err(error) => {
                let write_errors = match error.kind.as_ref() {
                    MongoErrorKind::InsertMany(insert_error) => insert_error.write_errors.clone(),
                    _ => None,
                };
                let write_errors = match write_errors {
                    Some(write_errors) if !write_errors.is_empty() => write_errors,
                    _ => return Err(to_gateway_error(error)),
                };

                let failed: HashSet<usize> = write_errors.iter().map(|e| e.index).collect();
                // an ordered insert stops at the first failure
                let first_failure = write_errors.iter().map(|e| e.index).min().unwrap_or(0);
                for (index, id) in ids.into_iter().enumerate() {
                    let attempted = !options.ordered || index < first_failure;
                    if attempted && !failed.contains(&index) {
                        result.record_inserted(index, id);
                    }
                }
                for write_error in write_errors {
                    result.record_failure(
                        write_error.index,
                        GatewayError::new(
                            &format!("MongoDB Error: {}", write_error.message),
                            code_kind(write_error.code),
                        ),
                    );
                }
                Ok(result)
            }
        }
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> GatewayResult<Option<Document>> {
        filter.validate()?;
        let collection = self.collection(collection)?;
        let found = collection
            .find_one(to_bson_document(filter.as_document()))
            .await
            .map_err(to_gateway_error)?;
        found.map(from_bson_document).transpose()
    }

    async fn find(&self, collection: &str, filter: &Filter) -> GatewayResult<DocumentCursor> {
        filter.validate()?;
        let collection = self.collection(collection)?;
        let batch_size = self.inner.config.batch_size();

        let mut find_options = driver::FindOptions::default();
        find_options.batch_size = Some(batch_size);

        let cursor = collection
            .find(to_bson_document(filter.as_document()))
            .with_options(find_options)
            .await
            .map_err(to_gateway_error)?;
        Ok(DocumentCursor::new(MongoCursor::new(cursor, batch_size as usize)))
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &DeleteOptions,
    ) -> GatewayResult<u64> {
        filter.validate()?;
        let collection = self.collection(collection)?;
        let result = collection
            .delete_one(to_bson_document(filter.as_document()))
            .with_options(delete_options(options))
            .await
            .map_err(to_gateway_error)?;
        Ok(result.deleted_count)
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &DeleteOptions,
    ) -> GatewayResult<u64> {
        filter.validate()?;
        let collection = self.collection(collection)?;
        let result = collection
            .delete_many(to_bson_document(filter.as_document()))
            .with_options(delete_options(options))
            .await
            .map_err(to_gateway_error)?;
        Ok(result.deleted_count)
    }

    async fn shutdown(&self) -> GatewayResult<()> {
        if self.inner.closed.swap(true, Ordering::Relaxed) {
            log::debug!("MongoDB store {} already shut down", self.inner.name);
            return Ok(());
        }
        self.inner.client.clone().shutdown().await;
        log::debug!("MongoDB store {} shut down", self.inner.name);
        Ok(())
    }
}

fn delete_options(options: &DeleteOptions) -> driver::DeleteOptions {
    let mut delete_options = driver::DeleteOptions::default();
    delete_options.collation = options.collation.as_ref().map(driver_collation);
    delete_options
}

pub(crate) fn driver_collation(collation: &Collation) -> driver::Collation {
    let strength = match collation.strength() {
        CollationStrength::Primary => driver::CollationStrength::Primary,
        CollationStrength::Secondary => driver::CollationStrength::Secondary,
        CollationStrength::Tertiary => driver::CollationStrength::Tertiary,
        CollationStrength::Quaternary => driver::CollationStrength::Quaternary,
        CollationStrength::Identical => driver::CollationStrength::Identical,
    };
    driver::Collation::builder()
        .locale(collation.locale())
        .strength(strength)
        .case_level(collation.case_level())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_collation_maps_to_driver() {
        let collation = driver_collation(&Collation::case_insensitive());
        assert_eq!(collation.locale, "en_US");
        assert_eq!(collation.strength, Some(driver::CollationStrength::Primary));
        assert_eq!(collation.case_level, Some(false));
    }

    #[test]
    fn delete_options_without_collation() {
        let options = delete_options(&DeleteOptions::default());
        assert!(options.collation.is_none());
        let options = delete_options(&DeleteOptions::with_collation(Collation::case_insensitive()));
        assert!(options.collation.is_some());
    }
}
