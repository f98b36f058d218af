use crate::convert::from_bson_document;
use crate::wrapper::to_gateway_error;
use async_trait::async_trait;
use docgate::collection::Document;
use docgate::errors::GatewayResult;
use docgate::store::CursorProvider;
use mongodb::bson::Document as BsonDocument;
use mongodb::Cursor;

/// Reads a driver cursor in batches of `batch_size` decoded documents.
pub(crate) struct MongoCursor {
    cursor: Cursor<BsonDocument>,
    batch_size: usize,
}

impl MongoCursor {
    pub(crate) fn new(cursor: Cursor<BsonDocument>, batch_size: usize) -> Self {
        MongoCursor {
            cursor,
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl CursorProvider for MongoCursor {
    async fn next_batch(&mut self) -> GatewayResult<Option<Vec<Document>>> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            if !self.cursor.advance().await.map_err(to_gateway_error)? {
                break;
            }
            let record = self.cursor.deserialize_current().map_err(to_gateway_error)?;
            batch.push(from_bson_document(record)?);
        }

        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}
