use crate::collection::Document;
use crate::errors::GatewayResult;
use async_trait::async_trait;
use std::collections::VecDeque;

/// Source of cursor batches, implemented by each store.
///
/// A store hands results back in batches (a server-side cursor page, or a
/// slice of an in-memory snapshot). Each document in a batch is already
/// decoded; a decode failure surfaces as an `Err` from `next_batch`.
#[async_trait]
pub trait CursorProvider: Send {
    /// Fetches the next batch, or `None` once the cursor is exhausted.
    async fn next_batch(&mut self) -> GatewayResult<Option<Vec<Document>>>;

    /// Releases server-side resources held by the cursor.
    async fn close(&mut self) -> GatewayResult<()> {
        Ok(())
    }
}

/// Iterates a store result set one document at a time across batches.
///
/// Documents come out in the order the store reported them, with no
/// client-side sorting.
pub struct DocumentCursor {
    provider: Box<dyn CursorProvider>,
    buffer: VecDeque<Document>,
    exhausted: bool,
    batches_fetched: usize,
}

impl DocumentCursor {
    pub fn new<P: CursorProvider + 'static>(provider: P) -> Self {
        DocumentCursor {
            provider: Box::new(provider),
            buffer: VecDeque::new(),
            exhausted: false,
            batches_fetched: 0,
        }
    }

    /// A cursor over pre-computed batches.
    pub fn from_batches(batches: Vec<Vec<Document>>) -> Self {
        DocumentCursor::new(BatchCursor::new(batches))
    }

    /// Returns the next document, fetching a new batch when the current one
    /// is used up.
    pub async fn try_next(&mut self) -> GatewayResult<Option<Document>> {
        loop {
            if let Some(document) = self.buffer.pop_front() {
                return Ok(Some(document));
            }
            if self.exhausted {
                return Ok(None);
            }

            match self.provider.next_batch().await? {
                Some(batch) => {
                    self.batches_fetched += 1;
                    self.buffer.extend(batch);
                }
                None => self.exhausted = true,
            }
        }
    }

    /// Drains the cursor into a vector.
    ///
    /// If iteration fails part way, the documents decoded so far are dropped
    /// and only the error is returned.
    pub async fn collect_all(mut self) -> GatewayResult<Vec<Document>> {
        let mut documents = Vec::new();
        loop {
            match self.try_next().await {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => break,
                Err(err) => {
                    if let Err(close_err) = self.provider.close().await {
                        log::warn!("Failed to close cursor after error: {}", close_err);
                    }
                    return Err(err);
                }
            }
        }
        self.provider.close().await?;
        Ok(documents)
    }

    /// Number of batches fetched from the store so far.
    pub fn batches_fetched(&self) -> usize {
        self.batches_fetched
    }

    pub async fn close(mut self) -> GatewayResult<()> {
        self.provider.close().await
    }
}

/// A [CursorProvider] over batches already held in memory.
pub struct BatchCursor {
    batches: VecDeque<Vec<Document>>,
}

impl BatchCursor {
    pub fn new(batches: Vec<Vec<Document>>) -> Self {
        BatchCursor {
            batches: batches.into(),
        }
    }
}

#[async_trait]
impl CursorProvider for BatchCursor {
    async fn next_batch(&mut self) -> GatewayResult<Option<Vec<Document>>> {
        Ok(self.batches.pop_front())
    }
}
