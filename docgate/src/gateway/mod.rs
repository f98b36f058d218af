//! Write, read and delete operations.
//!
//! Each operation is one call on the [StoreProvider](crate::store::StoreProvider)
//! behind a [CollectionTarget], bounded by the matching deadline from
//! [Deadlines](crate::config::Deadlines). Failures are wrapped into the facade
//! error kinds (`WriteError`, `ReadError`, `NotFound`, `DeleteError`) with the
//! store's error as cause and the operation, collection and filter attached as
//! context. Operations never retry.

mod deadline;
mod delete;
mod read;
mod target;
mod write;

pub use deadline::*;
pub use delete::*;
pub use read::*;
pub use target::CollectionTarget;
pub use write::*;

pub(crate) use target::check_collection_name;

pub const INSERT_ONE: &str = "insert_one";
pub const INSERT_MANY: &str = "insert_many";
pub const FIND_ONE: &str = "find_one";
pub const FIND_MANY: &str = "find_many";
pub const FIND_ALL: &str = "find_all";
pub const DELETE_ONE: &str = "delete_one";
pub const DELETE_MANY: &str = "delete_many";

#[cfg(test)]
pub(crate) mod test_support {
    use super::CollectionTarget;
    use crate::collection::{Document, DocumentId, Filter};
    use crate::config::Deadlines;
    use crate::errors::{ErrorKind, GatewayError, GatewayResult};
    use crate::store::{
        DeleteOptions, DocumentCursor, InsertManyOptions, InsertManyResult, StoreProvider,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Addresses the `users` collection of an arbitrary provider.
    pub(crate) struct FixedTarget {
        provider: Arc<dyn StoreProvider>,
        deadlines: Deadlines,
    }

    impl FixedTarget {
        pub(crate) fn new(provider: Arc<dyn StoreProvider>) -> Self {
            FixedTarget {
                provider,
                deadlines: Deadlines::default(),
            }
        }

        pub(crate) fn with_deadlines(mut self, deadlines: Deadlines) -> Self {
            self.deadlines = deadlines;
            self
        }
    }

    impl CollectionTarget for &FixedTarget {
        fn provider(&self) -> &Arc<dyn StoreProvider> {
            &self.provider
        }

        fn collection_name(&self) -> &str {
            "users"
        }

        fn deadlines(&self) -> &Deadlines {
            &self.deadlines
        }
    }

    /// A store whose every call fails with a transport error.
    pub(crate) struct UnreachableStore;

    fn unreachable() -> GatewayError {
        GatewayError::new("connection reset by peer", ErrorKind::TransportError)
    }

    #[async_trait]
    impl StoreProvider for UnreachableStore {
        fn database_name(&self) -> &str {
            "unreachable"
        }

        async fn ping(&self) -> GatewayResult<()> {
            Err(unreachable())
        }

        async fn insert_one(&self, _: &str, _: Document) -> GatewayResult<DocumentId> {
            Err(unreachable())
        }

        async fn insert_many(
            &self,
            _: &str,
            _: Vec<Document>,
            _: &InsertManyOptions,
        ) -> GatewayResult<InsertManyResult> {
            Err(unreachable())
        }

        async fn find_one(&self, _: &str, _: &Filter) -> GatewayResult<Option<Document>> {
            Err(unreachable())
        }

        async fn find(&self, _: &str, _: &Filter) -> GatewayResult<DocumentCursor> {
            Err(unreachable())
        }

        async fn delete_one(&self, _: &str, _: &Filter, _: &DeleteOptions) -> GatewayResult<u64> {
            Err(unreachable())
        }

        async fn delete_many(&self, _: &str, _: &Filter, _: &DeleteOptions) -> GatewayResult<u64> {
            Err(unreachable())
        }

        async fn shutdown(&self) -> GatewayResult<()> {
            Ok(())
        }
    }
}
