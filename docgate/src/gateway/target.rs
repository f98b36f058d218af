use crate::config::Deadlines;
use crate::connection::{CollectionRef, StoreHandle};
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use crate::store::StoreProvider;
use std::sync::Arc;

/// Anything a gateway operation can address: a store, a collection name and
/// the deadlines to apply.
///
/// Implemented for `&CollectionRef` and for a `(&StoreHandle, &str)` pair, so
/// both of these work:
///
/// ```rust,ignore
/// gateway::insert_one(&users, doc! { name: "john" }).await?;
/// gateway::insert_one((&handle, "users"), doc! { name: "john" }).await?;
/// ```
pub trait CollectionTarget {
    fn provider(&self) -> &Arc<dyn StoreProvider>;

    fn collection_name(&self) -> &str;

    fn deadlines(&self) -> &Deadlines;
}

impl CollectionTarget for &CollectionRef {
    fn provider(&self) -> &Arc<dyn StoreProvider> {
        CollectionRef::provider(self)
    }

    fn collection_name(&self) -> &str {
        self.name()
    }

    fn deadlines(&self) -> &Deadlines {
        CollectionRef::deadlines(self)
    }
}

impl CollectionTarget for (&StoreHandle, &str) {
    fn provider(&self) -> &Arc<dyn StoreProvider> {
        self.0.provider()
    }

    fn collection_name(&self) -> &str {
        self.1
    }

    fn deadlines(&self) -> &Deadlines {
        self.0.deadlines()
    }
}

pub(crate) fn check_collection_name(name: &str) -> GatewayResult<()> {
    if name.is_empty() {
        return Err(GatewayError::new(
            "collection name cannot be empty",
            ErrorKind::InvalidOperation,
        ));
    }
    Ok(())
}
