//! Store capability traits and the in-memory store.
//!
//! docgate never talks to a database directly. A [StoreConnector] produces a
//! [StoreProvider] bound to one database, and every facade operation is a
//! single call on that provider. Adapters for real databases live in their
//! own crates.

mod cursor;
pub mod memory;
mod store_provider;

pub use cursor::*;
pub use store_provider::*;
