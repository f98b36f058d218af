//! # docgate - Deadline-scoped document store gateway
//!
//! docgate is a thin data-access facade over a document store. It connects,
//! probes liveness, inserts, finds and deletes documents, and nothing more.
//! Each operation is a single call on the store, bounded by a fixed deadline,
//! and every failure comes back as a [`GatewayError`](errors::GatewayError)
//! naming the operation, the collection and (for reads and deletes) the
//! filter involved.
//!
//! ## Key Features
//!
//! - **Deadlines**: every store call is bounded; see [`config::Deadlines`]
//! - **Normalized errors**: `ConnectionError`, `WriteError`, `ReadError`,
//!   `NotFound` and `DeleteError`, each carrying the underlying cause
//! - **Pluggable stores**: the in-memory store ships with this crate, MongoDB
//!   lives in `docgate-mongodb-adapter`
//! - **Explicit handles**: no global connection; a [`StoreHandle`] is passed to
//!   each operation and released with [`disconnect`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docgate::collection::Filter;
//! use docgate::store::memory::InMemoryConnector;
//! use docgate::{connect, disconnect, doc, gateway};
//!
//! # async fn run() -> docgate::errors::GatewayResult<()> {
//! let connector = InMemoryConnector::new();
//! let handle = connect(&connector, "memory://local", "app").await?;
//! let users = handle.collection("users");
//!
//! let id = gateway::insert_one(&users, doc! { name: "john" }).await?;
//! let john = gateway::find_one(&users, &Filter::by_id(&id)).await?;
//! let removed = gateway::delete_many(&users, &Filter::eq("name", "JOHN")).await?;
//!
//! disconnect(handle).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`collection`] - Documents, identifiers and filters
//! - [`common`] - Values, collation and constants
//! - [`config`] - Per-operation deadlines
//! - [`connection`] - Store handles: connect, ping, disconnect
//! - [`errors`] - Error types and result definitions
//! - [`gateway`] - Write, read and delete operations
//! - [`store`] - Store capability traits and the in-memory store

use crate::collection::id_generator::ObjectIdGenerator;
use std::sync::LazyLock;

pub mod collection;
pub mod common;
pub mod config;
pub mod connection;
pub mod errors;
pub mod gateway;
pub mod store;

pub use connection::{connect, disconnect, ping, CollectionRef, HandleBuilder, StoreHandle};

pub(crate) static ID_GENERATOR: LazyLock<ObjectIdGenerator> = LazyLock::new(ObjectIdGenerator::new);
