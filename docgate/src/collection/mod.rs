//! Documents, identifiers and filters.
//!
//! A [Document] is an insertion-ordered map from field names to
//! [`Value`](crate::common::Value)s. Documents nest: a value may itself be a
//! document or an array.
//!
//! ```rust,ignore
//! use docgate::collection::{Document, Filter};
//! use docgate::doc;
//!
//! let mut doc = Document::new();
//! doc.put("name", "Alice")?;
//! doc.put("address.city", "New York")?;
//!
//! let filter = Filter::new(doc! { name: "Alice" });
//! ```
//!
//! # Document IDs
//!
//! The `_id` field holds the [DocumentId] the store assigned on insertion.

mod document;
mod document_id;
mod filter;
pub(crate) mod id_generator;

pub use document::*;
pub use document_id::DocumentId;
pub use filter::Filter;
