//! Common types shared by documents, stores and gateways.

mod collation;
mod constants;
mod value;

pub use collation::*;
pub use constants::*;
pub use value::*;
