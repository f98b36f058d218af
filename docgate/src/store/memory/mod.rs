mod config;
mod connector;
mod matcher;
mod store;

pub use config::*;
pub use connector::*;
pub(crate) use matcher::Matcher;
pub use store::InMemoryStore;
