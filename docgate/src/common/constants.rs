use std::time::Duration;

/// Reserved field holding a document's identifier.
pub const DOC_ID: &str = "_id";

/// Separator for embedded field paths such as `address.city`.
pub const FIELD_SEPARATOR: &str = ".";

/// Prefix of query operators (`$gt`, `$in`, ...).
pub const OPERATOR_PREFIX: &str = "$";

pub const DEFAULT_CONNECT_DEADLINE: Duration = Duration::from_secs(10);
pub const DEFAULT_PING_DEADLINE: Duration = Duration::from_secs(2);
pub const DEFAULT_INSERT_ONE_DEADLINE: Duration = Duration::from_secs(5);
pub const DEFAULT_INSERT_MANY_DEADLINE: Duration = Duration::from_secs(20);
pub const DEFAULT_FIND_ONE_DEADLINE: Duration = Duration::from_secs(5);
pub const DEFAULT_FIND_DEADLINE: Duration = Duration::from_secs(30);
pub const DEFAULT_DELETE_DEADLINE: Duration = Duration::from_secs(2);

/// Locale used for case-insensitive delete matching.
pub const DEFAULT_COLLATION_LOCALE: &str = "en_US";

/// Number of documents the in-memory store hands out per cursor batch.
pub const DEFAULT_BATCH_SIZE: usize = 101;
