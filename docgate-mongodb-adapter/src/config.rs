use std::time::Duration;

/// Number of documents requested per cursor batch unless configured.
pub const DEFAULT_MONGO_BATCH_SIZE: u32 = 101;

/// Client settings applied on top of whatever the connection URI specifies.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    app_name: Option<String>,
    server_selection_timeout: Option<Duration>,
    batch_size: u32,
    verify_on_connect: bool,
}

impl MongoConfig {
    pub fn new() -> MongoConfig {
        MongoConfig {
            app_name: None,
            server_selection_timeout: None,
            batch_size: DEFAULT_MONGO_BATCH_SIZE,
            verify_on_connect: true,
        }
    }

    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    pub fn server_selection_timeout(&self) -> Option<Duration> {
        self.server_selection_timeout
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Whether `connect` pings the primary before handing out the store.
    pub fn verify_on_connect(&self) -> bool {
        self.verify_on_connect
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig::new()
    }
}

/// Builder for a [MongoConnector](crate::MongoConnector).
///
/// ```rust,ignore
/// let connector = MongoConnector::with_config()
///     .app_name("billing")
///     .server_selection_timeout(Duration::from_secs(3))
///     .batch_size(500)
///     .build();
/// ```
pub struct MongoConnectorBuilder {
    config: MongoConfig,
}

impl MongoConnectorBuilder {
    pub fn new() -> MongoConnectorBuilder {
        MongoConnectorBuilder {
            config: MongoConfig::new(),
        }
    }

    /// Name reported to the server in the connection handshake.
    pub fn app_name(mut self, app_name: &str) -> Self {
        self.config.app_name = Some(app_name.to_string());
        self
    }

    /// How long the driver looks for a suitable server before failing.
    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.config.server_selection_timeout = Some(timeout);
        self
    }

    /// Documents requested per cursor batch. Zero is treated as one.
    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.config.batch_size = batch_size.max(1);
        self
    }

    /// Skips the ping issued by `connect`.
    pub fn skip_verification(mut self) -> Self {
        self.config.verify_on_connect = false;
        self
    }

    pub fn build(self) -> crate::MongoConnector {
        crate::MongoConnector::new(self.config)
    }
}

impl Default for MongoConnectorBuilder {
    fn default() -> Self {
        MongoConnectorBuilder::new()
    }
}
