use crate::config::{MongoConfig, MongoConnectorBuilder};
use crate::store::MongoStore;
use crate::wrapper::to_gateway_error;
use async_trait::async_trait;
use docgate::errors::GatewayResult;
use docgate::store::{StoreConnector, StoreProvider};
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::sync::Arc;

/// Connects to MongoDB deployments through the official driver.
///
/// The URI is parsed by the driver (`mongodb://` and `mongodb+srv://`,
/// credentials, `authSource` and every other option it understands). Unless
/// verification is skipped, `connect` pings the primary so an unreachable
/// deployment fails at connect time rather than on first use.
#[derive(Clone, Default)]
pub struct MongoConnector {
    config: MongoConfig,
}

impl MongoConnector {
    pub(crate) fn new(config: MongoConfig) -> MongoConnector {
        MongoConnector { config }
    }

    /// Returns a builder for a connector with custom client settings.
    pub fn with_config() -> MongoConnectorBuilder {
        MongoConnectorBuilder::new()
    }

    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Connects and returns the concrete store.
    pub async fn open(&self, uri: &str, database: &str) -> GatewayResult<MongoStore> {
        let mut options = ClientOptions::parse(uri).await.map_err(to_gateway_error)?;
        if let Some(app_name) = self.config.app_name() {
            options.app_name = Some(app_name.to_string());
        }
        if let Some(timeout) = self.config.server_selection_timeout() {
            options.server_selection_timeout = Some(timeout);
        }

        let client = Client::with_options(options).map_err(to_gateway_error)?;
        let store = MongoStore::new(client, database, self.config.clone());
        if self.config.verify_on_connect() {
            if let Err(err) = store.ping().await {
                log::error!("MongoDB database {} is not reachable: {}", database, err);
                store.shutdown().await?;
                return Err(err);
            }
        }

        log::debug!("Connected to MongoDB database {}", database);
        Ok(store)
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    async fn connect(&self, uri: &str, database: &str) -> GatewayResult<Arc<dyn StoreProvider>> {
        let store = self.open(uri, database).await?;
        Ok(Arc::new(store))
    }
}
