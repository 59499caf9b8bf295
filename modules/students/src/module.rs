use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::api::rest::routes;
use crate::config::StudentsConfig;
use crate::contract::client::StudentsApi;
use crate::domain::repo::StudentsStore;
use crate::domain::service::Service;
use crate::gateways::local::StudentsLocalClient;
use crate::infra::storage::{SqliteStudentsStore, StoreOptions};

/// The students module: domain service wired to a store, plus its REST surface.
#[derive(Clone)]
pub struct StudentsModule {
    service: Arc<Service>,
    config: StudentsConfig,
}

impl StudentsModule {
    /// Wire the module to SQLite. `store.mode` is taken from `config.connection`.
    pub async fn init(config: StudentsConfig, mut store: StoreOptions) -> anyhow::Result<Self> {
        info!("Initializing students module");

        store.mode = config.connection;
        let store = SqliteStudentsStore::open(store).await?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    /// Wire the module to any store implementation.
    pub fn with_store(store: Arc<dyn StudentsStore>, config: StudentsConfig) -> Self {
        Self {
            service: Arc::new(Service::new(store)),
            config,
        }
    }

    pub fn config(&self) -> &StudentsConfig {
        &self.config
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// In-process client for other modules.
    pub fn client(&self) -> Arc<dyn StudentsApi> {
        Arc::new(StudentsLocalClient::new(self.service.clone()))
    }

    pub fn register_rest(&self, router: Router) -> Router {
        info!(
            legacy_routes = self.config.legacy_routes,
            "Registering students REST routes"
        );
        routes::register_routes(router, self.service.clone(), self.config.legacy_routes)
    }
}
