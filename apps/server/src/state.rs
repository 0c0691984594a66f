//! Shared application state.

use std::sync::Arc;

use crate::{
    auth::AuthManager,
    config::{Config, StorageBackend},
    db::{InMemoryStore, PostgresStore, ScheduleStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ScheduleStore>,
    pub auth: AuthManager,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store: Arc<dyn ScheduleStore> = match config.database.backend {
            StorageBackend::Postgres => {
                Arc::new(PostgresStore::connect(&config.database).await?)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using the in-memory store; data will not survive a restart");
                Arc::new(InMemoryStore::new())
            }
        };

        let auth = AuthManager::new(config.clone())
            .map_err(|e| anyhow::anyhow!("Failed to initialize auth: {e:?}"))?;

        Ok(Self {
            config,
            store,
            auth,
        })
    }

    /// Build a state around an existing store. Used by tests.
    pub fn with_store(config: Config, store: Arc<dyn ScheduleStore>) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let auth = AuthManager::new(config.clone())
            .map_err(|e| anyhow::anyhow!("Failed to initialize auth: {e:?}"))?;
        Ok(Self {
            config,
            store,
            auth,
        })
    }
}
