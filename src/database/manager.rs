use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::database::memory::MemoryStore;
use crate::database::postgres::PgStore;
use crate::database::repository::{PropertyRepository, UserRepository};

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// The repositories the handlers run against.
#[derive(Clone)]
pub struct DatabaseManager {
    pub properties: Arc<dyn PropertyRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl DatabaseManager {
    /// Open the configured backend. Postgres tables are created if missing.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        match config.backend {
            StoreBackend::Postgres => {
                let store = Arc::new(PgStore::connect(config).await?);
                store.bootstrap().await?;
                info!("Using Postgres property store");
                Ok(Self {
                    properties: store.clone(),
                    users: store,
                })
            }
            StoreBackend::Memory => {
                info!("Using in-memory property store; data is lost on shutdown");
                Ok(Self::memory(Arc::new(MemoryStore::new())))
            }
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            properties: store.clone(),
            users: store,
        }
    }
}
