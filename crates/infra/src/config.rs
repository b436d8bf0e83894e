//! Store selection from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `USE_PERSISTENT_STORES` | `false` | use Postgres instead of the in-memory store |
//! | `DATABASE_URL` | (required when persistent) | Postgres connection string |
//! | `DATABASE_MAX_CONNECTIONS` | `5` | pool size |

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::repository::{InMemoryVendorRepository, PostgresVendorRepository, VendorRepository};
use crate::service::ServiceError;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Which record store backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::InMemory,
        }
    }
}

impl StoreConfig {
    /// Read the store configuration from the process environment.
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let use_persistent = match lookup("USE_PERSISTENT_STORES") {
            None => false,
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| {
                ServiceError::Config(format!(
                    "USE_PERSISTENT_STORES must be 'true' or 'false', got '{raw}'"
                ))
            })?,
        };

        if !use_persistent {
            return Ok(Self::default());
        }

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::Config(
                    "DATABASE_URL must be set when USE_PERSISTENT_STORES=true".to_string(),
                )
            })?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ServiceError::Config(format!(
                        "DATABASE_MAX_CONNECTIONS must be a positive integer, got '{raw}'"
                    )));
                }
            },
        };

        Ok(Self {
            backend: StoreBackend::Postgres {
                database_url,
                max_connections,
            },
        })
    }

    /// Open the configured store.
    ///
    /// For Postgres this connects the pool and applies the embedded schema.
    pub async fn connect(&self) -> Result<Arc<dyn VendorRepository>, ServiceError> {
        match &self.backend {
            StoreBackend::InMemory => {
                tracing::info!("using in-memory vendor store");
                Ok(Arc::new(InMemoryVendorRepository::new()))
            }
            StoreBackend::Postgres {
                database_url,
                max_connections,
            } => {
                let pool = PgPoolOptions::new()
                    .max_connections(*max_connections)
                    .connect(database_url)
                    .await
                    .map_err(|e| ServiceError::Storage(format!("failed to connect to Postgres: {e}")))?;

                let repo = PostgresVendorRepository::new(pool);
                repo.ensure_schema().await?;
                tracing::info!(max_connections, "using Postgres vendor store");
                Ok(Arc::new(repo))
            }
        }
    }
}
