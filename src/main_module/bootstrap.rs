//! Startup: logging, store selection and the first Owner account.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::accounts::AccountsService;
use crate::core::config::AppConfig;
use crate::core::shared::state::AppState;
use crate::core::store::{CrmStore, MemoryStore};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        eprintln!("Logging was already initialized");
    }
}

/// PostgreSQL when `database.url` is set (migrations applied first),
/// otherwise the in-memory store.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn CrmStore>> {
    match config.database.url.clone() {
        #[cfg(feature = "postgres")]
        Some(url) => {
            use crate::core::store::postgres::{create_pool, run_migrations};
            use crate::core::store::PgStore;

            let pool_size = config.database.pool_size;
            let pool = tokio::task::spawn_blocking(move || {
                let pool = create_pool(&url, pool_size)?;
                run_migrations(&pool)?;
                Ok::<_, anyhow::Error>(pool)
            })
            .await??;
            info!("Connected to PostgreSQL (pool size {pool_size})");
            Ok(Arc::new(PgStore::new(pool)))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            warn!("database.url is set but the postgres feature is disabled; using the in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        None => {
            warn!("No database.url configured, running on the in-memory store (data is lost on exit)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub async fn bootstrap_owner(state: &AppState) -> Result<()> {
    let Some(owner) = state.config.bootstrap_owner.as_ref() else {
        return Ok(());
    };
    let service = AccountsService::new(state);
    match service.bootstrap_owner(&owner.email, &owner.password).await? {
        Some(account) => info!("Created bootstrap owner {}", account.email),
        None => info!("An Owner already exists, skipping bootstrap"),
    }
    Ok(())
}
