use std::sync::Arc;
use tracing::{error, info};

use crmserver::core::config::AppConfig;
use crmserver::core::shared::state::AppState;
use crmserver::main_module::{bootstrap_owner, init_logging, open_store, run_axum_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::load().inspect_err(|e| error!("Configuration error: {e}"))?;
    info!("Starting crmserver {}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config).await?;
    let state = Arc::new(AppState::new(config, store)?);
    bootstrap_owner(&state).await?;

    run_axum_server(state).await
}
