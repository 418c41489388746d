//! Runs the HTTP service.
//!
//! Usage:
//!   mefm [settings-file]
//!
//! The settings file defaults to `mefm` (any extension `config` understands,
//! e.g. `mefm.toml`); every value can be overridden through `MEFM__*`
//! environment variables.
use std::sync::Arc;

use mefm::maps::GoogleMapsClient;
use mefm::server::{AppState, router};
use mefm::settings::Settings;
use mefm::{Database, MefmError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "mefm".to_string());
    let settings = Settings::load(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log.filter))
        .map_err(|e| MefmError::Config(format!("invalid log filter: {e}")))?;
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    info!(settings = %path, store = %settings.store.path, "starting");
    let database = Database::new(settings.store.mode(), settings.store.kinds.as_slice())?;
    info!(kinds = ?database.registered_kinds(), "database ready");
    if settings.maps.api_key.is_none() {
        warn!("no distance matrix api key configured, distance lookups will fail");
    }

    let state = AppState {
        database: Arc::new(database),
        distances: Arc::new(GoogleMapsClient::new(&settings.maps)),
        country: Arc::from(settings.maps.country.as_str()),
    };
    let listener = tokio::net::TcpListener::bind(settings.server.bind.as_str())
        .await
        .map_err(|e| MefmError::Config(format!("cannot bind {}: {e}", settings.server.bind)))?;
    info!(bind = %settings.server.bind, "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
