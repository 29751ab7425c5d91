//! PBX Backend Server
//!
//! Loads configuration from the environment, builds the catalog and the
//! request registry, and serves game clients over WebSocket.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pbx_backend::catalog::{DirectoryReleases, JsonDefinitions, LogNotifier};
use pbx_backend::core::SystemClock;
use pbx_backend::request::handlers::{NoCountry, WordListFilter};
use pbx_backend::{
    BackendServer, BackendSettings, Catalog, CatalogCell, CatalogRefresher, CatalogSources, HandlerContext,
    MemoryStore, RequestManager, ServerConfig, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    let config = ServerConfig::from_env();
    let settings = BackendSettings::from_env();
    info!("PBX Backend v{}", VERSION);

    if settings.db_secret.is_none() {
        warn!("PBX_DB_SECRET not set; datastore credential unavailable");
    }
    let store = Arc::new(MemoryStore::new());

    let names = match &settings.badwords_path {
        Some(path) => WordListFilter::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => {
            warn!("PBX_BADWORDS_PATH not set; player names are only length-checked");
            WordListFilter::default()
        }
    };

    let cell = Arc::new(CatalogCell::new(Catalog::empty()));
    let sources = CatalogSources {
        definitions: Box::new(JsonDefinitions::new(settings.catalog_path.clone())),
        releases: Box::new(DirectoryReleases::new(settings.releases_dir.clone())),
        notifier: Box::new(LogNotifier),
    };
    let refresher = Arc::new(CatalogRefresher::new(cell.clone(), sources, store.clone()));
    let report = refresher.refresh().context("initial catalog refresh failed")?;
    info!(
        "Catalog loaded: {} new builds, {} achievements",
        report.new_versions.len(),
        report.achievements
    );

    let ctx = Arc::new(HandlerContext::new(store, cell, Arc::new(SystemClock), settings));
    let manager = Arc::new(RequestManager::standard(ctx, Arc::new(names), Arc::new(NoCountry)));
    info!("Serving request types: {}", manager.handler_ids().collect::<Vec<_>>().join(", "));

    let server = Arc::new(BackendServer::new(config, manager).with_refresher(refresher));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_server.shutdown();
        }
    });

    server.run().await.context("server failed")?;
    info!("Server stopped");
    Ok(())
}
