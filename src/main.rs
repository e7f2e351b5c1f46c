use std::sync::Arc;

use dotenvy::dotenv;
use evergreen::api::{create_router, App};
use evergreen::config::Config;
use evergreen::error::{ApplicationError, BindAddressSnafu, CreateStorageSnafu, WebServerSnafu};
use evergreen::logger;
use evergreen::seed::Seed;
use evergreen::service::catalog::Catalog;
use evergreen::service::object_store::LocalObjectStore;
use evergreen::service::session::SessionManager;
use evergreen::time::MonotonicClock;
use snafu::ResultExt as _;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let _guard = logger::init(&config)?;

    let seed = match &config.seed_file {
        Some(path) => Seed::load(path).await?,
        None => Seed::default(),
    };
    tracing::info!(users = seed.users.len(), webinars = seed.webinars.len(), "loaded seed");
    let (webinars, users) = seed.into_stores()?;

    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .context(CreateStorageSnafu {
            path: config.storage_dir.clone(),
        })?;
    let objects = LocalObjectStore::new(config.storage_dir.clone(), config.public_url()?);

    let catalog = Catalog::new(webinars, users, objects, Arc::new(MonotonicClock::new()));
    let sessions = SessionManager::new(catalog, config.session_settings());

    let app = create_router(App::new(sessions.clone()))
        .nest_service("/media", ServeDir::new(&config.storage_dir));

    let listener = TcpListener::bind(config.host)
        .await
        .context(BindAddressSnafu { address: config.host })?;
    tracing::info!(address = %config.host, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(WebServerSnafu)?;

    sessions.stop_all().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "could not listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
