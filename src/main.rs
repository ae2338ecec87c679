//! match-sync binary entrypoint wiring the WebSocket hub, REST ingress and the match store.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use match_sync::{
    auth::JwtIdentityVerifier,
    config::AppConfig,
    dao::{
        match_store::{MatchStore, StoreSlot, memory::InMemoryMatchStore},
        storage::StorageError,
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let Some(secret) = config.jwt_secret().map(str::to_owned) else {
        bail!("MATCH_SYNC_JWT_SECRET (or JWT_SECRET) must be set");
    };
    if config.ingress_token().is_none() {
        info!("MATCH_SYNC_INGRESS_TOKEN unset; ingress routes will refuse every request");
    }
    let port = config.port();

    let slot = StoreSlot::default();
    let identity = Arc::new(JwtIdentityVerifier::new(secret.as_bytes(), slot.clone()));
    let app_state = AppState::new(config, identity, slot);

    spawn_storage(app_state.clone())?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start the storage supervisor for the configured backend.
fn spawn_storage(state: SharedState) -> anyhow::Result<()> {
    #[cfg(feature = "mongo-store")]
    {
        if let Some(uri) = state.config().mongo_uri().map(str::to_owned) {
            use match_sync::dao::match_store::mongodb::{MongoConfig, MongoMatchStore};

            let db_name = state.config().mongo_db().map(str::to_owned);
            info!(db = db_name.as_deref().unwrap_or("match_sync"), "using MongoDB match store");
            tokio::spawn(storage_supervisor::run(state, move || {
                let uri = uri.clone();
                let db_name = db_name.clone();
                async move {
                    let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
                    let store: Arc<dyn MatchStore> = Arc::new(MongoMatchStore::connect(config).await?);
                    Ok::<_, StorageError>(store)
                }
            }));
            return Ok(());
        }
    }

    let store = match state.config().seed_path() {
        Some(path) => {
            info!(path = %path.display(), "seeding in-memory match store");
            InMemoryMatchStore::from_seed_file(path).context("loading seed fixture")?
        }
        None => {
            info!("using empty in-memory match store");
            InMemoryMatchStore::new()
        }
    };
    tokio::spawn(storage_supervisor::run(state, move || {
        let store: Arc<dyn MatchStore> = Arc::new(store.clone());
        async move { Ok::<_, StorageError>(store) }
    }));
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
