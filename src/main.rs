//! Letter Rush Back binary entrypoint wiring REST, WebSocket, SSE, and the room store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use letter_rush_back::{
    config::{AppConfig, StoreBackend},
    dao::room_store::MemoryRoomStore,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    start_room_store(app_state.clone(), StoreBackend::from_env()).await;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the selected room store. Remote backends are supervised in the background
/// and the server stays in degraded mode until they connect.
async fn start_room_store(state: SharedState, backend: StoreBackend) {
    match backend {
        StoreBackend::Memory => {
            info!("using in-memory room store");
            state
                .install_room_store(Arc::new(MemoryRoomStore::new()))
                .await;
        }
        #[cfg(feature = "mongo-store")]
        StoreBackend::Mongo => {
            use letter_rush_back::{
                dao::{
                    room_store::{
                        RoomStore,
                        mongodb::{MongoConfig, MongoRoomStore},
                    },
                    storage::StorageError,
                },
                services::storage_supervisor,
            };

            info!("using MongoDB room store");
            tokio::spawn(storage_supervisor::run(state, || async {
                let config = MongoConfig::from_env().await.map_err(StorageError::from)?;
                let store = MongoRoomStore::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok(Arc::new(store) as Arc<dyn RoomStore>)
            }));
        }
        #[cfg(feature = "couch-store")]
        StoreBackend::Couch => {
            use letter_rush_back::{
                dao::{
                    room_store::{
                        RoomStore,
                        couchdb::{CouchConfig, CouchRoomStore},
                    },
                    storage::StorageError,
                },
                services::storage_supervisor,
            };

            info!("using CouchDB room store");
            tokio::spawn(storage_supervisor::run(state, || async {
                let config = CouchConfig::from_env().map_err(StorageError::from)?;
                let store = CouchRoomStore::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok(Arc::new(store) as Arc<dyn RoomStore>)
            }));
        }
        #[allow(unreachable_patterns)]
        other => {
            warn!(backend = ?other, "room store backend not compiled in; using in-memory store");
            state
                .install_room_store(Arc::new(MemoryRoomStore::new()))
                .await;
        }
    }
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
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
