mod hub;
pub mod room;
pub mod round_machine;
pub mod scoring;
mod sessions;
pub mod transitions;

use std::{future::Future, sync::Arc};

use tokio::sync::{RwLock, watch};
use tokio::time::timeout;

use crate::{config::AppConfig, dao::room_store::RoomStore, error::ServiceError};

pub use self::hub::{RevisionFilter, RoomHub};
pub use self::sessions::{SessionHandle, SessionRegistry};

/// State handle shared by every handler and background task.
pub type SharedState = Arc<AppState>;

/// Central application state storing live connections and the room store handle.
pub struct AppState {
    room_store: RwLock<Option<Arc<dyn RoomStore>>>,
    hub: RoomHub,
    sessions: SessionRegistry,
    config: Arc<AppConfig>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a room store is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            room_store: RwLock::new(None),
            hub: RoomHub::new(config.broadcast_capacity()),
            sessions: SessionRegistry::new(),
            config: Arc::new(config),
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current room store, if one is installed.
    pub async fn room_store(&self) -> Option<Arc<dyn RoomStore>> {
        let guard = self.room_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current room store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_room_store(&self) -> Result<Arc<dyn RoomStore>, ServiceError> {
        self.room_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new room store implementation and leave degraded mode.
    pub async fn install_room_store(&self, store: Arc<dyn RoomStore>) {
        {
            let mut guard = self.room_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current room store and enter degraded mode.
    pub async fn clear_room_store(&self) {
        {
            let mut guard = self.room_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.room_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Per-room broadcast channels.
    pub fn hub(&self) -> &RoomHub {
        &self.hub
    }

    /// Registry of player WebSocket sessions.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run a store call bounded by the configured store timeout.
    pub async fn with_store_timeout<F, T>(&self, work: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        timeout(self.config.store_timeout(), work)
            .await
            .map_err(|_| ServiceError::Timeout)?
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
