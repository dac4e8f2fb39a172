use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{room_store::RoomStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the room store and keep the shared state degraded while it is unreachable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn RoomStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "room store connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        state.install_room_store(store.clone()).await;
        info!("room store connected; leaving degraded mode");
        delay = INITIAL_DELAY;

        while supervise(&state, &store).await {
            sleep(HEALTH_POLL_INTERVAL).await;
        }

        warn!("exhausted room store reconnect attempts; staying in degraded mode");
        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// One health poll. Returns false once the store is given up on.
async fn supervise(state: &SharedState, store: &Arc<dyn RoomStore>) -> bool {
    if store.health_check().await.is_ok() {
        if state.is_degraded().await {
            info!("room store healthy again; leaving degraded mode");
            state.install_room_store(store.clone()).await;
        }
        return true;
    }

    let mut reconnect_delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "room store reconnected after a failed health check");
                state.install_room_store(store.clone()).await;
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(attempt, error = %err, "room store reconnect failed; entering degraded mode");
                    state.clear_room_store().await;
                } else {
                    warn!(attempt, error = %err, "room store reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}
