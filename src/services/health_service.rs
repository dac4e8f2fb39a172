use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report store connectivity and live connection counters.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_room_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "room store health check failed");
            }
        }
        Err(_) => warn!("room store unavailable (degraded mode)"),
    }

    HealthResponse::new(
        state.is_degraded().await,
        state.hub().active_rooms(),
        state.sessions().len(),
    )
}
