use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Rooms with at least one live event subscriber.
    pub streaming_rooms: usize,
    /// Registered player WebSocket sessions.
    pub player_sessions: usize,
}

impl HealthResponse {
    /// Build the response from the degraded flag and connection counters.
    pub fn new(degraded: bool, streaming_rooms: usize, player_sessions: usize) -> Self {
        let status = if degraded { "degraded" } else { "ok" };
        Self {
            status: status.to_string(),
            streaming_rooms,
            player_sessions,
        }
    }
}
