use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{
    error::AppError,
    services::websocket_service,
    state::{SharedState, room::RoomPin},
};

/// Upgrade the HTTP connection into a player WebSocket session.
#[utoipa::path(
    get,
    path = "/rooms/{pin}/ws",
    tag = "players",
    params(("pin" = u32, Path, description = "Room PIN")),
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
pub async fn ws_handler(
    State(state): State<SharedState>,
    Path(pin): Path<u32>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let pin = RoomPin::try_from(pin)?;
    Ok(ws.on_upgrade(move |socket| websocket_service::handle_socket(state, pin, socket)))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/rooms/{pin}/ws", get(ws_handler))
}
