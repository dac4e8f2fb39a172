use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service,
    state::{SharedState, room::RoomPin},
};

/// Stream the events of one room.
#[utoipa::path(
    get,
    path = "/rooms/{pin}/events",
    tag = "sse",
    params(("pin" = u32, Path, description = "Room PIN")),
    responses(
        (status = 200, description = "Room event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn room_stream(
    State(state): State<SharedState>,
    Path(pin): Path<u32>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let pin = RoomPin::try_from(pin)?;
    let subscription = sse_service::subscribe_room(&state, pin).await?;
    info!(pin = %pin, "new room SSE connection");
    Ok(sse_service::to_sse_stream(state, subscription))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/rooms/{pin}/events", get(room_stream))
}
