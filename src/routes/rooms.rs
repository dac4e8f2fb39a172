use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::room::{
        AckResponse, CategoriesResponse, CreateRoomRequest, JoinRoomRequest, ResultsResponse,
        RoomListItem, RoomPinResponse, RoomView, RoomViewQuery, RoundAnswersEntry,
        RoundStatusResponse, StartGameRequest, SubmitAnswersRequest, SubmitPointsRequest,
        SubmitPointsResponse,
    },
    error::AppError,
    services::{membership_service, round_service},
    state::{SharedState, room::RoomPin},
};

/// Room lifecycle and round endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room).get(list_rooms))
        .route("/rooms/{pin}", get(get_room))
        .route("/rooms/{pin}/players", post(join_room))
        .route("/rooms/{pin}/start", post(start_game))
        .route(
            "/rooms/{pin}/rounds/{round}/answers",
            post(submit_answers).get(get_round_answers),
        )
        .route("/rooms/{pin}/rounds/{round}/status", get(round_status))
        .route("/rooms/{pin}/rounds/{round}/points", post(submit_points))
        .route("/rooms/{pin}/results", get(get_results))
        .route("/categories", get(list_categories))
}

/// Open a room; the creator becomes its owner.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomPinResponse),
        (status = 400, description = "Invalid room definition"),
        (status = 409, description = "PIN already in use")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<RoomPinResponse>, AppError> {
    let response = membership_service::create_room(&state, payload).await?;
    Ok(Json(response))
}

/// List every stored room.
#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    responses((status = 200, description = "Stored rooms", body = [RoomListItem]))
)]
pub async fn list_rooms(State(state): State<SharedState>) -> Result<Json<Vec<RoomListItem>>, AppError> {
    let rooms = membership_service::list_rooms(&state).await?;
    Ok(Json(rooms))
}

/// Room state, for one player when `nickname` is given.
#[utoipa::path(
    get,
    path = "/rooms/{pin}",
    tag = "rooms",
    params(("pin" = u32, Path, description = "Room PIN"), RoomViewQuery),
    responses(
        (status = 200, description = "Room state", body = RoomView),
        (status = 404, description = "Unknown room or player")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(pin): Path<u32>,
    Query(query): Query<RoomViewQuery>,
) -> Result<Json<RoomView>, AppError> {
    let pin = RoomPin::try_from(pin)?;
    let view = membership_service::get_room_view(&state, pin, query.nickname.as_deref()).await?;
    Ok(Json(view))
}

/// Enter a room that has not started yet.
#[utoipa::path(
    post,
    path = "/rooms/{pin}/players",
    tag = "rooms",
    params(("pin" = u32, Path, description = "Room PIN")),
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Player joined", body = AckResponse),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "Nickname taken or game already progressed")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Path(pin): Path<u32>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<AckResponse>, AppError> {
    let pin = RoomPin::try_from(pin)?;
    let ack = membership_service::join_room(&state, pin, payload).await?;
    Ok(Json(ack))
}

/// Broadcast the game start signal to the room.
#[utoipa::path(
    post,
    path = "/rooms/{pin}/start",
    tag = "rooms",
    params(("pin" = u32, Path, description = "Room PIN")),
    request_body(content = StartGameRequest, description = "Optional sender of the signal"),
    responses(
        (status = 200, description = "Start signal broadcast", body = AckResponse),
        (status = 401, description = "Sender may not start the game")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(pin): Path<u32>,
    payload: Option<Json<StartGameRequest>>,
) -> Result<Json<AckResponse>, AppError> {
    let pin = RoomPin::try_from(pin)?;
    let Json(payload) = payload.unwrap_or_default();
    let ack = membership_service::start_game(&state, pin, payload.nickname.as_deref()).await?;
    Ok(Json(ack))
}

/// Submit one player's sheet for a round.
#[utoipa::path(
    post,
    path = "/rooms/{pin}/rounds/{round}/answers",
    tag = "rounds",
    params(
        ("pin" = u32, Path, description = "Room PIN"),
        ("round" = u8, Path, description = "Round number, 1 to 5")
    ),
    request_body = SubmitAnswersRequest,
    responses(
        (status = 200, description = "Answers recorded", body = AckResponse),
        (status = 409, description = "Stale or duplicate submission")
    )
)]
pub async fn submit_answers(
    State(state): State<SharedState>,
    Path((pin, round)): Path<(u32, u8)>,
    Valid(Json(payload)): Valid<Json<SubmitAnswersRequest>>,
) -> Result<Json<AckResponse>, AppError> {
    let pin = RoomPin::try_from(pin)?;
    let ack = round_service::submit_answers(&state, pin, round, payload).await?;
    Ok(Json(ack))
}

/// Sheets submitted for a round.
#[utoipa::path(
    get,
    path = "/rooms/{pin}/rounds/{round}/answers",
    tag = "rounds",
    params(
        ("pin" = u32, Path, description = "Room PIN"),
        ("round" = u8, Path, description = "Round number, 1 to 5")
    ),
    responses((status = 200, description = "Submitted sheets", body = [RoundAnswersEntry]))
)]
pub async fn get_round_answers(
    State(state): State<SharedState>,
    Path((pin, round)): Path<(u32, u8)>,
) -> Result<Json<Vec<RoundAnswersEntry>>, AppError> {
    let pin = RoomPin::try_from(pin)?;
    let answers = round_service::get_round_answers(&state, pin, round).await?;
    Ok(Json(answers))
}

/// Whether every player of a round has answered.
#[utoipa::path(
    get,
    path = "/rooms/{pin}/rounds/{round}/status",
    tag = "rounds",
    params(
        ("pin" = u32, Path, description = "Room PIN"),
        ("round" = u8, Path, description = "Round number, 1 to 5")
    ),
    responses((status = 200, description = "Submission progress", body = RoundStatusResponse))
)]
pub async fn round_status(
    State(state): State<SharedState>,
    Path((pin, round)): Path<(u32, u8)>,
) -> Result<Json<RoundStatusResponse>, AppError> {
    let pin = RoomPin::try_from(pin)?;
    let status = round_service::round_status(&state, pin, round).await?;
    Ok(Json(status))
}

/// Submit the points of a round, or one ballot under peer scoring.
#[utoipa::path(
    post,
    path = "/rooms/{pin}/rounds/{round}/points",
    tag = "rounds",
    params(
        ("pin" = u32, Path, description = "Room PIN"),
        ("round" = u8, Path, description = "Round number, 1 to 5")
    ),
    request_body = SubmitPointsRequest,
    responses(
        (status = 200, description = "Points or ballot recorded", body = SubmitPointsResponse),
        (status = 400, description = "Invalid points table"),
        (status = 409, description = "Round already scored, out of order or still open")
    )
)]
pub async fn submit_points(
    State(state): State<SharedState>,
    Path((pin, round)): Path<(u32, u8)>,
    Json(payload): Json<SubmitPointsRequest>,
) -> Result<Json<SubmitPointsResponse>, AppError> {
    let pin = RoomPin::try_from(pin)?;
    let response = round_service::submit_points(&state, pin, round, payload).await?;
    Ok(Json(response))
}

/// Standings and every scored round.
#[utoipa::path(
    get,
    path = "/rooms/{pin}/results",
    tag = "rounds",
    params(("pin" = u32, Path, description = "Room PIN")),
    responses((status = 200, description = "Standings and scored rounds", body = ResultsResponse))
)]
pub async fn get_results(
    State(state): State<SharedState>,
    Path(pin): Path<u32>,
) -> Result<Json<ResultsResponse>, AppError> {
    let pin = RoomPin::try_from(pin)?;
    let results = round_service::get_results(&state, pin).await?;
    Ok(Json(results))
}

/// Categories offered when creating a room.
#[utoipa::path(
    get,
    path = "/categories",
    tag = "rooms",
    responses((status = 200, description = "Category catalog", body = CategoriesResponse))
)]
pub async fn list_categories(State(state): State<SharedState>) -> Json<CategoriesResponse> {
    Json(membership_service::list_categories(&state))
}
