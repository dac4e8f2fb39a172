use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Letter Rush Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::create_room,
        crate::routes::rooms::list_rooms,
        crate::routes::rooms::get_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::start_game,
        crate::routes::rooms::submit_answers,
        crate::routes::rooms::get_round_answers,
        crate::routes::rooms::round_status,
        crate::routes::rooms::submit_points,
        crate::routes::rooms::get_results,
        crate::routes::rooms::list_categories,
        crate::routes::sse::room_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::JoinRoomRequest,
            crate::dto::room::StartGameRequest,
            crate::dto::room::SubmitAnswersRequest,
            crate::dto::room::SubmitPointsRequest,
            crate::dto::room::RoomPinResponse,
            crate::dto::room::AckResponse,
            crate::dto::room::PointsStatus,
            crate::dto::room::SubmitPointsResponse,
            crate::dto::room::PlayerSummary,
            crate::dto::room::RoomView,
            crate::dto::room::RoundAnswersEntry,
            crate::dto::room::RoundStatusResponse,
            crate::dto::room::RoundResultView,
            crate::dto::room::ResultsResponse,
            crate::dto::room::RoomListItem,
            crate::dto::room::CategoriesResponse,
            crate::dto::ws::PlayerInboundMessage,
            crate::dto::ws::SessionAck,
            crate::dto::ws::SessionError,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room creation, membership and start signal"),
        (name = "rounds", description = "Answers, points and results"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "players", description = "WebSocket sessions for players"),
    )
)]
pub struct ApiDoc;
