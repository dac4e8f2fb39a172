use std::time::SystemTime;

use tracing::info;

use crate::{
    config::StartPolicy,
    dao::models::RoomEntity,
    dto::room::{
        AckResponse, CategoriesResponse, CreateRoomRequest, JoinRoomRequest, RoomListItem,
        RoomPinResponse, RoomView,
    },
    error::ServiceError,
    services::room_events,
    state::{
        SharedState,
        room::{
            Room, RoomPin, draw_round_letters, normalize_categories, normalize_nickname,
        },
        transitions::{load_room, mutate_room},
    },
};

/// Open a room whose only player is its creator.
pub async fn create_room(
    state: &SharedState,
    request: CreateRoomRequest,
) -> Result<RoomPinResponse, ServiceError> {
    let pin = RoomPin::try_from(&request.pin)?;
    let nickname = normalize_nickname(&request.nickname)?;
    if request.password.trim().is_empty() {
        return Err(ServiceError::InvalidInput("password must not be blank".into()));
    }
    if let Some(confirm) = &request.confirm_password {
        if confirm != &request.password {
            return Err(ServiceError::InvalidInput("passwords do not match".into()));
        }
    }
    let categories = normalize_categories(&request.categories)?;
    let letters = draw_round_letters(&mut rand::rng());

    let room = Room::new(
        pin,
        nickname,
        request.password,
        categories,
        letters,
        SystemTime::now(),
    );
    let store = state.require_room_store().await?;
    let entity = RoomEntity::from(&room);
    state
        .with_store_timeout(async { Ok(store.insert_room(entity).await?) })
        .await?;

    info!(pin = %pin, owner = room.owner().unwrap_or_default(), "room created");
    Ok(RoomPinResponse { pin: pin.get() })
}

/// Add a player to a room that has not started yet.
pub async fn join_room(
    state: &SharedState,
    pin: RoomPin,
    request: JoinRoomRequest,
) -> Result<AckResponse, ServiceError> {
    let nickname = normalize_nickname(&request.nickname)?;
    let ((), room) = mutate_room(state, pin, |room| {
        room.join(nickname.clone(), &request.password, SystemTime::now())
    })
    .await?;

    info!(pin = %pin, nickname = %nickname, revision = room.revision, "player joined");
    room_events::broadcast_player_joined(state, &room);
    Ok(AckResponse::new(
        format!("{nickname} joined room {pin}"),
        room.revision,
    ))
}

/// Broadcast the start signal. Nothing is stored.
pub async fn start_game(
    state: &SharedState,
    pin: RoomPin,
    nickname: Option<&str>,
) -> Result<AckResponse, ServiceError> {
    let room = load_room(state, pin).await?;
    let nickname = nickname.map(str::trim).filter(|nickname| !nickname.is_empty());

    if let Some(nickname) = nickname {
        room.player(nickname)?;
    }
    if state.config().policy().start == StartPolicy::OwnerOnly && nickname != room.owner() {
        return Err(ServiceError::Unauthorized(
            "only the room owner may start the game".into(),
        ));
    }

    info!(pin = %pin, nickname = nickname.unwrap_or_default(), "game start signalled");
    room_events::broadcast_game_started(state, &room);
    Ok(AckResponse::new("game started", room.revision))
}

/// Room state for a player, or for the room's lowest active round.
pub async fn get_room_view(
    state: &SharedState,
    pin: RoomPin,
    nickname: Option<&str>,
) -> Result<RoomView, ServiceError> {
    let room = load_room(state, pin).await?;
    RoomView::build(&room, nickname.map(str::trim))
}

/// Every stored room, oldest first.
pub async fn list_rooms(state: &SharedState) -> Result<Vec<RoomListItem>, ServiceError> {
    let store = state.require_room_store().await?;
    let rooms = state
        .with_store_timeout(async { Ok(store.list_rooms().await?) })
        .await?;
    Ok(rooms.into_iter().map(Into::into).collect())
}

/// Category catalog from the configuration.
pub fn list_categories(state: &SharedState) -> CategoriesResponse {
    CategoriesResponse {
        categories: state.config().categories().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{GamePolicy, StartPolicy},
        services::test_support::{create_request, join_request, pin, test_state},
    };

    #[tokio::test]
    async fn created_room_resolves_with_five_categories() {
        let state = test_state(GamePolicy::default()).await;
        let response = create_room(&state, create_request(1234, "alice"))
            .await
            .unwrap();
        assert_eq!(response.pin, 1234);

        let view = get_room_view(&state, pin(1234), None).await.unwrap();
        assert_eq!(view.categories.len(), 5);
        assert_eq!(view.owner.as_deref(), Some("alice"));
        assert_eq!(view.current_round, Some(1));
        assert_eq!(view.revision, 1);
        assert!(view.letter.is_some());
    }

    #[tokio::test]
    async fn duplicate_pin_is_a_conflict() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(1, "alice")).await.unwrap();
        let err = create_room(&state, create_request(1, "bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let state = test_state(GamePolicy::default()).await;

        let err = create_room(&state, create_request(0, "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let mut request = create_request(5, "alice");
        request.pin = serde_json::json!("12ab");
        let err = create_room(&state, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let mut request = create_request(5, "alice");
        request.confirm_password = Some("other".into());
        let err = create_room(&state, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let mut request = create_request(5, "alice");
        request.categories.pop();
        let err = create_room(&state, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn join_succeeds_once_per_nickname() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(1, "alice")).await.unwrap();
        let mut events = state.hub().subscribe(pin(1));

        let ack = join_room(&state, pin(1), join_request("bob", "secret"))
            .await
            .unwrap();
        assert_eq!(ack.revision, 2);
        let event = events.recv().await.unwrap();
        assert_eq!(event.kind.name(), "playerJoined");
        assert_eq!(event.revision, 2);

        let err = join_room(&state, pin(1), join_request("bob", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn join_errors() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(1, "alice")).await.unwrap();

        let err = join_room(&state, pin(2), join_request("bob", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = join_room(&state, pin(1), join_request("bob", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn owner_only_start() {
        let policy = GamePolicy {
            start: StartPolicy::OwnerOnly,
            ..GamePolicy::default()
        };
        let state = test_state(policy).await;
        create_room(&state, create_request(1, "alice")).await.unwrap();
        join_room(&state, pin(1), join_request("bob", "secret"))
            .await
            .unwrap();
        let mut events = state.hub().subscribe(pin(1));

        let err = start_game(&state, pin(1), Some("bob")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        let err = start_game(&state, pin(1), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let ack = start_game(&state, pin(1), Some("alice")).await.unwrap();
        assert_eq!(ack.revision, 2);
        let event = events.recv().await.unwrap();
        assert_eq!(event.kind.name(), "gameStarted");

        // idempotent: nothing is stored
        start_game(&state, pin(1), Some("alice")).await.unwrap();
        let view = get_room_view(&state, pin(1), None).await.unwrap();
        assert_eq!(view.revision, 2);
    }

    #[tokio::test]
    async fn any_player_may_start_by_default() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(1, "alice")).await.unwrap();
        join_room(&state, pin(1), join_request("bob", "secret"))
            .await
            .unwrap();
        start_game(&state, pin(1), Some("bob")).await.unwrap();
        start_game(&state, pin(1), None).await.unwrap();

        let err = start_game(&state, pin(1), Some("zoe")).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn view_for_unknown_player_is_not_found() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(1, "alice")).await.unwrap();
        let err = get_room_view(&state, pin(1), Some("zoe")).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn rooms_and_categories_are_listed() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(1, "alice")).await.unwrap();
        create_room(&state, create_request(2, "bob")).await.unwrap();

        let rooms = list_rooms(&state).await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert!(rooms.iter().all(|room| room.player_count == 1));
        assert_eq!(list_categories(&state).categories.len(), 16);
    }

    #[tokio::test]
    async fn degraded_state_rejects_operations() {
        let state = crate::state::AppState::new(crate::config::AppConfig::default());
        let err = create_room(&state, create_request(1, "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }
}
