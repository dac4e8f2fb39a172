use std::sync::Arc;

use crate::{
    config::{AppConfig, GamePolicy},
    dao::room_store::MemoryRoomStore,
    dto::room::{CreateRoomRequest, JoinRoomRequest, SubmitAnswersRequest, SubmitPointsRequest},
    state::{AppState, SharedState, room::RoomPin},
};

pub async fn test_state(policy: GamePolicy) -> SharedState {
    let state = AppState::new(AppConfig::with_policy(policy));
    state
        .install_room_store(Arc::new(MemoryRoomStore::new()))
        .await;
    state
}

pub fn pin(value: u32) -> RoomPin {
    RoomPin::try_from(value).unwrap()
}

pub fn create_request(pin: i64, nickname: &str) -> CreateRoomRequest {
    CreateRoomRequest {
        pin: serde_json::json!(pin),
        nickname: nickname.into(),
        password: "secret".into(),
        confirm_password: None,
        categories: ["Animal", "City", "Food", "Movie", "Name"]
            .map(String::from)
            .to_vec(),
    }
}

pub fn join_request(nickname: &str, password: &str) -> JoinRoomRequest {
    JoinRoomRequest {
        nickname: nickname.into(),
        password: password.into(),
    }
}

pub fn answers_request(nickname: &str, answers: [&str; 5]) -> SubmitAnswersRequest {
    SubmitAnswersRequest {
        nickname: nickname.into(),
        answers: answers.map(String::from).to_vec(),
    }
}

pub fn points_request(judge: Option<&str>, points: serde_json::Value) -> SubmitPointsRequest {
    serde_json::from_value(serde_json::json!({ "judge": judge, "points": points })).unwrap()
}
