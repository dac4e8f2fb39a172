use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use letter_rush_back::{
    config::{AppConfig, GamePolicy, StartPolicy},
    dao::room_store::MemoryRoomStore,
    routes,
    state::AppState,
};

async fn app(policy: GamePolicy) -> Router {
    let state = AppState::new(AppConfig::with_policy(policy));
    state
        .install_room_store(Arc::new(MemoryRoomStore::new()))
        .await;
    routes::router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn create_body(pin: Value) -> Value {
    json!({
        "pin": pin,
        "nickname": "alice",
        "password": "pw",
        "categories": ["Animal", "City", "Food", "Movie", "Name"],
    })
}

#[tokio::test]
async fn alice_and_bob_play_the_first_round() {
    let app = app(GamePolicy::default()).await;

    let (status, body) = send(&app, Method::POST, "/rooms", Some(create_body(json!(1234)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pin"], 1234);

    let join = json!({"nickname": "bob", "password": "pw"});
    let (status, body) = send(&app, Method::POST, "/rooms/1234/players", Some(join.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revision"], 2);
    let (status, body) = send(&app, Method::POST, "/rooms/1234/players", Some(join)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());

    let answers = json!({"nickname": "alice", "answers": ["Paris", "Panda", "", "", ""]});
    let (status, _) = send(
        &app,
        Method::POST,
        "/rooms/1234/rounds/1/answers",
        Some(answers),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/rooms/1234/rounds/1/answers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["nickname"], "alice");
    assert_eq!(body[0]["answers"], json!(["Paris", "Panda", "", "", ""]));

    let (status, body) = send(&app, Method::GET, "/rooms/1234/rounds/1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["all_submitted"], false);
    assert_eq!(body["pending"], json!(["bob"]));

    let points = json!({"points": {"alice": 3, "bob": 1}});
    let (status, body) = send(&app, Method::POST, "/rooms/1234/rounds/1/points", Some(points.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "finalized");
    let (status, _) = send(&app, Method::POST, "/rooms/1234/rounds/1/points", Some(points)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::GET, "/rooms/1234/results", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["standings"][0]["nickname"], "alice");
    assert_eq!(body["standings"][0]["overall_points"], 3);
    assert_eq!(body["standings"][1]["overall_points"], 1);
    assert_eq!(body["rounds"][0]["round"], 1);
    assert_eq!(body["rounds"][0]["points"], json!({"alice": 3, "bob": 1}));

    let (status, body) = send(&app, Method::GET, "/rooms/1234?nickname=bob", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_round"], 2);
    assert_eq!(body["categories"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn pin_accepts_numeric_strings_and_rejects_the_rest() {
    let app = app(GamePolicy::default()).await;

    let (status, body) = send(&app, Method::POST, "/rooms", Some(create_body(json!("42")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pin"], 42);

    let (status, _) = send(&app, Method::POST, "/rooms", Some(create_body(json!(0)))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::POST, "/rooms", Some(create_body(json!("12ab")))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().is_some_and(|message| message.contains("PIN")));

    let (status, _) = send(&app, Method::POST, "/rooms", Some(create_body(json!(42)))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn error_statuses() {
    let app = app(GamePolicy::default()).await;
    send(&app, Method::POST, "/rooms", Some(create_body(json!(7)))).await;

    let (status, _) = send(&app, Method::GET, "/rooms/8", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/rooms/7/players",
        Some(json!({"nickname": "bob", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/rooms/7/rounds/2/answers",
        Some(json!({"nickname": "alice", "answers": ["a", "b", "c", "d", "e"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/rooms/7/rounds/1/points",
        Some(json!({"points": {"zoe": 2}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owner_only_start_over_http() {
    let policy = GamePolicy {
        start: StartPolicy::OwnerOnly,
        ..GamePolicy::default()
    };
    let app = app(policy).await;
    send(&app, Method::POST, "/rooms", Some(create_body(json!(9)))).await;
    send(
        &app,
        Method::POST,
        "/rooms/9/players",
        Some(json!({"nickname": "bob", "password": "pw"})),
    )
    .await;

    let (status, _) = send(&app, Method::POST, "/rooms/9/start", Some(json!({"nickname": "bob"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::POST, "/rooms/9/start", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::POST, "/rooms/9/start", Some(json!({"nickname": "alice"}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn listings_and_health() {
    let app = app(GamePolicy::default()).await;
    send(&app, Method::POST, "/rooms", Some(create_body(json!(1)))).await;

    let (status, body) = send(&app, Method::GET, "/rooms", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["pin"], 1);
    assert_eq!(body[0]["player_count"], 1);

    let (status, body) = send(&app, Method::GET, "/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["categories"].as_array().is_some_and(|c| !c.is_empty()));

    let (status, body) = send(&app, Method::GET, "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
