use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{PlayerInboundMessage, SessionAck, SessionError},
    error::ServiceError,
    services::{membership_service, room_events, sse_service},
    state::{SessionHandle, SharedState, room::RoomPin},
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a player session could not be opened.
#[derive(Debug, Error)]
enum IdentifyError {
    #[error("identification timed out")]
    TimedOut,
    #[error("connection closed before identification")]
    Closed,
    #[error("first frame must be an identify message")]
    NotIdentify,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Handle the full lifecycle of a player WebSocket connected to `pin`.
pub async fn handle_socket(state: SharedState, pin: RoomPin, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let Some(nickname) =
        open_session(&state, pin, &mut receiver, &outbound_tx, IDENT_TIMEOUT).await
    else {
        finalize(writer_task, outbound_tx).await;
        return;
    };

    let mut subscription = match sse_service::subscribe_room(&state, pin).await {
        Ok(subscription) => subscription,
        Err(err) => {
            warn!(pin = %pin, nickname = %nickname, error = %err, "room vanished during identification");
            send_json(&outbound_tx, &SessionError::new(err.to_string()));
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let handle = SessionHandle::new(outbound_tx.clone());
    state.sessions().register(pin, &nickname, handle.clone());
    info!(pin = %pin, nickname = %nickname, session = %handle.id, "player connected");
    send_json(
        &outbound_tx,
        &SessionAck {
            pin: pin.get(),
            nickname: nickname.clone(),
            status: "connected".into(),
        },
    );

    loop {
        tokio::select! {
            _ = handle.displaced() => {
                info!(pin = %pin, nickname = %nickname, "session displaced by a newer login");
                break;
            }
            event = subscription.receiver.recv() => match event {
                Ok(event) => {
                    if !subscription.filter.accept(&event) {
                        continue;
                    }
                    if let Some(text) = room_events::encode(&event) {
                        if outbound_tx.send(Message::Text(text.into())).is_err() {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(pin = %pin, nickname = %nickname, skipped, "player session lagged");
                }
                Err(RecvError::Closed) => break,
            },
            message = receiver.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    handle_command(&state, pin, &nickname, &outbound_tx, text.as_str()).await;
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = outbound_tx.send(Message::Pong(payload));
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(pin = %pin, nickname = %nickname, "player closed the session");
                    let _ = outbound_tx.send(Message::Close(frame));
                    break;
                }
                Some(Ok(Message::Binary(_) | Message::Pong(_))) => {}
                Some(Err(err)) => {
                    warn!(pin = %pin, nickname = %nickname, error = %err, "websocket error");
                    break;
                }
                None => break,
            },
        }
    }

    drop(subscription);
    state.hub().prune(pin);
    if state.sessions().deregister(pin, &nickname, handle.id) {
        info!(pin = %pin, nickname = %nickname, "player disconnected");
    }
    drop(handle);
    finalize(writer_task, outbound_tx).await;
}

/// Identify the player, or answer with an error frame and a close.
///
/// Nothing is sent when the client went away before identifying.
async fn open_session<S>(
    state: &SharedState,
    pin: RoomPin,
    receiver: &mut S,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    limit: Duration,
) -> Option<String>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    match identify(state, pin, receiver, limit).await {
        Ok(nickname) => Some(nickname),
        Err(err) => {
            warn!(pin = %pin, error = %err, "player session rejected");
            if !matches!(err, IdentifyError::Closed) {
                send_json(outbound_tx, &SessionError::new(err.to_string()));
                let _ = outbound_tx.send(Message::Close(None));
            }
            None
        }
    }
}

/// Wait for the identify frame and check the nickname belongs to the room.
async fn identify<S>(
    state: &SharedState,
    pin: RoomPin,
    receiver: &mut S,
    limit: Duration,
) -> Result<String, IdentifyError>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let text = match tokio::time::timeout(limit, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) => return Err(IdentifyError::Closed),
        Ok(Some(Ok(_))) => return Err(IdentifyError::NotIdentify),
        Ok(Some(Err(err))) => {
            debug!(pin = %pin, error = %err, "websocket receive error");
            return Err(IdentifyError::Closed);
        }
        Err(_) => return Err(IdentifyError::TimedOut),
    };

    let message: PlayerInboundMessage =
        serde_json::from_str(text.as_str()).map_err(|_| IdentifyError::NotIdentify)?;
    let nickname = message
        .identify_nickname()
        .map(str::trim)
        .ok_or(IdentifyError::NotIdentify)?
        .to_owned();

    let view = membership_service::get_room_view(state, pin, Some(nickname.as_str())).await?;
    debug!(pin = %pin, nickname = %nickname, revision = view.revision, "player identified");
    Ok(nickname)
}

/// Run one command sent by an identified player.
async fn handle_command(
    state: &SharedState,
    pin: RoomPin,
    nickname: &str,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    text: &str,
) {
    let message = match serde_json::from_str::<PlayerInboundMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(pin = %pin, nickname, error = %err, "failed to parse player message");
            send_json(outbound_tx, &SessionError::new("malformed message"));
            return;
        }
    };

    match message {
        PlayerInboundMessage::StartGame => {
            if let Err(err) = membership_service::start_game(state, pin, Some(nickname)).await {
                warn!(pin = %pin, nickname, error = %err, "start_game rejected");
                send_json(outbound_tx, &SessionError::new(err.to_string()));
            }
        }
        PlayerInboundMessage::Identify { .. } => {
            debug!(pin = %pin, nickname, "ignoring repeated identification");
        }
        PlayerInboundMessage::Unknown => {
            send_json(outbound_tx, &SessionError::new("unsupported message type"));
        }
    }
}

/// Serialize a payload and push it onto the writer channel.
fn send_json<T>(tx: &mpsc::UnboundedSender<Message>, value: &T)
where
    T: serde::Serialize,
{
    match serde_json::to_string(value) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload.into()));
        }
        Err(err) => warn!(error = %err, "failed to serialize websocket message"),
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{GamePolicy, StartPolicy},
        dto::events::RoomEventKind,
        services::{
            membership_service::{create_room, join_room},
            test_support::{create_request, join_request, pin, test_state},
        },
    };
    use serde_json::Value;

    const LIMIT: Duration = Duration::from_millis(50);

    fn frames(texts: &[&str]) -> impl Stream<Item = Result<Message, axum::Error>> + Unpin {
        let frames: Vec<Result<Message, axum::Error>> = texts
            .iter()
            .map(|text| Ok(Message::Text(text.to_string().into())))
            .collect();
        futures::stream::iter(frames)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn error_message(message: &Message) -> String {
        let Message::Text(text) = message else {
            panic!("expected a text frame, got {message:?}");
        };
        let value: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["type"], "error");
        value["message"].as_str().unwrap().to_owned()
    }

    fn assert_rejected(rx: &mut mpsc::UnboundedReceiver<Message>) -> String {
        let messages = drain(rx);
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(matches!(messages[1], Message::Close(None)));
        error_message(&messages[0])
    }

    #[tokio::test]
    async fn player_of_the_room_is_identified() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(3, "alice")).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut receiver = frames(&[r#"{"type":"identify","nickname":" alice "}"#]);
        let nickname = open_session(&state, pin(3), &mut receiver, &tx, LIMIT).await;
        assert_eq!(nickname.as_deref(), Some("alice"));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn first_frame_must_identify() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(3, "alice")).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut receiver = frames(&[r#"{"type":"start_game"}"#]);
        assert!(open_session(&state, pin(3), &mut receiver, &tx, LIMIT).await.is_none());
        let message = assert_rejected(&mut rx);
        assert_eq!(message, IdentifyError::NotIdentify.to_string());
    }

    #[tokio::test]
    async fn unknown_nickname_is_rejected() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(3, "alice")).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut receiver = frames(&[r#"{"type":"identify","nickname":"zoe"}"#]);
        assert!(open_session(&state, pin(3), &mut receiver, &tx, LIMIT).await.is_none());
        assert!(assert_rejected(&mut rx).contains("zoe"));
    }

    #[tokio::test]
    async fn silent_client_times_out() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(3, "alice")).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut receiver = futures::stream::pending::<Result<Message, axum::Error>>();
        assert!(open_session(&state, pin(3), &mut receiver, &tx, LIMIT).await.is_none());
        let message = assert_rejected(&mut rx);
        assert_eq!(message, IdentifyError::TimedOut.to_string());
    }

    #[tokio::test]
    async fn client_gone_before_identifying_gets_nothing() {
        let state = test_state(GamePolicy::default()).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut receiver = frames(&[]);
        assert!(open_session(&state, pin(3), &mut receiver, &tx, LIMIT).await.is_none());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn start_game_command_broadcasts_the_signal() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(3, "alice")).await.unwrap();
        let mut events = state.hub().subscribe(pin(3));
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_command(&state, pin(3), "alice", &tx, r#"{"type":"start_game"}"#).await;
        let event = events.try_recv().unwrap();
        assert_eq!(event.kind, RoomEventKind::GameStarted);
        assert_eq!(event.revision, 1);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn rejected_commands_answer_with_an_error_frame() {
        let policy = GamePolicy {
            start: StartPolicy::OwnerOnly,
            ..GamePolicy::default()
        };
        let state = test_state(policy).await;
        create_room(&state, create_request(3, "alice")).await.unwrap();
        join_room(&state, pin(3), join_request("bob", "secret"))
            .await
            .unwrap();
        let mut events = state.hub().subscribe(pin(3));
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_command(&state, pin(3), "bob", &tx, r#"{"type":"start_game"}"#).await;
        handle_command(&state, pin(3), "bob", &tx, "not json").await;
        handle_command(&state, pin(3), "bob", &tx, r#"{"type":"dance"}"#).await;

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 3);
        assert!(error_message(&messages[0]).contains("owner"));
        assert_eq!(error_message(&messages[1]), "malformed message");
        assert_eq!(error_message(&messages[2]), "unsupported message type");
        assert!(events.try_recv().is_err());
    }
}
