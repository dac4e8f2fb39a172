use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::events::RoomEvent,
    error::ServiceError,
    services::room_events,
    state::{RevisionFilter, SharedState, room::RoomPin, transitions::load_room},
};

/// An open subscription to one room.
pub struct RoomSubscription {
    /// Room subscribed to.
    pub pin: RoomPin,
    /// Events published after the subscription was registered.
    pub receiver: broadcast::Receiver<RoomEvent>,
    /// Reconciliation state, seeded with the revision read at subscribe time.
    pub filter: RevisionFilter,
}

/// Subscribe to the events of `pin`.
///
/// The receiver is registered before the room is read, so nothing committed
/// after the read is missed; events older than the read are filtered out.
pub async fn subscribe_room(
    state: &SharedState,
    pin: RoomPin,
) -> Result<RoomSubscription, ServiceError> {
    let receiver = state.hub().subscribe(pin);
    let room = match load_room(state, pin).await {
        Ok(room) => room,
        Err(err) => {
            drop(receiver);
            state.hub().prune(pin);
            return Err(err);
        }
    };
    Ok(RoomSubscription {
        pin,
        receiver,
        filter: RevisionFilter::starting_at(room.revision),
    })
}

/// Convert a room subscription into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    state: SharedState,
    subscription: RoomSubscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let RoomSubscription {
        pin,
        mut receiver,
        mut filter,
    } = subscription;
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        info!(pin = %pin, "room SSE stream connected");
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(event) => {
                            if !filter.accept(&event) {
                                debug!(pin = %pin, revision = event.revision, "dropping reconciled event");
                                continue;
                            }
                            let Some(data) = room_events::encode(&event) else {
                                continue;
                            };
                            let sse = Event::default().event(event.kind.name()).data(data);
                            if tx.send(Ok(sse)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(pin = %pin, skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        drop(receiver);
        state.hub().prune(pin);
        info!(pin = %pin, "room SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::BodyDataStream, response::IntoResponse};
    use futures::StreamExt;

    use crate::{
        config::GamePolicy,
        dto::events::RoomEventKind,
        services::{
            membership_service::{create_room, join_room},
            test_support::{create_request, join_request, pin, test_state},
        },
    };

    #[tokio::test]
    async fn unknown_room_cannot_be_subscribed() {
        let state = test_state(GamePolicy::default()).await;
        let err = subscribe_room(&state, pin(77)).await.err().unwrap();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(state.hub().active_rooms(), 0);
    }

    #[tokio::test]
    async fn subscription_starts_at_the_read_revision() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(5, "alice")).await.unwrap();
        let mut subscription = subscribe_room(&state, pin(5)).await.unwrap();

        join_room(&state, pin(5), join_request("bob", "secret"))
            .await
            .unwrap();
        let event = subscription.receiver.recv().await.unwrap();
        assert!(subscription.filter.accept(&event));
        assert_eq!(event.revision, 2);
        assert!(!subscription.filter.accept(&event));
    }

    async fn next_event(body: &mut BodyDataStream, buffer: &mut String) -> String {
        loop {
            if let Some(end) = buffer.find("\n\n") {
                let event = buffer[..end].to_owned();
                buffer.drain(..end + 2);
                return event;
            }
            let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
                .await
                .expect("no SSE frame within two seconds")
                .expect("SSE body ended")
                .unwrap();
            buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    fn event_name(frame: &str) -> Option<&str> {
        frame
            .lines()
            .find_map(|line| line.strip_prefix("event:"))
            .map(str::trim)
    }

    #[tokio::test]
    async fn stream_names_events_by_kind_and_reconciles_them() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(5, "alice")).await.unwrap();
        let subscription = subscribe_room(&state, pin(5)).await.unwrap();
        let mut body = to_sse_stream(state.clone(), subscription)
            .into_response()
            .into_body()
            .into_data_stream();

        join_room(&state, pin(5), join_request("bob", "secret"))
            .await
            .unwrap();
        let stale = RoomEvent {
            pin: 5,
            revision: 1,
            kind: RoomEventKind::AnswersUpdated { players: vec![] },
        };
        state.hub().publish(pin(5), stale);
        let late_start = RoomEvent {
            pin: 5,
            revision: 1,
            kind: RoomEventKind::GameStarted,
        };
        state.hub().publish(pin(5), late_start);

        let mut buffer = String::new();
        let joined = next_event(&mut body, &mut buffer).await;
        assert_eq!(event_name(&joined), Some("playerJoined"), "{joined}");
        assert!(joined.contains("\"revision\":2"), "{joined}");

        let started = next_event(&mut body, &mut buffer).await;
        assert_eq!(event_name(&started), Some("gameStarted"), "{started}");
        assert!(started.contains("\"revision\":1"), "{started}");
    }

    #[tokio::test]
    async fn disconnect_prunes_the_room_channel() {
        let state = test_state(GamePolicy::default()).await;
        create_room(&state, create_request(5, "alice")).await.unwrap();
        let subscription = subscribe_room(&state, pin(5)).await.unwrap();
        let sse = to_sse_stream(state.clone(), subscription);
        assert_eq!(state.hub().active_rooms(), 1);

        drop(sse);
        for _ in 0..100 {
            if state.hub().active_rooms() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.hub().active_rooms(), 0);
    }
}
