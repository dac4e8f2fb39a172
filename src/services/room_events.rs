use tracing::{debug, warn};

use crate::{
    dto::events::RoomEvent,
    state::{SharedState, room::Room},
};

/// Publish an event built from a committed room.
pub fn publish(state: &SharedState, room: &Room, event: RoomEvent) {
    debug!(
        pin = %room.pin,
        revision = event.revision,
        event = event.kind.name(),
        "publishing room event"
    );
    state.hub().publish(room.pin, event);
}

/// A player entered the room.
pub fn broadcast_player_joined(state: &SharedState, room: &Room) {
    publish(state, room, RoomEvent::player_joined(room));
}

/// A sheet was stored; under automatic advance the round may also have closed.
pub fn broadcast_answers_updated(state: &SharedState, room: &Room, round_closed: bool) {
    publish(state, room, RoomEvent::answers_updated(room));
    if round_closed {
        publish(state, room, RoomEvent::round_advanced(room));
    }
}

/// A round result was committed.
pub fn broadcast_round_scored(state: &SharedState, room: &Room) {
    let event = if room.is_finished() {
        RoomEvent::game_over(room)
    } else {
        RoomEvent::points_updated(room)
    };
    publish(state, room, event);
}

/// A peer ballot was recorded without closing the round.
pub fn broadcast_ballot_received(state: &SharedState, room: &Room, judge: &str) {
    publish(state, room, RoomEvent::ballot_received(room, judge));
}

/// The start signal was sent.
pub fn broadcast_game_started(state: &SharedState, room: &Room) {
    publish(state, room, RoomEvent::game_started(room));
}

/// Serialise an event for a text transport, logging failures.
pub fn encode(event: &RoomEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(err) => {
            warn!(
                event = event.kind.name(),
                error = %err,
                "failed to serialize room event"
            );
            None
        }
    }
}
