use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    dto::events::{RoomEvent, RoomEventKind},
    state::room::RoomPin,
};

/// Per-room broadcast channels, created on first subscribe.
pub struct RoomHub {
    channels: DashMap<RoomPin, broadcast::Sender<RoomEvent>>,
    capacity: usize,
}

impl RoomHub {
    /// Construct a hub whose channels buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber that will receive subsequent events of `pin`.
    pub fn subscribe(&self, pin: RoomPin) -> broadcast::Receiver<RoomEvent> {
        self.channels
            .entry(pin)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Send an event to the current subscribers of its room.
    ///
    /// Having no subscriber is not an error; the channel is dropped instead.
    pub fn publish(&self, pin: RoomPin, event: RoomEvent) {
        let delivered = self
            .channels
            .get(&pin)
            .map(|sender| sender.send(event).unwrap_or(0))
            .unwrap_or(0);
        if delivered == 0 {
            self.prune(pin);
        }
        debug!(pin = %pin, delivered, "room event published");
    }

    /// Drop the channel of `pin` once nobody listens to it.
    pub fn prune(&self, pin: RoomPin) {
        self.channels
            .remove_if(&pin, |_, sender| sender.receiver_count() == 0);
    }

    /// Number of rooms that currently have a channel.
    pub fn active_rooms(&self) -> usize {
        self.channels.len()
    }
}

/// Per-connection reconciliation of room events.
///
/// Drops events older than the newest revision already delivered, and a
/// second event of the same kind at that revision.
///
/// `gameStarted` commits nothing and carries the revision its sender read, so
/// it can arrive behind newer events. It is never treated as stale; only a
/// repeat at an already delivered revision is dropped.
#[derive(Debug, Default)]
pub struct RevisionFilter {
    revision: Option<u64>,
    delivered: Vec<&'static str>,
    started: Vec<u64>,
}

impl RevisionFilter {
    /// Create a filter that has not delivered anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a revision the client already read.
    pub fn starting_at(revision: u64) -> Self {
        Self {
            revision: Some(revision),
            ..Self::default()
        }
    }

    /// Decide whether `event` should reach the client, recording it if so.
    pub fn accept(&mut self, event: &RoomEvent) -> bool {
        if matches!(event.kind, RoomEventKind::GameStarted) {
            if self.started.contains(&event.revision) {
                return false;
            }
            self.started.push(event.revision);
            return true;
        }

        let kind = event.kind.name();
        match self.revision {
            Some(last) if event.revision < last => false,
            Some(last) if event.revision == last => {
                if self.delivered.contains(&kind) {
                    false
                } else {
                    self.delivered.push(kind);
                    true
                }
            }
            _ => {
                self.revision = Some(event.revision);
                self.delivered.clear();
                self.delivered.push(kind);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin() -> RoomPin {
        RoomPin::try_from(1234i64).unwrap()
    }

    fn event(revision: u64, kind: RoomEventKind) -> RoomEvent {
        RoomEvent {
            pin: 1234,
            revision,
            kind,
        }
    }

    fn answers(revision: u64) -> RoomEvent {
        event(revision, RoomEventKind::AnswersUpdated { players: vec![] })
    }

    #[test]
    fn filter_drops_stale_and_duplicate_events() {
        let mut filter = RevisionFilter::new();
        assert!(filter.accept(&answers(3)));
        assert!(!filter.accept(&answers(3)));
        assert!(!filter.accept(&answers(2)));
        assert!(filter.accept(&answers(4)));
    }

    #[test]
    fn filter_keeps_distinct_kinds_of_one_revision() {
        let mut filter = RevisionFilter::new();
        assert!(filter.accept(&answers(5)));
        let advanced = event(
            5,
            RoomEventKind::RoundAdvanced {
                players: vec![],
                current_round: Some(2),
                letter: Some("B".into()),
            },
        );
        assert!(filter.accept(&advanced));
        assert!(!filter.accept(&advanced));
    }

    #[test]
    fn filter_starting_at_a_read_revision() {
        let mut filter = RevisionFilter::starting_at(4);
        assert!(!filter.accept(&answers(3)));
        assert!(filter.accept(&answers(4)));
        assert!(filter.accept(&event(4, RoomEventKind::GameStarted)));
    }

    #[test]
    fn start_signal_behind_a_newer_commit_is_delivered() {
        let mut filter = RevisionFilter::starting_at(1);
        let joined = event(2, RoomEventKind::PlayerJoined { players: vec![] });
        assert!(filter.accept(&joined));

        let started = event(1, RoomEventKind::GameStarted);
        assert!(filter.accept(&started));
        assert!(!filter.accept(&started));
        assert!(!filter.accept(&answers(1)));
        assert!(filter.accept(&event(2, RoomEventKind::GameStarted)));
    }

    #[tokio::test]
    async fn publish_reaches_subscribers_of_the_room_only() {
        let hub = RoomHub::new(8);
        let mut receiver = hub.subscribe(pin());
        let mut other = hub.subscribe(RoomPin::try_from(99i64).unwrap());

        hub.publish(pin(), answers(2));
        assert_eq!(receiver.recv().await.unwrap(), answers(2));
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_prunes_the_channel() {
        let hub = RoomHub::new(8);
        let receiver = hub.subscribe(pin());
        assert_eq!(hub.active_rooms(), 1);
        drop(receiver);

        hub.publish(pin(), answers(2));
        assert_eq!(hub.active_rooms(), 0);
    }
}
