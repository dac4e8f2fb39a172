use serde::Serialize;

use crate::{
    dto::room::{PlayerSummary, player_summaries},
    state::room::Room,
};

/// State change published to every connection of a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoomEvent {
    /// Room the event belongs to.
    pub pin: u32,
    /// Room revision written by the commit that produced the event.
    pub revision: u64,
    /// What happened, flattened into `type` and `payload`.
    #[serde(flatten)]
    pub kind: RoomEventKind,
}

/// Event payloads, serialized as `{"type": ..., "payload": {...}}` with
/// camelCase names for both the type and the payload fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum RoomEventKind {
    /// A player entered the room.
    PlayerJoined {
        /// Every player, in join order.
        players: Vec<PlayerSummary>,
    },
    /// A sheet was recorded.
    AnswersUpdated {
        /// Every player, in join order.
        players: Vec<PlayerSummary>,
    },
    /// A round result was committed.
    PointsUpdated {
        /// Every player, in join order.
        players: Vec<PlayerSummary>,
        /// Lowest round still being played.
        current_round: Option<u8>,
    },
    /// A peer ballot was recorded and more are expected.
    BallotReceived {
        /// Player who cast the ballot.
        judge: String,
        /// Ballots recorded so far.
        received: usize,
        /// Ballots needed to close the round.
        expected: usize,
    },
    /// The last sheet of a round moved everyone on.
    RoundAdvanced {
        /// Every player, in join order.
        players: Vec<PlayerSummary>,
        /// Round now being played.
        current_round: Option<u8>,
        /// Letter of that round.
        letter: Option<String>,
    },
    /// Start signal; nothing is stored.
    GameStarted,
    /// The fifth round was scored.
    GameOver {
        /// Final standings, highest first.
        players: Vec<PlayerSummary>,
    },
}

impl RoomEventKind {
    /// Wire name of the event, also used as the SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayerJoined { .. } => "playerJoined",
            Self::AnswersUpdated { .. } => "answersUpdated",
            Self::PointsUpdated { .. } => "pointsUpdated",
            Self::BallotReceived { .. } => "ballotReceived",
            Self::RoundAdvanced { .. } => "roundAdvanced",
            Self::GameStarted => "gameStarted",
            Self::GameOver { .. } => "gameOver",
        }
    }
}

impl RoomEvent {
    fn new(room: &Room, kind: RoomEventKind) -> Self {
        Self {
            pin: room.pin.get(),
            revision: room.revision,
            kind,
        }
    }

    /// `playerJoined` after a join commit.
    pub fn player_joined(room: &Room) -> Self {
        Self::new(
            room,
            RoomEventKind::PlayerJoined {
                players: player_summaries(room),
            },
        )
    }

    /// `answersUpdated` after a sheet commit.
    pub fn answers_updated(room: &Room) -> Self {
        Self::new(
            room,
            RoomEventKind::AnswersUpdated {
                players: player_summaries(room),
            },
        )
    }

    /// `pointsUpdated` after a round result commit.
    pub fn points_updated(room: &Room) -> Self {
        Self::new(
            room,
            RoomEventKind::PointsUpdated {
                players: player_summaries(room),
                current_round: room.lowest_active_round(),
            },
        )
    }

    /// `ballotReceived` for the ballot `judge` just cast.
    pub fn ballot_received(room: &Room, judge: &str) -> Self {
        Self::new(
            room,
            RoomEventKind::BallotReceived {
                judge: judge.to_owned(),
                received: room.ballots.len(),
                expected: room.players.len(),
            },
        )
    }

    /// `roundAdvanced` once the whole room moved to the next round.
    pub fn round_advanced(room: &Room) -> Self {
        let current_round = room.lowest_active_round();
        Self::new(
            room,
            RoomEventKind::RoundAdvanced {
                players: player_summaries(room),
                current_round,
                letter: current_round
                    .and_then(|round| room.letter(round))
                    .map(String::from),
            },
        )
    }

    /// `gameStarted`, stamped with the revision the sender read.
    pub fn game_started(room: &Room) -> Self {
        Self::new(room, RoomEventKind::GameStarted)
    }

    /// `gameOver` with the final standings.
    pub fn game_over(room: &Room) -> Self {
        Self::new(
            room,
            RoomEventKind::GameOver {
                players: room
                    .standings()
                    .into_iter()
                    .map(PlayerSummary::from)
                    .collect(),
            },
        )
    }
}
