use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Aggregate room entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Primary key of the room.
    pub pin: u32,
    /// Shared secret required to join.
    pub password: String,
    /// The five category labels answered every round.
    pub categories: Vec<String>,
    /// Players in join order; the first one owns the room.
    pub players: Vec<PlayerEntity>,
    /// One letter per round, stored as a five character string.
    pub round_letters: String,
    /// Finalized rounds, in order.
    pub round_results: Vec<RoundResultEntity>,
    /// Peer ballots collected for the next unscored round.
    #[serde(default)]
    pub ballots: Vec<BallotEntity>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the room entity was updated.
    pub updated_at: SystemTime,
    /// Write counter checked by compare-and-swap updates.
    pub revision: u64,
}

/// Player entry inside a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Nickname, unique in the room.
    pub nickname: String,
    /// Round progression of the player.
    pub phase: PlayerPhaseEntity,
    /// Answer sheets indexed by round - 1.
    pub answers: Vec<Option<Vec<String>>>,
    /// Points indexed by round - 1.
    pub points: Vec<Option<u8>>,
    /// Sum of finalized round points.
    pub overall_points: u32,
    /// When the player joined the room.
    pub joined_at: SystemTime,
}

/// Persisted form of a player's phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "round", rename_all = "snake_case")]
pub enum PlayerPhaseEntity {
    AwaitingAnswer(u8),
    Submitted(u8),
    Scored(u8),
    Finished,
}

/// Points awarded to one player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwardEntity {
    pub nickname: String,
    pub points: u8,
}

/// A finalized round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundResultEntity {
    /// Round number (1-based).
    pub round: u8,
    /// Letter the round was played with.
    pub letter: String,
    /// Points awarded in this round.
    pub points: Vec<AwardEntity>,
}

/// One player's ballot under peer scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BallotEntity {
    pub judge: String,
    pub points: Vec<AwardEntity>,
}

/// Room list item entity (subset of RoomEntity) returned by listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomListItemEntity {
    /// Primary key of the room.
    pub pin: u32,
    /// Number of players who joined.
    pub player_count: usize,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl From<&RoomEntity> for RoomListItemEntity {
    fn from(entity: &RoomEntity) -> Self {
        Self {
            pin: entity.pin,
            player_count: entity.players.len(),
            created_at: entity.created_at,
        }
    }
}
