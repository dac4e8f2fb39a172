use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    BallotEntity, PlayerEntity, PlayerPhaseEntity, RoomEntity, RoomListItemEntity,
    RoundResultEntity,
};

/// Room document keyed by PIN. Integers are stored as BSON int64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    pub pin: i64,
    password: String,
    categories: Vec<String>,
    players: Vec<MongoPlayerDocument>,
    round_letters: String,
    round_results: Vec<RoundResultEntity>,
    #[serde(default)]
    ballots: Vec<BallotEntity>,
    created_at: DateTime,
    updated_at: DateTime,
    pub revision: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    nickname: String,
    phase: PlayerPhaseEntity,
    answers: Vec<Option<Vec<String>>>,
    points: Vec<Option<u8>>,
    overall_points: i64,
    joined_at: DateTime,
}

/// Projection used by room listings.
#[derive(Debug, Clone, Deserialize)]
pub struct MongoRoomSummary {
    #[serde(rename = "_id")]
    pin: i64,
    player_count: i64,
    created_at: DateTime,
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(value: PlayerEntity) -> Self {
        Self {
            nickname: value.nickname,
            phase: value.phase,
            answers: value.answers,
            points: value.points,
            overall_points: i64::from(value.overall_points),
            joined_at: DateTime::from_system_time(value.joined_at),
        }
    }
}

impl From<RoomEntity> for MongoRoomDocument {
    fn from(value: RoomEntity) -> Self {
        Self {
            pin: i64::from(value.pin),
            password: value.password,
            categories: value.categories,
            players: value.players.into_iter().map(Into::into).collect(),
            round_letters: value.round_letters,
            round_results: value.round_results,
            ballots: value.ballots,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            revision: i64::try_from(value.revision).unwrap_or(i64::MAX),
        }
    }
}

fn invalid(id: i64, reason: &'static str) -> MongoDaoError {
    MongoDaoError::InvalidDocument { id, reason }
}

impl TryFrom<MongoRoomDocument> for RoomEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRoomDocument) -> MongoResult<Self> {
        let id = value.pin;
        let pin = u32::try_from(id).map_err(|_| invalid(id, "PIN out of range"))?;
        let revision =
            u64::try_from(value.revision).map_err(|_| invalid(id, "negative revision"))?;

        let players = value
            .players
            .into_iter()
            .map(|player| {
                Ok(PlayerEntity {
                    nickname: player.nickname,
                    phase: player.phase,
                    answers: player.answers,
                    points: player.points,
                    overall_points: u32::try_from(player.overall_points)
                        .map_err(|_| invalid(id, "overall points out of range"))?,
                    joined_at: player.joined_at.to_system_time(),
                })
            })
            .collect::<MongoResult<Vec<_>>>()?;

        Ok(Self {
            pin,
            password: value.password,
            categories: value.categories,
            players,
            round_letters: value.round_letters,
            round_results: value.round_results,
            ballots: value.ballots,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            revision,
        })
    }
}

impl TryFrom<MongoRoomSummary> for RoomListItemEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRoomSummary) -> MongoResult<Self> {
        Ok(Self {
            pin: u32::try_from(value.pin).map_err(|_| invalid(value.pin, "PIN out of range"))?,
            player_count: usize::try_from(value.player_count).unwrap_or_default(),
            created_at: value.created_at.to_system_time(),
        })
    }
}

pub fn doc_id(pin: u32) -> Document {
    doc! {"_id": i64::from(pin)}
}

/// Filter matching the room only while it is still at `revision`.
pub fn revision_filter(pin: u32, revision: u64) -> Document {
    doc! {
        "_id": i64::from(pin),
        "revision": i64::try_from(revision).unwrap_or(i64::MAX),
    }
}

/// Projection turning a room document into a [`MongoRoomSummary`].
pub fn summary_projection() -> Document {
    doc! {
        "_id": 1,
        "created_at": 1,
        "player_count": { "$size": "$players" },
    }
}
