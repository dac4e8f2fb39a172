use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::RoomListItemEntity,
    dto::{
        format_system_time,
        validation::{validate_distinct_labels, validate_not_blank},
    },
    error::ServiceError,
    state::{
        room::{Player, Room, RoundResult},
        round_machine::ROUND_COUNT,
    },
};

/// Upper bound on nickname length checked by the request validators.
const NICKNAME_MAX_LEN: u64 = 32;

/// Payload used to open a new room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    /// Room PIN, as a number or a numeric string. Checked when the room is
    /// created so malformed values are reported like any other bad input.
    #[schema(value_type = u32, minimum = 1)]
    pub pin: Value,
    /// Nickname of the creator, who becomes the owner.
    #[validate(length(min = 1, max = NICKNAME_MAX_LEN), custom(function = "validate_not_blank"))]
    pub nickname: String,
    /// Password other players need to join.
    #[validate(custom(function = "validate_not_blank"))]
    pub password: String,
    /// When present, must equal `password`.
    #[serde(default)]
    pub confirm_password: Option<String>,
    /// Exactly five distinct category labels.
    #[validate(length(equal = 5), custom(function = "validate_distinct_labels"))]
    pub categories: Vec<String>,
}

/// Payload used to enter an existing room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    /// Nickname, unique within the room.
    #[validate(length(min = 1, max = NICKNAME_MAX_LEN), custom(function = "validate_not_blank"))]
    pub nickname: String,
    /// Room password.
    pub password: String,
}

/// Optional player the room view is computed for.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoomViewQuery {
    /// Player whose current round is reported.
    pub nickname: Option<String>,
}

/// Payload of the start signal.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartGameRequest {
    /// Player sending the signal; required when only the owner may start.
    #[serde(default)]
    pub nickname: Option<String>,
}

/// One answer sheet for a round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswersRequest {
    /// Player the sheet belongs to.
    #[validate(length(min = 1, max = NICKNAME_MAX_LEN))]
    pub nickname: String,
    /// One answer per category, in category order.
    #[validate(length(equal = 5))]
    pub answers: Vec<String>,
}

/// Points for a round, or one ballot under peer scoring.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitPointsRequest {
    /// Player casting the ballot; required under peer scoring.
    #[serde(default)]
    pub judge: Option<String>,
    /// Nickname to integer points in `0..=100`.
    #[schema(value_type = Object)]
    pub points: IndexMap<String, Value>,
}

/// Response returned after a room is created.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomPinResponse {
    /// PIN of the created room.
    pub pin: u32,
}

/// Acknowledgement of a committed write.
#[derive(Debug, Serialize, ToSchema)]
pub struct AckResponse {
    /// Human readable summary.
    pub message: String,
    /// Room revision after the write.
    pub revision: u64,
}

impl AckResponse {
    /// Acknowledge a write that left the room at `revision`.
    pub fn new(message: impl Into<String>, revision: u64) -> Self {
        Self {
            message: message.into(),
            revision,
        }
    }
}

/// Whether a points submission closed the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PointsStatus {
    /// The round result was committed.
    Finalized,
    /// The ballot was recorded; more are expected.
    Pending,
}

/// Outcome of a points submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitPointsResponse {
    /// Whether the round closed.
    pub status: PointsStatus,
    /// Ballots recorded for the round, this one included.
    pub ballots_received: usize,
    /// Ballots needed to close the round.
    pub ballots_expected: usize,
    /// The fifth round was just scored.
    pub game_over: bool,
    /// Room revision after the write.
    pub revision: u64,
}

/// Public projection of a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Player nickname.
    pub nickname: String,
    /// `null` once the player has finished every round.
    pub current_round: Option<u8>,
    /// Sheet for the current round already recorded.
    pub has_submitted: bool,
    /// Every round played and scored.
    pub finished: bool,
    /// Sum of the points of every scored round.
    pub overall_points: u32,
    /// Points per round; `null` for rounds not scored yet.
    pub points: Vec<Option<u8>>,
}

/// Room state as seen by one player (or the room as a whole).
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomView {
    /// Room PIN.
    pub pin: u32,
    /// First player to join.
    pub owner: Option<String>,
    /// Every player, in join order.
    pub players: Vec<PlayerSummary>,
    /// The five category labels.
    pub categories: Vec<String>,
    /// Round of the requested player, or the lowest active round.
    pub current_round: Option<u8>,
    /// Letter of `current_round`.
    pub letter: Option<String>,
    /// All five rounds are scored.
    pub finished: bool,
    /// Revision the view was read at.
    pub revision: u64,
    /// Creation time, RFC 3339.
    pub created_at: String,
}

/// A player's sheet for one round.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundAnswersEntry {
    /// Player the sheet belongs to.
    pub nickname: String,
    /// One answer per category.
    pub answers: Vec<String>,
    /// Points awarded once the round is scored.
    pub points: Option<u8>,
}

/// Submission progress of a round.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundStatusResponse {
    /// Round queried.
    pub round: u8,
    /// Nobody in the round is still answering.
    pub all_submitted: bool,
    /// Players still expected to answer.
    pub pending: Vec<String>,
}

/// A finalized round.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundResultView {
    /// Round number.
    pub round: u8,
    /// Letter the round was played with.
    pub letter: String,
    /// Points per nickname.
    #[schema(value_type = Object)]
    pub points: IndexMap<String, u8>,
}

/// Final or intermediate standings of a room.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResultsResponse {
    /// Room PIN.
    pub pin: u32,
    /// Players sorted by overall points, highest first.
    pub standings: Vec<PlayerSummary>,
    /// Scored rounds in order.
    pub rounds: Vec<RoundResultView>,
    /// All five rounds are scored.
    pub finished: bool,
}

/// Room listing entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomListItem {
    /// Room PIN.
    pub pin: u32,
    /// Players in the room.
    pub player_count: usize,
    /// Creation time, RFC 3339.
    pub created_at: String,
}

/// Category catalog offered by the server.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoriesResponse {
    /// Category labels.
    pub categories: Vec<String>,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            nickname: player.nickname.clone(),
            current_round: player.current_round(),
            has_submitted: player.has_submitted(),
            finished: player.is_finished(),
            overall_points: player.overall_points,
            points: player.points.to_vec(),
        }
    }
}

/// Summaries of every player in join order.
pub fn player_summaries(room: &Room) -> Vec<PlayerSummary> {
    room.players.values().map(PlayerSummary::from).collect()
}

impl RoomView {
    /// Build the view for `nickname`, or for the room's lowest active round.
    pub fn build(room: &Room, nickname: Option<&str>) -> Result<Self, ServiceError> {
        let current_round = match nickname {
            Some(nickname) => room.player(nickname)?.current_round(),
            None => room.lowest_active_round(),
        };
        Ok(Self {
            pin: room.pin.get(),
            owner: room.owner().map(str::to_owned),
            players: player_summaries(room),
            categories: room.categories.to_vec(),
            current_round,
            letter: current_round
                .and_then(|round| room.letter(round))
                .map(String::from),
            finished: room.is_finished(),
            revision: room.revision,
            created_at: format_system_time(room.created_at),
        })
    }
}

impl From<&RoundResult> for RoundResultView {
    fn from(result: &RoundResult) -> Self {
        Self {
            round: result.round,
            letter: result.letter.to_string(),
            points: result.points.as_map().clone(),
        }
    }
}

impl From<&Room> for ResultsResponse {
    fn from(room: &Room) -> Self {
        Self {
            pin: room.pin.get(),
            standings: room
                .standings()
                .into_iter()
                .map(PlayerSummary::from)
                .collect(),
            rounds: room.round_results.iter().map(Into::into).collect(),
            finished: room.is_finished(),
        }
    }
}

/// Sheets submitted for `round`, in join order.
pub fn round_answers(room: &Room, round: u8) -> Vec<RoundAnswersEntry> {
    room.players
        .values()
        .filter_map(|player| {
            player.answers_for(round).map(|sheet| RoundAnswersEntry {
                nickname: player.nickname.clone(),
                answers: sheet.to_vec(),
                points: player.points_for(round),
            })
        })
        .collect()
}

impl From<RoomListItemEntity> for RoomListItem {
    fn from(entity: RoomListItemEntity) -> Self {
        Self {
            pin: entity.pin,
            player_count: entity.player_count,
            created_at: format_system_time(entity.created_at),
        }
    }
}

impl SubmitAnswersRequest {
    /// Answers as a fixed-size sheet, trimmed.
    pub fn sheet(&self) -> Result<[String; ROUND_COUNT], ServiceError> {
        let answers: Vec<String> = self
            .answers
            .iter()
            .map(|answer| answer.trim().to_owned())
            .collect();
        answers.try_into().map_err(|answers: Vec<String>| {
            ServiceError::InvalidInput(format!(
                "exactly {ROUND_COUNT} answers are required, got {}",
                answers.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::room::MAX_NICKNAME_LEN;
    use serde_json::json;

    fn create_payload(pin: Value) -> Value {
        json!({
            "pin": pin,
            "nickname": "alice",
            "password": "secret",
            "categories": ["Animal", "City", "Food", "Movie", "Name"],
        })
    }

    #[test]
    fn pin_is_kept_as_sent() {
        let from_number: CreateRoomRequest =
            serde_json::from_value(create_payload(json!(1234))).unwrap();
        let from_string: CreateRoomRequest =
            serde_json::from_value(create_payload(json!("12ab"))).unwrap();
        assert_eq!(from_number.pin, json!(1234));
        assert_eq!(from_string.pin, json!("12ab"));
        assert!(from_number.validate().is_ok());
    }

    #[test]
    fn nickname_bound_matches_the_room_rules() {
        assert_eq!(NICKNAME_MAX_LEN as usize, MAX_NICKNAME_LEN);

        let mut payload = create_payload(json!(1));
        payload["nickname"] = json!("x".repeat(MAX_NICKNAME_LEN + 1));
        let request: CreateRoomRequest = serde_json::from_value(payload).unwrap();
        assert!(request.validate().is_err());

        let request: JoinRoomRequest = serde_json::from_value(json!({
            "nickname": "x".repeat(MAX_NICKNAME_LEN),
            "password": "secret",
        }))
        .unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn create_request_validation() {
        let mut payload = create_payload(json!(1));
        payload["categories"] = json!(["Animal", "City"]);
        let request: CreateRoomRequest = serde_json::from_value(payload).unwrap();
        assert!(request.validate().is_err());

        let mut payload = create_payload(json!(1));
        payload["nickname"] = json!("   ");
        let request: CreateRoomRequest = serde_json::from_value(payload).unwrap();
        assert!(request.validate().is_err());

        let mut payload = create_payload(json!(1));
        payload["categories"] = json!(["Animal", "City", "Food", "Movie", "City"]);
        let request: CreateRoomRequest = serde_json::from_value(payload).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn answers_must_have_five_entries() {
        let request: SubmitAnswersRequest = serde_json::from_value(json!({
            "nickname": "alice",
            "answers": ["a", "b", "c", "d"],
        }))
        .unwrap();
        assert!(request.validate().is_err());
        assert!(request.sheet().is_err());

        let request: SubmitAnswersRequest = serde_json::from_value(json!({
            "nickname": "alice",
            "answers": [" a ", "b", "", "d", "e"],
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.sheet().unwrap()[0], "a");
    }
}
