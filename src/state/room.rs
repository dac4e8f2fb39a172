//! In-memory room model and the rules that mutate it.
//!
//! A [`Room`] is read from the store, mutated by one of the methods below and
//! written back with a revision check. None of these methods touch the store
//! or publish events; the services do that around them.

use std::{fmt, time::SystemTime};

use indexmap::IndexMap;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    dao::models::{
        AwardEntity, BallotEntity, PlayerEntity, PlayerPhaseEntity, RoomEntity, RoundResultEntity,
    },
    error::ServiceError,
    state::{
        round_machine::{
            FIRST_ROUND, PlayerPhase, ROUND_COUNT, RoundEvent, is_valid_round, round_slot,
        },
        scoring::PointsTable,
    },
};

/// Letters a round can be played with.
pub const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Longest accepted nickname, in characters.
pub const MAX_NICKNAME_LEN: usize = 32;

/// One answer per category.
pub type AnswerSheet = [String; ROUND_COUNT];

/// Room identifier, a positive integer that fits in 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomPin(u32);

impl RoomPin {
    /// Numeric value of the PIN.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for RoomPin {
    type Error = ServiceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u32::try_from(value) {
            Ok(pin) if pin > 0 => Ok(Self(pin)),
            _ => Err(ServiceError::InvalidInput(format!(
                "PIN must be a positive integer up to {}, got {value}",
                u32::MAX
            ))),
        }
    }
}

impl TryFrom<u32> for RoomPin {
    type Error = ServiceError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

/// PIN as sent by clients: a JSON number or a numeric string.
impl TryFrom<&Value> for RoomPin {
    type Error = ServiceError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let parsed = match value {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        match parsed {
            Some(pin) => Self::try_from(pin),
            None => Err(ServiceError::InvalidInput(format!(
                "PIN must be a number or a numeric string, got {value}"
            ))),
        }
    }
}

impl fmt::Display for RoomPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A participant of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Nickname, unique in the room.
    pub nickname: String,
    /// Round progression.
    pub phase: PlayerPhase,
    /// Answer sheets indexed by round - 1.
    pub answers: [Option<AnswerSheet>; ROUND_COUNT],
    /// Points indexed by round - 1.
    pub points: [Option<u8>; ROUND_COUNT],
    /// Sum of finalized round points.
    pub overall_points: u32,
    /// When the player joined.
    pub joined_at: SystemTime,
}

impl Player {
    fn new(nickname: String, joined_at: SystemTime) -> Self {
        Self {
            nickname,
            phase: PlayerPhase::default(),
            answers: Default::default(),
            points: [None; ROUND_COUNT],
            overall_points: 0,
            joined_at,
        }
    }

    /// Round the player is in, `None` once finished.
    pub fn current_round(&self) -> Option<u8> {
        self.phase.current_round()
    }

    /// True once the player's sheet for the current round is in.
    pub fn has_submitted(&self) -> bool {
        self.phase.has_submitted()
    }

    /// True after the last round.
    pub fn is_finished(&self) -> bool {
        self.phase == PlayerPhase::Finished
    }

    /// Sheet submitted for `round`.
    pub fn answers_for(&self, round: u8) -> Option<&AnswerSheet> {
        self.answers.get(round_slot(round)).and_then(Option::as_ref)
    }

    /// Points awarded for `round`.
    pub fn points_for(&self, round: u8) -> Option<u8> {
        self.points.get(round_slot(round)).copied().flatten()
    }

    fn in_round(&self, round: u8) -> bool {
        self.current_round() == Some(round)
    }
}

/// Points awarded when a round was finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    /// Round number (1-based).
    pub round: u8,
    /// Letter the round was played with.
    pub letter: char,
    /// Points per nickname.
    pub points: PointsTable,
}

/// How players leave a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// The round closes when its points are submitted.
    #[default]
    Judge,
    /// The round closes as soon as every player in it has answered.
    Auto,
}

/// Shared room state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Room identifier.
    pub pin: RoomPin,
    /// Shared secret required to join.
    pub password: String,
    /// Category labels answered every round.
    pub categories: [String; ROUND_COUNT],
    /// Players keyed by nickname, in join order.
    pub players: IndexMap<String, Player>,
    /// One distinct letter per round.
    pub letters: [char; ROUND_COUNT],
    /// Finalized rounds, in order.
    pub round_results: Vec<RoundResult>,
    /// Peer ballots for the next unscored round, keyed by judge.
    pub ballots: IndexMap<String, PointsTable>,
    /// Creation time.
    pub created_at: SystemTime,
    /// Time of the last committed change.
    pub updated_at: SystemTime,
    /// Revision of the stored record this room was read from.
    pub revision: u64,
}

/// Outcome of a successful answer submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Every player of the round advanced in the same write.
    pub advanced: bool,
}

/// Draw one distinct letter per round, retrying on duplicates.
pub fn draw_round_letters<R: Rng>(rng: &mut R) -> [char; ROUND_COUNT] {
    let mut letters = ['A'; ROUND_COUNT];
    let mut drawn = 0;
    while drawn < ROUND_COUNT {
        let letter = char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]);
        if letters[..drawn].contains(&letter) {
            continue;
        }
        letters[drawn] = letter;
        drawn += 1;
    }
    letters
}

/// Trim a nickname and check its length.
pub fn normalize_nickname(raw: &str) -> Result<String, ServiceError> {
    let nickname = raw.trim();
    let len = nickname.chars().count();
    if len == 0 || len > MAX_NICKNAME_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "nickname must be between 1 and {MAX_NICKNAME_LEN} characters"
        )));
    }
    Ok(nickname.to_owned())
}

/// Check and normalize the five category labels of a new room.
pub fn normalize_categories(raw: &[String]) -> Result<[String; ROUND_COUNT], ServiceError> {
    let trimmed: Vec<String> = raw.iter().map(|label| label.trim().to_owned()).collect();
    let categories: [String; ROUND_COUNT] = trimmed.try_into().map_err(|labels: Vec<String>| {
        ServiceError::InvalidInput(format!(
            "exactly {ROUND_COUNT} categories are required, got {}",
            labels.len()
        ))
    })?;

    for (index, label) in categories.iter().enumerate() {
        if label.is_empty() {
            return Err(ServiceError::InvalidInput(
                "category labels must not be blank".into(),
            ));
        }
        if categories[..index]
            .iter()
            .any(|other| other.eq_ignore_ascii_case(label))
        {
            return Err(ServiceError::InvalidInput(format!(
                "category `{label}` is listed twice"
            )));
        }
    }
    Ok(categories)
}

fn check_round(round: u8) -> Result<(), ServiceError> {
    if is_valid_round(round) {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "round must be between {FIRST_ROUND} and {ROUND_COUNT}, got {round}"
        )))
    }
}

impl Room {
    /// Build a fresh room whose only player is its owner.
    pub fn new(
        pin: RoomPin,
        owner: String,
        password: String,
        categories: [String; ROUND_COUNT],
        letters: [char; ROUND_COUNT],
        now: SystemTime,
    ) -> Self {
        let mut players = IndexMap::new();
        players.insert(owner.clone(), Player::new(owner, now));
        Self {
            pin,
            password,
            categories,
            players,
            letters,
            round_results: Vec::new(),
            ballots: IndexMap::new(),
            created_at: now,
            updated_at: now,
            revision: 1,
        }
    }

    /// Nickname of the first player to join.
    pub fn owner(&self) -> Option<&str> {
        self.players.keys().next().map(String::as_str)
    }

    /// Look a player up by nickname.
    pub fn player(&self, nickname: &str) -> Result<&Player, ServiceError> {
        self.players.get(nickname).ok_or_else(|| {
            ServiceError::NotFound(format!("player `{nickname}` is not in room {}", self.pin))
        })
    }

    fn player_mut(&mut self, nickname: &str) -> Result<&mut Player, ServiceError> {
        let pin = self.pin;
        self.players
            .get_mut(nickname)
            .ok_or_else(|| ServiceError::NotFound(format!("player `{nickname}` is not in room {pin}")))
    }

    /// Letter of `round`.
    pub fn letter(&self, round: u8) -> Option<char> {
        is_valid_round(round).then(|| self.letters[round_slot(round)])
    }

    /// True once a player moved past round one or any round was scored.
    pub fn has_progressed(&self) -> bool {
        !self.round_results.is_empty()
            || self
                .players
                .values()
                .any(|player| player.current_round().is_none_or(|round| round > FIRST_ROUND))
    }

    /// True once every round has been scored.
    pub fn is_finished(&self) -> bool {
        self.round_results.len() >= ROUND_COUNT
    }

    /// Lowest round any player is still in.
    pub fn lowest_active_round(&self) -> Option<u8> {
        self.players
            .values()
            .filter_map(Player::current_round)
            .min()
    }

    /// Round that the next points submission must target.
    pub fn next_unscored_round(&self) -> u8 {
        u8::try_from(self.round_results.len())
            .unwrap_or(u8::MAX)
            .saturating_add(FIRST_ROUND)
    }

    /// Add a player to a room that has not started yet.
    pub fn join(
        &mut self,
        nickname: String,
        password: &str,
        now: SystemTime,
    ) -> Result<(), ServiceError> {
        if self.password != password {
            return Err(ServiceError::Unauthorized("wrong room password".into()));
        }
        if self.players.contains_key(&nickname) {
            return Err(ServiceError::Conflict(format!(
                "nickname `{nickname}` is already taken"
            )));
        }
        if self.has_progressed() {
            return Err(ServiceError::Conflict(format!(
                "room {} has already progressed past round {FIRST_ROUND}",
                self.pin
            )));
        }
        self.players
            .insert(nickname.clone(), Player::new(nickname, now));
        Ok(())
    }

    /// Store `nickname`'s sheet for `round`.
    ///
    /// Under [`AdvancePolicy::Auto`] the last sheet of a round moves every
    /// player of that round to the next one.
    pub fn submit_answers(
        &mut self,
        nickname: &str,
        round: u8,
        sheet: AnswerSheet,
        policy: AdvancePolicy,
    ) -> Result<SubmitOutcome, ServiceError> {
        check_round(round)?;
        let player = self.player_mut(nickname)?;
        if player.current_round() != Some(round) {
            return Err(ServiceError::InvalidRound(format!(
                "`{nickname}` is in round {}, not {round}",
                player
                    .current_round()
                    .map_or_else(|| "none (finished)".to_owned(), |r| r.to_string())
            )));
        }
        player.phase.apply(RoundEvent::SubmitAnswers { round })?;
        player.answers[round_slot(round)] = Some(sheet);

        let advanced = policy == AdvancePolicy::Auto && self.all_submitted(round);
        if advanced {
            for player in self.players.values_mut().filter(|p| p.in_round(round)) {
                player.phase.apply(RoundEvent::Advance)?;
            }
        }
        Ok(SubmitOutcome { advanced })
    }

    /// True when every player still in `round` has submitted.
    pub fn all_submitted(&self, round: u8) -> bool {
        self.players
            .values()
            .filter(|player| player.in_round(round))
            .all(Player::has_submitted)
    }

    /// Players in `round` that have not submitted yet.
    pub fn pending_players(&self, round: u8) -> Vec<&str> {
        self.players
            .values()
            .filter(|player| player.in_round(round) && !player.has_submitted())
            .map(|player| player.nickname.as_str())
            .collect()
    }

    /// Check that points may be submitted for `round`.
    pub fn check_scorable(&self, round: u8, policy: AdvancePolicy) -> Result<(), ServiceError> {
        check_round(round)?;
        if self.round_results.iter().any(|result| result.round == round) {
            return Err(ServiceError::Conflict(format!(
                "round {round} has already been scored"
            )));
        }
        let next = self.next_unscored_round();
        if round != next {
            return Err(ServiceError::InvalidRound(format!(
                "round {next} must be scored before round {round}"
            )));
        }
        if policy == AdvancePolicy::Auto {
            let pending = self.pending_players(round);
            if !pending.is_empty() {
                return Err(ServiceError::Conflict(format!(
                    "round {round} is still waiting for {}",
                    pending.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Record `judge`'s ballot for the next unscored round.
    ///
    /// Returns the number of ballots collected so far.
    pub fn record_ballot(
        &mut self,
        judge: &str,
        ballot: PointsTable,
    ) -> Result<usize, ServiceError> {
        if !self.players.contains_key(judge) {
            return Err(ServiceError::InvalidInput(format!(
                "judge `{judge}` is not a player of this room"
            )));
        }
        if self.ballots.contains_key(judge) {
            return Err(ServiceError::Conflict(format!(
                "`{judge}` has already submitted a ballot for round {}",
                self.next_unscored_round()
            )));
        }
        self.ballots.insert(judge.to_owned(), ballot);
        Ok(self.ballots.len())
    }

    /// True once every player has submitted a ballot.
    pub fn ballots_complete(&self) -> bool {
        self.ballots.len() >= self.players.len()
    }

    /// Commit `table` as the result of `round`.
    ///
    /// Under [`AdvancePolicy::Judge`] this also closes the round: players who
    /// did not answer forfeit with a blank sheet, then everyone in the round
    /// is scored and advances.
    pub fn finalize_round(
        &mut self,
        round: u8,
        table: PointsTable,
        policy: AdvancePolicy,
    ) -> Result<(), ServiceError> {
        let slot = round_slot(round);
        for (nickname, points) in table.iter() {
            let player = self.player_mut(nickname)?;
            player.points[slot] = Some(points);
            player.overall_points += u32::from(points);
        }

        if policy == AdvancePolicy::Judge {
            for player in self.players.values_mut().filter(|p| p.in_round(round)) {
                if !player.has_submitted() {
                    player.phase.apply(RoundEvent::Forfeit { round })?;
                    player.answers[slot] = Some(Default::default());
                }
                player.phase.apply(RoundEvent::Score { round })?;
                player.phase.apply(RoundEvent::Advance)?;
            }
        }

        self.round_results.push(RoundResult {
            round,
            letter: self.letters[slot],
            points: table,
        });
        self.ballots.clear();
        Ok(())
    }

    /// Players sorted by overall points, highest first; ties keep join order.
    pub fn standings(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by(|a, b| b.overall_points.cmp(&a.overall_points));
        players
    }
}

impl From<PlayerPhase> for PlayerPhaseEntity {
    fn from(phase: PlayerPhase) -> Self {
        match phase {
            PlayerPhase::AwaitingAnswer(round) => PlayerPhaseEntity::AwaitingAnswer(round),
            PlayerPhase::Submitted(round) => PlayerPhaseEntity::Submitted(round),
            PlayerPhase::Scored(round) => PlayerPhaseEntity::Scored(round),
            PlayerPhase::Finished => PlayerPhaseEntity::Finished,
        }
    }
}

impl TryFrom<PlayerPhaseEntity> for PlayerPhase {
    type Error = ServiceError;

    fn try_from(phase: PlayerPhaseEntity) -> Result<Self, Self::Error> {
        let (phase, round) = match phase {
            PlayerPhaseEntity::AwaitingAnswer(round) => (PlayerPhase::AwaitingAnswer(round), round),
            PlayerPhaseEntity::Submitted(round) => (PlayerPhase::Submitted(round), round),
            PlayerPhaseEntity::Scored(round) => (PlayerPhase::Scored(round), round),
            PlayerPhaseEntity::Finished => return Ok(PlayerPhase::Finished),
        };
        if is_valid_round(round) {
            Ok(phase)
        } else {
            Err(ServiceError::CorruptRecord(format!(
                "player phase references round {round}"
            )))
        }
    }
}

fn awards(table: &PointsTable) -> Vec<AwardEntity> {
    table
        .iter()
        .map(|(nickname, points)| AwardEntity {
            nickname: nickname.to_owned(),
            points,
        })
        .collect()
}

fn table_from_awards(awards: Vec<AwardEntity>) -> PointsTable {
    awards
        .into_iter()
        .map(|award| (award.nickname, award.points))
        .collect()
}

fn corrupt(pin: u32, what: impl fmt::Display) -> ServiceError {
    ServiceError::CorruptRecord(format!("room {pin}: {what}"))
}

impl From<&Player> for PlayerEntity {
    fn from(player: &Player) -> Self {
        Self {
            nickname: player.nickname.clone(),
            phase: player.phase.into(),
            answers: player
                .answers
                .iter()
                .map(|sheet| sheet.as_ref().map(|sheet| sheet.to_vec()))
                .collect(),
            points: player.points.to_vec(),
            overall_points: player.overall_points,
            joined_at: player.joined_at,
        }
    }
}

impl From<&Room> for RoomEntity {
    fn from(room: &Room) -> Self {
        Self {
            pin: room.pin.get(),
            password: room.password.clone(),
            categories: room.categories.to_vec(),
            players: room.players.values().map(PlayerEntity::from).collect(),
            round_letters: room.letters.iter().collect(),
            round_results: room
                .round_results
                .iter()
                .map(|result| RoundResultEntity {
                    round: result.round,
                    letter: result.letter.to_string(),
                    points: awards(&result.points),
                })
                .collect(),
            ballots: room
                .ballots
                .iter()
                .map(|(judge, table)| BallotEntity {
                    judge: judge.clone(),
                    points: awards(table),
                })
                .collect(),
            created_at: room.created_at,
            updated_at: room.updated_at,
            revision: room.revision,
        }
    }
}

fn player_from_entity(pin: u32, entity: PlayerEntity) -> Result<Player, ServiceError> {
    let mut answers: [Option<AnswerSheet>; ROUND_COUNT] = Default::default();
    if entity.answers.len() > ROUND_COUNT {
        return Err(corrupt(pin, "too many answer sheets"));
    }
    for (slot, sheet) in entity.answers.into_iter().enumerate() {
        answers[slot] = sheet
            .map(|sheet| {
                AnswerSheet::try_from(sheet)
                    .map_err(|_| corrupt(pin, format!("bad answer sheet for `{}`", entity.nickname)))
            })
            .transpose()?;
    }

    let mut points = [None; ROUND_COUNT];
    if entity.points.len() > ROUND_COUNT {
        return Err(corrupt(pin, "too many round scores"));
    }
    points[..entity.points.len()].copy_from_slice(&entity.points);

    Ok(Player {
        phase: entity.phase.try_into()?,
        nickname: entity.nickname,
        answers,
        points,
        overall_points: entity.overall_points,
        joined_at: entity.joined_at,
    })
}

impl TryFrom<RoomEntity> for Room {
    type Error = ServiceError;

    fn try_from(entity: RoomEntity) -> Result<Self, Self::Error> {
        let raw_pin = entity.pin;
        let pin = RoomPin::try_from(raw_pin).map_err(|_| corrupt(raw_pin, "invalid PIN"))?;

        let categories: [String; ROUND_COUNT] = entity
            .categories
            .try_into()
            .map_err(|_| corrupt(raw_pin, "category count"))?;

        let letters: Vec<char> = entity.round_letters.chars().collect();
        let letters: [char; ROUND_COUNT] = letters
            .try_into()
            .map_err(|_| corrupt(raw_pin, "round letter count"))?;

        let mut players = IndexMap::with_capacity(entity.players.len());
        for player in entity.players {
            let player = player_from_entity(raw_pin, player)?;
            players.insert(player.nickname.clone(), player);
        }

        let mut round_results = Vec::with_capacity(entity.round_results.len());
        for result in entity.round_results {
            let letter = result
                .letter
                .chars()
                .next()
                .ok_or_else(|| corrupt(raw_pin, format!("round {} has no letter", result.round)))?;
            round_results.push(RoundResult {
                round: result.round,
                letter,
                points: table_from_awards(result.points),
            });
        }

        let ballots = entity
            .ballots
            .into_iter()
            .map(|ballot| (ballot.judge, table_from_awards(ballot.points)))
            .collect();

        Ok(Self {
            pin,
            password: entity.password,
            categories,
            players,
            letters,
            round_results,
            ballots,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            revision: entity.revision,
        })
    }
}
