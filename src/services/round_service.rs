use tracing::info;

use crate::{
    config::ScoringPolicy,
    dto::room::{
        AckResponse, PointsStatus, ResultsResponse, RoundAnswersEntry, RoundStatusResponse,
        SubmitAnswersRequest, SubmitPointsRequest, SubmitPointsResponse, round_answers,
    },
    error::ServiceError,
    services::room_events,
    state::{
        SharedState,
        room::RoomPin,
        round_machine::{ROUND_COUNT, is_valid_round},
        scoring::{PointsTable, average_ballots},
        transitions::{load_room, mutate_room},
    },
};

enum PointsOutcome {
    Finalized { ballots: usize },
    Pending { ballots: usize },
}

fn require_round(round: u8) -> Result<(), ServiceError> {
    if is_valid_round(round) {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "round must be between 1 and {ROUND_COUNT}, got {round}"
        )))
    }
}

/// Store a player's sheet for `round`.
pub async fn submit_answers(
    state: &SharedState,
    pin: RoomPin,
    round: u8,
    request: SubmitAnswersRequest,
) -> Result<AckResponse, ServiceError> {
    let nickname = request.nickname.trim().to_owned();
    let sheet = request.sheet()?;
    let advance = state.config().policy().advance;

    let (outcome, room) = mutate_room(state, pin, |room| {
        room.submit_answers(&nickname, round, sheet, advance)
    })
    .await?;

    info!(
        pin = %pin,
        nickname = %nickname,
        round,
        revision = room.revision,
        advanced = outcome.advanced,
        "answers submitted"
    );
    room_events::broadcast_answers_updated(state, &room, outcome.advanced);
    Ok(AckResponse::new(
        format!("answers for round {round} recorded"),
        room.revision,
    ))
}

/// Submit the points of `round`, or one ballot under peer scoring.
pub async fn submit_points(
    state: &SharedState,
    pin: RoomPin,
    round: u8,
    request: SubmitPointsRequest,
) -> Result<SubmitPointsResponse, ServiceError> {
    let policy = state.config().policy();
    let judge = request
        .judge
        .as_deref()
        .map(str::trim)
        .filter(|judge| !judge.is_empty())
        .map(str::to_owned);
    if policy.scoring == ScoringPolicy::PeerAverage && judge.is_none() {
        return Err(ServiceError::InvalidInput(
            "a judge is required when points are peer averaged".into(),
        ));
    }

    let (outcome, room) = mutate_room(state, pin, |room| {
        room.check_scorable(round, policy.advance)?;
        let table = PointsTable::from_raw(
            &request.points,
            |nickname| room.players.contains_key(nickname),
            policy.max_points,
        )?;

        let judge = match (policy.scoring, judge.as_deref()) {
            (ScoringPolicy::PeerAverage, Some(judge)) => judge,
            _ => {
                room.finalize_round(round, table, policy.advance)?;
                return Ok(PointsOutcome::Finalized { ballots: 1 });
            }
        };

        let ballots = room.record_ballot(judge, table)?;
        if !room.ballots_complete() {
            return Ok(PointsOutcome::Pending { ballots });
        }
        let averaged = average_ballots(
            room.ballots.values(),
            room.players.keys().map(String::as_str),
        );
        room.finalize_round(round, averaged, policy.advance)?;
        Ok(PointsOutcome::Finalized { ballots })
    })
    .await?;

    let ballots_expected = match policy.scoring {
        ScoringPolicy::SingleJudge => 1,
        ScoringPolicy::PeerAverage => room.players.len(),
    };
    let (status, ballots_received) = match outcome {
        PointsOutcome::Finalized { ballots } => {
            info!(
                pin = %pin,
                round,
                revision = room.revision,
                game_over = room.is_finished(),
                "round scored"
            );
            room_events::broadcast_round_scored(state, &room);
            (PointsStatus::Finalized, ballots)
        }
        PointsOutcome::Pending { ballots } => {
            let judge = judge.unwrap_or_default();
            info!(
                pin = %pin,
                round,
                nickname = %judge,
                revision = room.revision,
                ballots,
                "ballot recorded"
            );
            room_events::broadcast_ballot_received(state, &room, &judge);
            (PointsStatus::Pending, ballots)
        }
    };

    Ok(SubmitPointsResponse {
        status,
        ballots_received,
        ballots_expected,
        game_over: room.is_finished(),
        revision: room.revision,
    })
}

/// Whether everyone still in `round` has answered.
pub async fn round_status(
    state: &SharedState,
    pin: RoomPin,
    round: u8,
) -> Result<RoundStatusResponse, ServiceError> {
    require_round(round)?;
    let room = load_room(state, pin).await?;
    Ok(RoundStatusResponse {
        round,
        all_submitted: room.all_submitted(round),
        pending: room
            .pending_players(round)
            .into_iter()
            .map(str::to_owned)
            .collect(),
    })
}

/// Sheets submitted for `round`.
pub async fn get_round_answers(
    state: &SharedState,
    pin: RoomPin,
    round: u8,
) -> Result<Vec<RoundAnswersEntry>, ServiceError> {
    require_round(round)?;
    let room = load_room(state, pin).await?;
    Ok(round_answers(&room, round))
}

/// Standings and finalized rounds.
pub async fn get_results(state: &SharedState, pin: RoomPin) -> Result<ResultsResponse, ServiceError> {
    let room = load_room(state, pin).await?;
    Ok(ResultsResponse::from(&room))
}
