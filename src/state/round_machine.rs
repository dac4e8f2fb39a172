//! Per-player round progression.
//!
//! Every player walks the same path through the five rounds of a room:
//! `AwaitingAnswer(r)` → `Submitted(r)` → `Scored(r)` → `AwaitingAnswer(r + 1)`
//! and finally [`PlayerPhase::Finished`] once the last round has been scored.
//! Under the automatic advance policy the `Scored` step is skipped: players
//! advance straight from `Submitted(r)` once the whole room has answered.

use thiserror::Error;

/// Number of rounds played in every room.
pub const ROUND_COUNT: usize = 5;
/// First round number (rounds are 1-based).
pub const FIRST_ROUND: u8 = 1;
/// Last round number.
pub const LAST_ROUND: u8 = ROUND_COUNT as u8;

/// Phase a single player is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    /// The player may submit an answer sheet for this round.
    AwaitingAnswer(u8),
    /// The player's sheet for this round is in; waiting for the judge phase.
    Submitted(u8),
    /// Points for this round have been committed; the player is about to advance.
    Scored(u8),
    /// All rounds have been scored.
    Finished,
}

/// Events that move a player through the round phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// The player submitted an answer sheet for `round`.
    SubmitAnswers {
        /// Round the sheet was submitted for.
        round: u8,
    },
    /// The judge closed `round` before the player answered; a blank sheet is recorded.
    Forfeit {
        /// Round being closed.
        round: u8,
    },
    /// Points for `round` were committed.
    Score {
        /// Round being scored.
        round: u8,
    },
    /// Leave the current round for the next one (or finish after the last).
    Advance,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the player was in when the event arrived.
    pub from: PlayerPhase,
    /// Rejected event.
    pub event: RoundEvent,
}

impl Default for PlayerPhase {
    fn default() -> Self {
        PlayerPhase::AwaitingAnswer(FIRST_ROUND)
    }
}

impl PlayerPhase {
    /// Round the player is currently active in, `None` once finished.
    pub fn current_round(&self) -> Option<u8> {
        match *self {
            PlayerPhase::AwaitingAnswer(round)
            | PlayerPhase::Submitted(round)
            | PlayerPhase::Scored(round) => Some(round),
            PlayerPhase::Finished => None,
        }
    }

    /// True between the player's submission and the advance that follows.
    pub fn has_submitted(&self) -> bool {
        matches!(self, PlayerPhase::Submitted(_) | PlayerPhase::Scored(_))
    }

    /// Apply `event`, returning the next phase without mutating `self`.
    pub fn next(&self, event: RoundEvent) -> Result<PlayerPhase, InvalidTransition> {
        let next = match (*self, event) {
            (PlayerPhase::AwaitingAnswer(current), RoundEvent::SubmitAnswers { round })
                if current == round =>
            {
                PlayerPhase::Submitted(current)
            }
            (PlayerPhase::AwaitingAnswer(current), RoundEvent::Forfeit { round })
                if current == round =>
            {
                PlayerPhase::Submitted(current)
            }
            (PlayerPhase::Submitted(current), RoundEvent::Score { round }) if current == round => {
                PlayerPhase::Scored(current)
            }
            (PlayerPhase::Submitted(current) | PlayerPhase::Scored(current), RoundEvent::Advance) => {
                if current >= LAST_ROUND {
                    PlayerPhase::Finished
                } else {
                    PlayerPhase::AwaitingAnswer(current + 1)
                }
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }

    /// Apply `event` in place.
    pub fn apply(&mut self, event: RoundEvent) -> Result<PlayerPhase, InvalidTransition> {
        let next = self.next(event)?;
        *self = next;
        Ok(next)
    }
}

/// Compute the phase reached by applying `event` from `phase`.
pub fn compute_transition(
    phase: PlayerPhase,
    event: RoundEvent,
) -> Result<PlayerPhase, InvalidTransition> {
    phase.next(event)
}

/// Check that `round` is one of the playable rounds.
pub fn is_valid_round(round: u8) -> bool {
    (FIRST_ROUND..=LAST_ROUND).contains(&round)
}

/// Zero-based slot for a valid round number.
pub fn round_slot(round: u8) -> usize {
    usize::from(round.saturating_sub(FIRST_ROUND))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(phase: &mut PlayerPhase, event: RoundEvent) -> PlayerPhase {
        phase.apply(event).unwrap()
    }

    #[test]
    fn initial_phase_awaits_round_one() {
        let phase = PlayerPhase::default();
        assert_eq!(phase, PlayerPhase::AwaitingAnswer(1));
        assert_eq!(phase.current_round(), Some(1));
        assert!(!phase.has_submitted());
    }

    #[test]
    fn full_path_through_five_rounds() {
        let mut phase = PlayerPhase::default();
        for round in 1..=LAST_ROUND {
            assert_eq!(
                apply(&mut phase, RoundEvent::SubmitAnswers { round }),
                PlayerPhase::Submitted(round)
            );
            assert!(phase.has_submitted());
            assert_eq!(
                apply(&mut phase, RoundEvent::Score { round }),
                PlayerPhase::Scored(round)
            );
            apply(&mut phase, RoundEvent::Advance);
        }
        assert_eq!(phase, PlayerPhase::Finished);
        assert_eq!(phase.current_round(), None);
    }

    #[test]
    fn stale_submission_is_rejected() {
        let mut phase = PlayerPhase::AwaitingAnswer(2);
        let err = phase
            .apply(RoundEvent::SubmitAnswers { round: 1 })
            .unwrap_err();
        assert_eq!(err.from, PlayerPhase::AwaitingAnswer(2));
        assert_eq!(phase, PlayerPhase::AwaitingAnswer(2));
    }

    #[test]
    fn duplicate_submission_is_rejected() {
        let mut phase = PlayerPhase::default();
        apply(&mut phase, RoundEvent::SubmitAnswers { round: 1 });
        assert!(phase.apply(RoundEvent::SubmitAnswers { round: 1 }).is_err());
    }

    #[test]
    fn advance_requires_a_submission() {
        let phase = PlayerPhase::AwaitingAnswer(3);
        assert!(phase.next(RoundEvent::Advance).is_err());
    }

    #[test]
    fn forfeit_counts_as_submission() {
        let mut phase = PlayerPhase::AwaitingAnswer(4);
        apply(&mut phase, RoundEvent::Forfeit { round: 4 });
        apply(&mut phase, RoundEvent::Score { round: 4 });
        assert_eq!(
            apply(&mut phase, RoundEvent::Advance),
            PlayerPhase::AwaitingAnswer(5)
        );
    }

    #[test]
    fn auto_advance_skips_scoring() {
        let mut phase = PlayerPhase::AwaitingAnswer(5);
        apply(&mut phase, RoundEvent::SubmitAnswers { round: 5 });
        assert_eq!(apply(&mut phase, RoundEvent::Advance), PlayerPhase::Finished);
    }

    #[test]
    fn finished_rejects_everything() {
        let phase = PlayerPhase::Finished;
        assert!(compute_transition(phase, RoundEvent::Advance).is_err());
        assert!(phase.next(RoundEvent::Score { round: 5 }).is_err());
    }

    #[test]
    fn round_helpers() {
        assert!(is_valid_round(1));
        assert!(is_valid_round(5));
        assert!(!is_valid_round(0));
        assert!(!is_valid_round(6));
        assert_eq!(round_slot(1), 0);
        assert_eq!(round_slot(5), 4);
    }
}
