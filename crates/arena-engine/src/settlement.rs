//! Exactly-once score settlement for finished matches.
//!
//! Invoked only from the session branch that performs the terminal status
//! transition. The upsert is keyed on (player, match) and overwrites with
//! deterministic inputs, so a retried settlement cannot duplicate results.

use arena_types::models::{MatchResult, MatchState, ScoreOutcome};
use tracing::info;

use crate::error::Result;
use crate::store::Store;

pub const WIN_POINTS: i64 = 1000;
pub const LOSS_POINTS: i64 = 0;
pub const DRAW_POINTS: i64 = 500;

/// Participation points when a match ends with neither winner nor draw
/// (abandonment). Recorded as a draw outcome: no win/loss distinction.
pub const ABANDON_POINTS: i64 = 100;

/// Record one result per seated player for a terminal match.
pub fn settle(store: &dyn Store, state: &MatchState, is_draw: bool) -> Result<()> {
    for seat in &state.seats {
        let (points, outcome) = if is_draw {
            (DRAW_POINTS, ScoreOutcome::Draw)
        } else if let Some(winner_id) = state.winner {
            if seat.player_id == winner_id {
                (WIN_POINTS, ScoreOutcome::Win)
            } else {
                (LOSS_POINTS, ScoreOutcome::Loss)
            }
        } else {
            (ABANDON_POINTS, ScoreOutcome::Draw)
        };

        store.upsert_result(&MatchResult {
            player_id: seat.player_id,
            match_id: state.id,
            points,
            outcome,
        })?;
        info!(
            match_id = %state.id,
            player_id = %seat.player_id,
            points,
            ?outcome,
            "result settled"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use arena_types::models::{Mark, MatchState, MatchStatus, Seat};
    use std::sync::Arc;
    use uuid::Uuid;

    fn finished_match(winner: Option<Uuid>) -> (MatchState, Uuid, Uuid) {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut state = MatchState::new(Uuid::new_v4(), "settle".into());
        state.status = if winner.is_some() {
            MatchStatus::Finished
        } else {
            MatchStatus::Abandoned
        };
        state.winner = winner;
        state.seats = vec![
            Seat { player_id: a, name: "ann".into(), mark: Mark::X, has_turn: false },
            Seat { player_id: b, name: "bob".into(), mark: Mark::O, has_turn: false },
        ];
        (state, a, b)
    }

    #[test]
    fn win_and_loss_points() {
        let store = Arc::new(MemoryStore::new());
        let (state, a, b) = finished_match(None);
        let mut state = state;
        state.status = MatchStatus::Finished;
        state.winner = Some(a);

        settle(store.as_ref(), &state, false).unwrap();

        let results = store.results_for(state.id);
        assert_eq!(results.len(), 2);
        let win = results.iter().find(|r| r.player_id == a).unwrap();
        let loss = results.iter().find(|r| r.player_id == b).unwrap();
        assert_eq!((win.points, win.outcome), (WIN_POINTS, ScoreOutcome::Win));
        assert_eq!((loss.points, loss.outcome), (LOSS_POINTS, ScoreOutcome::Loss));
    }

    #[test]
    fn draw_points_for_both() {
        let store = Arc::new(MemoryStore::new());
        let (mut state, _, _) = finished_match(None);
        state.status = MatchStatus::Finished;

        settle(store.as_ref(), &state, true).unwrap();

        let results = store.results_for(state.id);
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.points == DRAW_POINTS && r.outcome == ScoreOutcome::Draw));
    }

    #[test]
    fn abandonment_awards_participation_points() {
        let store = Arc::new(MemoryStore::new());
        let (state, _, _) = finished_match(None);

        settle(store.as_ref(), &state, false).unwrap();

        let results = store.results_for(state.id);
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.points == ABANDON_POINTS && r.outcome == ScoreOutcome::Draw));
    }

    #[test]
    fn resettling_overwrites_instead_of_duplicating() {
        let store = Arc::new(MemoryStore::new());
        let (state, a, _) = finished_match(Some(Uuid::new_v4()));
        let mut state = state;
        state.winner = Some(a);

        settle(store.as_ref(), &state, false).unwrap();
        settle(store.as_ref(), &state, false).unwrap();
        settle(store.as_ref(), &state, false).unwrap();

        let results = store.results_for(state.id);
        assert_eq!(results.len(), 2);
        let total: i64 = results.iter().map(|r| r.points).sum();
        assert_eq!(total, WIN_POINTS + LOSS_POINTS);
    }
}
