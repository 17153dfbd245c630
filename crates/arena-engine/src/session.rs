//! Per-match session: the single writer for one match's authoritative
//! state.
//!
//! Every mutating call runs under the session mutex and follows
//! apply-then-persist-then-commit: the working copy is mutated, pushed
//! through the store, and only committed to memory once persistence
//! succeeded. A storage failure leaves the in-memory state exactly as it
//! was before the call.

use std::sync::{Arc, Mutex, MutexGuard};

use arena_types::models::{Mark, MatchState, MatchStatus, MoveRecord, Seat};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::board::{self, Outcome};
use crate::error::{Error, Result};
use crate::settlement;
use crate::store::Store;

pub struct MatchSession {
    state: Mutex<MatchState>,
    store: Arc<dyn Store>,
}

/// Result of a successful (possibly idempotent) join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub state: MatchState,
    pub mark: Mark,
    /// The player already held a seat; nothing changed.
    pub already_seated: bool,
    /// This join filled the last seat and activated the match.
    pub started: bool,
}

/// Result of a successfully applied move.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub state: MatchState,
    pub mv: MoveRecord,
    pub winning_line: Option<[usize; 3]>,
    pub finished: bool,
    pub is_draw: bool,
}

impl MatchSession {
    pub fn new(state: MatchState, store: Arc<dyn Store>) -> Self {
        Self { state: Mutex::new(state), store }
    }

    pub fn id(&self) -> Uuid {
        self.lock().id
    }

    /// Whole-state snapshot, taken outside any partial mutation.
    pub fn snapshot(&self) -> MatchState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MatchState> {
        self.state.lock().expect("match session lock poisoned")
    }

    /// Flip a fully seated match to Active with the turn granted to X.
    fn activate(work: &mut MatchState) -> Result<()> {
        work.status = MatchStatus::Active;
        let first = work
            .seat_with_mark(Mark::X)
            .ok_or(Error::Conflict("no first seat"))?
            .player_id;
        work.turn_holder = Some(first);
        for s in &mut work.seats {
            s.has_turn = s.player_id == first;
        }
        Ok(())
    }

    /// Seat a player. Idempotent: a player who already holds a seat gets
    /// their existing mark back. The capacity-th join atomically activates
    /// the match and grants the turn to X's seat.
    pub fn join(&self, player_id: Uuid, name: &str) -> Result<JoinOutcome> {
        let mut state = self.lock();

        if let Some(seat) = state.seat_of(player_id) {
            return Ok(JoinOutcome {
                mark: seat.mark,
                state: state.clone(),
                already_seated: true,
                started: false,
            });
        }

        // The in-memory snapshot may predate a seat persisted by an earlier
        // session of this match (process restart, or a join whose match
        // update never landed); the durable record wins.
        if let Some(seat) = self.store.find_seat(state.id, player_id)? {
            let mark = seat.mark;
            let mut work = state.clone();
            work.seats.push(seat);

            // The recovered seat may be the capacity-th one whose
            // activation was lost with the failed match update. Finish it,
            // or the match stays Waiting with full seats forever.
            let started = work.status == MatchStatus::Waiting
                && work.seats.len() == work.capacity as usize;
            if started {
                Self::activate(&mut work)?;
                work.updated_at = Utc::now();
                self.store.save_match(&work)?;
            }

            info!(match_id = %work.id, %player_id, %mark, started, "seat reconciled from store");
            *state = work;
            return Ok(JoinOutcome {
                mark,
                state: state.clone(),
                already_seated: true,
                started,
            });
        }

        if state.seats.len() >= state.capacity as usize {
            return Err(Error::MatchFull);
        }
        if state.status != MatchStatus::Waiting {
            return Err(Error::Conflict("match already started"));
        }

        let mark = Mark::for_seat(state.seats.len());
        let seat = Seat {
            player_id,
            name: name.to_string(),
            mark,
            has_turn: mark == Mark::X,
        };

        let mut work = state.clone();
        work.seats.push(seat.clone());
        work.updated_at = Utc::now();

        let started = work.seats.len() == work.capacity as usize;
        if started {
            Self::activate(&mut work)?;
        }

        self.store.create_seat(work.id, &seat)?;
        self.store.save_match(&work)?;

        info!(match_id = %work.id, %player_id, %mark, started, "player joined");
        *state = work;
        Ok(JoinOutcome { mark, state: state.clone(), already_seated: false, started })
    }

    /// Apply one move for the seat currently holding the turn. The whole
    /// validate-apply-detect-settle sequence is one atomic unit; two
    /// concurrent calls on the same match can never interleave.
    pub fn make_move(&self, player_id: Uuid, cell: usize) -> Result<MoveOutcome> {
        let mut state = self.lock();

        if state.status != MatchStatus::Active {
            return Err(Error::MatchNotActive);
        }
        let seat = state.seat_of(player_id).ok_or(Error::NotASeatHolder)?;
        if !seat.has_turn {
            return Err(Error::NotYourTurn);
        }
        board::validate(&state.board, cell)?;

        let mark = seat.mark;
        let mut work = state.clone();
        work.board = board::apply(&work.board, cell, mark);
        work.turn_count += 1;
        work.updated_at = Utc::now();

        let mv = MoveRecord {
            match_id: work.id,
            player_id,
            cell,
            mark,
            seq: work.turn_count,
            created_at: work.updated_at,
        };

        let mut winning_line = None;
        let mut is_draw = false;
        match board::outcome(&work.board) {
            Outcome::Win { line, .. } => {
                winning_line = Some(line);
                work.status = MatchStatus::Finished;
                work.winner = Some(player_id);
                work.turn_holder = None;
                for s in &mut work.seats {
                    s.has_turn = false;
                }
            }
            Outcome::Draw => {
                is_draw = true;
                work.status = MatchStatus::Finished;
                work.winner = None;
                work.turn_holder = None;
                for s in &mut work.seats {
                    s.has_turn = false;
                }
            }
            Outcome::Open => {
                let next = work
                    .seat_with_mark(mark.other())
                    .ok_or(Error::Conflict("opponent seat missing"))?
                    .player_id;
                work.turn_holder = Some(next);
                for s in &mut work.seats {
                    s.has_turn = s.player_id == next;
                }
            }
        }

        let finished = work.status == MatchStatus::Finished;

        self.store.append_move(&mv)?;
        self.store.save_match(&work)?;
        if finished {
            // Settlement happens only here, inside the terminal transition.
            settlement::settle(self.store.as_ref(), &work, is_draw)?;
        }

        debug!(
            match_id = %work.id,
            %player_id,
            cell,
            seq = mv.seq,
            finished,
            "move applied"
        );
        *state = work;
        Ok(MoveOutcome { state: state.clone(), mv, winning_line, finished, is_draw })
    }

    /// Explicit termination: a forced win, a declared draw, or abandonment
    /// when neither is given. Rejected once the match is already terminal.
    pub fn end(&self, winner_id: Option<Uuid>, is_draw: bool) -> Result<MatchState> {
        let mut state = self.lock();

        if state.status.is_terminal() {
            return Err(Error::Conflict("match already over"));
        }
        if let Some(winner_id) = winner_id {
            if state.seat_of(winner_id).is_none() {
                return Err(Error::NotASeatHolder);
            }
        }

        let mut work = state.clone();
        work.status = if winner_id.is_some() || is_draw {
            MatchStatus::Finished
        } else {
            MatchStatus::Abandoned
        };
        work.winner = winner_id;
        work.turn_holder = None;
        for s in &mut work.seats {
            s.has_turn = false;
        }
        work.updated_at = Utc::now();

        self.store.save_match(&work)?;
        settlement::settle(self.store.as_ref(), &work, is_draw)?;

        info!(match_id = %work.id, winner = ?winner_id, is_draw, status = ?work.status, "match ended");
        *state = work;
        Ok(state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::{ABANDON_POINTS, DRAW_POINTS, LOSS_POINTS, WIN_POINTS};
    use crate::testing::MemoryStore;
    use arena_types::models::ScoreOutcome;

    fn fresh_session(store: &Arc<MemoryStore>) -> MatchSession {
        let state = MatchState::new(Uuid::new_v4(), "test match".into());
        store.save_match(&state).unwrap();
        MatchSession::new(state, store.clone() as Arc<dyn Store>)
    }

    fn seated_session() -> (MatchSession, Arc<MemoryStore>, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let session = fresh_session(&store);
        let ann = Uuid::new_v4();
        let bob = Uuid::new_v4();
        session.join(ann, "ann").unwrap();
        session.join(bob, "bob").unwrap();
        (session, store, ann, bob)
    }

    #[test]
    fn two_joins_activate_with_x_to_move() {
        let store = Arc::new(MemoryStore::new());
        let session = fresh_session(&store);
        let ann = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let first = session.join(ann, "ann").unwrap();
        assert_eq!(first.mark, Mark::X);
        assert!(!first.started);
        assert_eq!(first.state.status, MatchStatus::Waiting);

        let second = session.join(bob, "bob").unwrap();
        assert_eq!(second.mark, Mark::O);
        assert!(second.started);
        assert_eq!(second.state.status, MatchStatus::Active);
        assert_eq!(second.state.turn_holder, Some(ann));
        assert!(second.state.seat_of(ann).unwrap().has_turn);
        assert!(!second.state.seat_of(bob).unwrap().has_turn);
    }

    #[test]
    fn third_join_fails_match_full() {
        let (session, _, _, _) = seated_session();
        let err = session.join(Uuid::new_v4(), "eve").unwrap_err();
        assert!(matches!(err, Error::MatchFull));
    }

    #[test]
    fn rejoin_is_idempotent_and_returns_existing_mark() {
        let (session, _, ann, _) = seated_session();
        let again = session.join(ann, "ann").unwrap();
        assert!(again.already_seated);
        assert_eq!(again.mark, Mark::X);
        assert_eq!(again.state.seats.len(), 2);
    }

    #[test]
    fn legal_sequence_alternates_and_fills_n_cells() {
        let (session, _, ann, bob) = seated_session();
        let order = [ann, bob, ann, bob, ann];
        let cells = [0, 3, 1, 4, 8];

        for (i, (&player, &cell)) in order.iter().zip(cells.iter()).enumerate() {
            let out = session.make_move(player, cell).unwrap();
            assert_eq!(out.state.board.filled(), i + 1);
            assert_eq!(out.mv.seq, (i + 1) as u32);
            assert_eq!(out.mv.mark, if i % 2 == 0 { Mark::X } else { Mark::O });
        }
    }

    #[test]
    fn move_before_activation_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let session = fresh_session(&store);
        let ann = Uuid::new_v4();
        session.join(ann, "ann").unwrap();

        let err = session.make_move(ann, 0).unwrap_err();
        assert!(matches!(err, Error::MatchNotActive));
        assert_eq!(session.snapshot().turn_count, 0);
    }

    #[test]
    fn rejections_leave_state_untouched() {
        let (session, _, ann, bob) = seated_session();
        let before = session.snapshot();

        assert!(matches!(
            session.make_move(Uuid::new_v4(), 0).unwrap_err(),
            Error::NotASeatHolder
        ));
        assert!(matches!(
            session.make_move(bob, 0).unwrap_err(),
            Error::NotYourTurn
        ));
        assert!(matches!(
            session.make_move(ann, 12).unwrap_err(),
            Error::InvalidCell(12)
        ));

        let after = session.snapshot();
        assert_eq!(after.board, before.board);
        assert_eq!(after.turn_count, before.turn_count);
        assert_eq!(after.status, before.status);
        assert_eq!(after.turn_holder, before.turn_holder);
    }

    #[test]
    fn occupied_cell_is_rejected() {
        let (session, _, ann, bob) = seated_session();
        session.make_move(ann, 4).unwrap();
        let err = session.make_move(bob, 4).unwrap_err();
        assert!(matches!(err, Error::CellOccupied(4)));
    }

    #[test]
    fn winning_move_finishes_and_settles() {
        let (session, store, ann, bob) = seated_session();
        // X: 0 1 2 wins; O: 3 4
        session.make_move(ann, 0).unwrap();
        session.make_move(bob, 3).unwrap();
        session.make_move(ann, 1).unwrap();
        session.make_move(bob, 4).unwrap();
        let out = session.make_move(ann, 2).unwrap();

        assert!(out.finished);
        assert!(!out.is_draw);
        assert_eq!(out.winning_line, Some([0, 1, 2]));
        assert_eq!(out.state.status, MatchStatus::Finished);
        assert_eq!(out.state.winner, Some(ann));
        assert_eq!(out.state.turn_holder, None);

        let results = store.results_for(out.state.id);
        assert_eq!(results.len(), 2);
        let win = results.iter().find(|r| r.player_id == ann).unwrap();
        let loss = results.iter().find(|r| r.player_id == bob).unwrap();
        assert_eq!((win.points, win.outcome), (WIN_POINTS, ScoreOutcome::Win));
        assert_eq!((loss.points, loss.outcome), (LOSS_POINTS, ScoreOutcome::Loss));
    }

    #[test]
    fn ninth_move_without_line_is_a_draw() {
        let (session, store, ann, bob) = seated_session();
        // Ends as X O X / X O O / O X X -- full board, no line
        let legal = [
            (ann, 0), (bob, 1), (ann, 2), (bob, 4), (ann, 3),
            (bob, 5), (ann, 7), (bob, 6), (ann, 8),
        ];
        let mut last = None;
        for (player, cell) in legal {
            last = Some(session.make_move(player, cell).unwrap());
        }
        let out = last.unwrap();

        assert!(out.finished);
        assert!(out.is_draw);
        assert_eq!(out.winning_line, None);
        assert_eq!(out.state.winner, None);
        assert_eq!(out.state.turn_count, 9);

        let results = store.results_for(out.state.id);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.points == DRAW_POINTS));
    }

    #[test]
    fn no_moves_after_terminal() {
        let (session, _, ann, bob) = seated_session();
        session.make_move(ann, 0).unwrap();
        session.make_move(bob, 3).unwrap();
        session.make_move(ann, 1).unwrap();
        session.make_move(bob, 4).unwrap();
        session.make_move(ann, 2).unwrap();

        let err = session.make_move(bob, 5).unwrap_err();
        assert!(matches!(err, Error::MatchNotActive));
        assert_eq!(session.snapshot().turn_count, 5);
    }

    #[test]
    fn abandonment_settles_participation_points() {
        let (session, store, _, _) = seated_session();
        let state = session.end(None, false).unwrap();

        assert_eq!(state.status, MatchStatus::Abandoned);
        let results = store.results_for(state.id);
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.points == ABANDON_POINTS && r.outcome == ScoreOutcome::Draw));

        let err = session.end(None, false).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn seat_persisted_without_match_update_recovers_on_retry() {
        let store = Arc::new(MemoryStore::new());
        let session = fresh_session(&store);
        let ann = Uuid::new_v4();
        let bob = Uuid::new_v4();
        session.join(ann, "ann").unwrap();

        // Second join: the seat row lands but the match update fails,
        // so the activation is lost.
        store.fail_match_saves(true);
        assert!(matches!(
            session.join(bob, "bob").unwrap_err(),
            Error::Storage(_)
        ));
        store.fail_match_saves(false);

        let retry = session.join(bob, "bob").unwrap();
        assert!(retry.already_seated);
        assert!(retry.started);
        assert_eq!(retry.state.status, MatchStatus::Active);
        assert_eq!(retry.state.seats.len(), 2);
        assert_eq!(retry.state.turn_holder, Some(ann));
        assert!(retry.state.seat_of(ann).unwrap().has_turn);
        assert!(!retry.state.seat_of(bob).unwrap().has_turn);

        // The recovered activation reached the store, and play proceeds.
        let persisted = store.load_match(retry.state.id).unwrap().unwrap();
        assert_eq!(persisted.status, MatchStatus::Active);
        session.make_move(ann, 0).unwrap();
    }

    #[test]
    fn storage_failure_rolls_back_in_memory_state() {
        let (session, store, ann, _) = seated_session();
        let before = session.snapshot();

        store.fail_writes(true);
        let err = session.make_move(ann, 0).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        let after = session.snapshot();
        assert_eq!(after.board, before.board);
        assert_eq!(after.turn_count, 0);
        assert_eq!(after.turn_holder, before.turn_holder);

        // Once the store recovers the same move goes through.
        store.fail_writes(false);
        let out = session.make_move(ann, 0).unwrap();
        assert_eq!(out.mv.seq, 1);
    }

    #[test]
    fn concurrent_moves_accept_exactly_one() {
        use std::thread;

        // Two simultaneous moves by the turn holder on different free
        // cells: whichever wins the critical section is applied, the
        // other finds the turn gone. Never both, never neither.
        for _ in 0..32 {
            let (session, _, ann, _) = seated_session();
            let session = Arc::new(session);

            let s1 = session.clone();
            let s2 = session.clone();
            let t1 = thread::spawn(move || s1.make_move(ann, 0));
            let t2 = thread::spawn(move || s2.make_move(ann, 1));
            let r1 = t1.join().unwrap();
            let r2 = t2.join().unwrap();

            assert_eq!(r1.is_ok() as u8 + r2.is_ok() as u8, 1);
            let rejected = if r1.is_err() { r1 } else { r2 };
            assert!(matches!(rejected.unwrap_err(), Error::NotYourTurn));

            let state = session.snapshot();
            assert_eq!(state.turn_count, 1);
            assert_eq!(state.board.filled(), 1);
        }
    }
}
