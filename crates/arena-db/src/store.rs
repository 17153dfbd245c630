//! `arena_engine::Store` implemented over SQLite. One connection behind a
//! mutex (WAL mode); callers on the async runtime wrap these in
//! `spawn_blocking`.

use std::sync::Arc;

use anyhow::Result;
use arena_types::models::{
    Invitation, LobbyMatch, MatchResult, MatchState, MoveRecord, RankingEntry,
    ScoreHistoryEntry, Seat,
};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::Database;
use crate::models::{
    invitation_status_from_str, invitation_status_to_str, mark_from_str, mark_to_str,
    outcome_from_str, outcome_to_str, status_from_str, status_to_str, timestamp_from_str,
    timestamp_to_str, uuid_from_str,
};

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl arena_engine::Store for SqliteStore {
    fn load_match(&self, id: Uuid) -> arena_engine::Result<Option<MatchState>> {
        let state = self.db.with_conn(|conn| load_match(conn, id))?;
        Ok(state)
    }

    fn save_match(&self, state: &MatchState) -> arena_engine::Result<()> {
        self.db.with_conn(|conn| save_match(conn, state))?;
        Ok(())
    }

    fn append_move(&self, mv: &MoveRecord) -> arena_engine::Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO moves (match_id, player_id, cell, mark, seq, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    mv.match_id.to_string(),
                    mv.player_id.to_string(),
                    mv.cell as i64,
                    mark_to_str(mv.mark),
                    mv.seq as i64,
                    timestamp_to_str(mv.created_at),
                ],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    fn upsert_result(&self, result: &MatchResult) -> arena_engine::Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO results (player_id, match_id, points, outcome)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(player_id, match_id) DO UPDATE SET
                     points = excluded.points,
                     outcome = excluded.outcome",
                params![
                    result.player_id.to_string(),
                    result.match_id.to_string(),
                    result.points,
                    outcome_to_str(result.outcome),
                ],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    fn find_seat(
        &self,
        match_id: Uuid,
        player_id: Uuid,
    ) -> arena_engine::Result<Option<Seat>> {
        let seat = self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT s.player_id, u.name, s.mark, s.has_turn
                     FROM seats s
                     LEFT JOIN users u ON s.player_id = u.id
                     WHERE s.match_id = ?1 AND s.player_id = ?2",
                    params![match_id.to_string(), player_id.to_string()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, bool>(3)?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(pid, name, mark, has_turn)| {
                Ok::<_, anyhow::Error>(Seat {
                    player_id: uuid_from_str(&pid)?,
                    name: name.unwrap_or_else(|| "unknown".to_string()),
                    mark: mark_from_str(&mark)?,
                    has_turn,
                })
            })
            .transpose()
        })?;
        Ok(seat)
    }

    fn create_seat(&self, match_id: Uuid, seat: &Seat) -> arena_engine::Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO seats (match_id, player_id, mark, has_turn)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    match_id.to_string(),
                    seat.player_id.to_string(),
                    mark_to_str(seat.mark),
                    seat.has_turn,
                ],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    fn load_invitation(&self, id: Uuid) -> arena_engine::Result<Option<Invitation>> {
        let invitation = self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, sender_id, receiver_id, status, match_id, created_at
                     FROM invitations WHERE id = ?1",
                    [id.to_string()],
                    invitation_columns,
                )
                .optional()?;
            row.map(invitation_from_columns).transpose()
        })?;
        Ok(invitation)
    }

    fn save_invitation(&self, invitation: &Invitation) -> arena_engine::Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO invitations (id, sender_id, receiver_id, status, match_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     status = excluded.status,
                     match_id = excluded.match_id",
                params![
                    invitation.id.to_string(),
                    invitation.sender_id.to_string(),
                    invitation.receiver_id.to_string(),
                    invitation_status_to_str(invitation.status),
                    invitation.match_id.map(|id| id.to_string()),
                    timestamp_to_str(invitation.created_at),
                ],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    fn pending_invitation_between(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> arena_engine::Result<Option<Invitation>> {
        let invitation = self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, sender_id, receiver_id, status, match_id, created_at
                     FROM invitations
                     WHERE sender_id = ?1 AND receiver_id = ?2 AND status = 'pending'",
                    params![sender_id.to_string(), receiver_id.to_string()],
                    invitation_columns,
                )
                .optional()?;
            row.map(invitation_from_columns).transpose()
        })?;
        Ok(invitation)
    }

    fn invitations_for(
        &self,
        player_id: Uuid,
        sent: bool,
    ) -> arena_engine::Result<Vec<Invitation>> {
        let column = if sent { "sender_id" } else { "receiver_id" };
        let invitations = self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT id, sender_id, receiver_id, status, match_id, created_at
                 FROM invitations WHERE {} = ?1 ORDER BY created_at DESC",
                column
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([player_id.to_string()], invitation_columns)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(invitation_from_columns).collect()
        })?;
        Ok(invitations)
    }

    fn player_name(&self, player_id: Uuid) -> arena_engine::Result<Option<String>> {
        let name = self.db.with_conn(|conn| {
            let name = conn
                .query_row(
                    "SELECT name FROM users WHERE id = ?1",
                    [player_id.to_string()],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(name)
        })?;
        Ok(name)
    }

    fn list_matches(&self) -> arena_engine::Result<Vec<LobbyMatch>> {
        let matches = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.title, m.status, m.capacity,
                        (SELECT COUNT(*) FROM seats s WHERE s.match_id = m.id),
                        m.created_at
                 FROM matches m
                 ORDER BY m.created_at DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, title, status, capacity, seated, created_at)| {
                    Ok(LobbyMatch {
                        id: uuid_from_str(&id)?,
                        title,
                        status: status_from_str(&status)?,
                        capacity: capacity as u32,
                        seated: seated as u32,
                        created_at: timestamp_from_str(&created_at)?,
                    })
                })
                .collect()
        })?;
        Ok(matches)
    }

    fn list_moves(&self, match_id: Uuid) -> arena_engine::Result<Vec<MoveRecord>> {
        let moves = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT match_id, player_id, cell, mark, seq, created_at
                 FROM moves WHERE match_id = ?1 ORDER BY seq ASC",
            )?;
            let rows = stmt
                .query_map([match_id.to_string()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(mid, pid, cell, mark, seq, created_at)| {
                    Ok(MoveRecord {
                        match_id: uuid_from_str(&mid)?,
                        player_id: uuid_from_str(&pid)?,
                        cell: cell as usize,
                        mark: mark_from_str(&mark)?,
                        seq: seq as u32,
                        created_at: timestamp_from_str(&created_at)?,
                    })
                })
                .collect()
        })?;
        Ok(moves)
    }

    fn ranking(&self, limit: u32) -> arena_engine::Result<Vec<RankingEntry>> {
        let entries = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.player_id, u.name,
                        SUM(r.points) AS total_points,
                        SUM(CASE WHEN r.outcome = 'win' THEN 1 ELSE 0 END) AS wins
                 FROM results r
                 LEFT JOIN users u ON r.player_id = u.id
                 GROUP BY r.player_id
                 ORDER BY total_points DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit as i64], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(pid, name, total_points, wins)| {
                    Ok(RankingEntry {
                        player_id: uuid_from_str(&pid)?,
                        name: name.unwrap_or_else(|| "unknown".to_string()),
                        total_points,
                        wins,
                    })
                })
                .collect()
        })?;
        Ok(entries)
    }

    fn score_history(&self, player_id: Uuid) -> arena_engine::Result<Vec<ScoreHistoryEntry>> {
        let entries = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.match_id, m.title, m.status, r.points, r.outcome
                 FROM results r
                 LEFT JOIN matches m ON r.match_id = m.id
                 WHERE r.player_id = ?1
                 ORDER BY m.created_at DESC",
            )?;
            let rows = stmt
                .query_map([player_id.to_string()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(mid, title, status, points, outcome)| {
                    Ok(ScoreHistoryEntry {
                        match_id: uuid_from_str(&mid)?,
                        match_title: title.unwrap_or_default(),
                        match_status: status
                            .as_deref()
                            .map(status_from_str)
                            .transpose()?
                            .unwrap_or(arena_types::models::MatchStatus::Finished),
                        points,
                        outcome: outcome_from_str(&outcome)?,
                    })
                })
                .collect()
        })?;
        Ok(entries)
    }
}

fn save_match(conn: &Connection, state: &MatchState) -> Result<()> {
    conn.execute(
        "INSERT INTO matches
             (id, title, capacity, status, board, turn_holder, turn_count,
              winner_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
             title = excluded.title,
             status = excluded.status,
             board = excluded.board,
             turn_holder = excluded.turn_holder,
             turn_count = excluded.turn_count,
             winner_id = excluded.winner_id,
             updated_at = excluded.updated_at",
        params![
            state.id.to_string(),
            state.title,
            state.capacity as i64,
            status_to_str(state.status),
            serde_json::to_string(&state.board)?,
            state.turn_holder.map(|id| id.to_string()),
            state.turn_count as i64,
            state.winner.map(|id| id.to_string()),
            timestamp_to_str(state.created_at),
            timestamp_to_str(state.updated_at),
        ],
    )?;

    // Seat rows are created by create_seat; only the turn flag changes after.
    for seat in &state.seats {
        conn.execute(
            "UPDATE seats SET has_turn = ?1 WHERE match_id = ?2 AND player_id = ?3",
            params![seat.has_turn, state.id.to_string(), seat.player_id.to_string()],
        )?;
    }
    Ok(())
}

fn load_match(conn: &Connection, id: Uuid) -> Result<Option<MatchState>> {
    let row = conn
        .query_row(
            "SELECT id, title, capacity, status, board, turn_holder, turn_count,
                    winner_id, created_at, updated_at
             FROM matches WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                ))
            },
        )
        .optional()?;

    let Some((
        mid,
        title,
        capacity,
        status,
        board,
        turn_holder,
        turn_count,
        winner_id,
        created_at,
        updated_at,
    )) = row
    else {
        return Ok(None);
    };

    // Seats in join order: rowid preserves insertion.
    let mut stmt = conn.prepare(
        "SELECT s.player_id, u.name, s.mark, s.has_turn
         FROM seats s
         LEFT JOIN users u ON s.player_id = u.id
         WHERE s.match_id = ?1
         ORDER BY s.rowid ASC",
    )?;
    let seat_rows = stmt
        .query_map([id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let seats = seat_rows
        .into_iter()
        .map(|(pid, name, mark, has_turn)| {
            Ok::<_, anyhow::Error>(Seat {
                player_id: uuid_from_str(&pid)?,
                name: name.unwrap_or_else(|| "unknown".to_string()),
                mark: mark_from_str(&mark)?,
                has_turn,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(MatchState {
        id: uuid_from_str(&mid)?,
        title,
        capacity: capacity as u32,
        status: status_from_str(&status)?,
        board: serde_json::from_str(&board)?,
        seats,
        turn_holder: turn_holder.as_deref().map(uuid_from_str).transpose()?,
        turn_count: turn_count as u32,
        winner: winner_id.as_deref().map(uuid_from_str).transpose()?,
        created_at: timestamp_from_str(&created_at)?,
        updated_at: timestamp_from_str(&updated_at)?,
    }))
}

type InvitationColumns = (String, String, String, String, Option<String>, String);

fn invitation_columns(row: &rusqlite::Row<'_>) -> rusqlite::Result<InvitationColumns> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn invitation_from_columns(
    (id, sender_id, receiver_id, status, match_id, created_at): InvitationColumns,
) -> Result<Invitation> {
    Ok(Invitation {
        id: uuid_from_str(&id)?,
        sender_id: uuid_from_str(&sender_id)?,
        receiver_id: uuid_from_str(&receiver_id)?,
        status: invitation_status_from_str(&status)?,
        match_id: match_id.as_deref().map(uuid_from_str).transpose()?,
        created_at: timestamp_from_str(&created_at)?,
    })
}
