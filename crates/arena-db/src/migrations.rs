use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS matches (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            capacity    INTEGER NOT NULL,
            status      TEXT NOT NULL,
            board       TEXT NOT NULL,
            turn_holder TEXT,
            turn_count  INTEGER NOT NULL,
            winner_id   TEXT,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_matches_created
            ON matches(created_at);

        CREATE TABLE IF NOT EXISTS seats (
            match_id    TEXT NOT NULL REFERENCES matches(id),
            player_id   TEXT NOT NULL REFERENCES users(id),
            mark        TEXT NOT NULL,
            has_turn    INTEGER NOT NULL DEFAULT 0,
            UNIQUE(match_id, player_id)
        );

        CREATE TABLE IF NOT EXISTS moves (
            match_id    TEXT NOT NULL REFERENCES matches(id),
            player_id   TEXT NOT NULL REFERENCES users(id),
            cell        INTEGER NOT NULL,
            mark        TEXT NOT NULL,
            seq         INTEGER NOT NULL,
            created_at  TEXT NOT NULL,
            UNIQUE(match_id, seq)
        );

        CREATE INDEX IF NOT EXISTS idx_moves_match
            ON moves(match_id, seq);

        CREATE TABLE IF NOT EXISTS results (
            player_id   TEXT NOT NULL REFERENCES users(id),
            match_id    TEXT NOT NULL REFERENCES matches(id),
            points      INTEGER NOT NULL,
            outcome     TEXT NOT NULL,
            UNIQUE(player_id, match_id)
        );

        CREATE INDEX IF NOT EXISTS idx_results_player
            ON results(player_id);

        CREATE TABLE IF NOT EXISTS invitations (
            id          TEXT PRIMARY KEY,
            sender_id   TEXT NOT NULL REFERENCES users(id),
            receiver_id TEXT NOT NULL REFERENCES users(id),
            status      TEXT NOT NULL,
            match_id    TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_invitations_receiver
            ON invitations(receiver_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
