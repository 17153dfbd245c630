//! User/credential queries used by the REST auth surface. Match, move,
//! result and invitation access goes through the `Store` impl in
//! `store.rs`.

use crate::Database;
use crate::models::UserRow;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

impl Database {
    pub fn create_user(&self, id: &str, name: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, password) VALUES (?1, ?2, ?3)",
                (id, name, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_name(&self, name: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "name", name))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, name, password, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[test]
    fn create_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "ann", "hash").unwrap();

        let by_name = db.get_user_by_name("ann").unwrap().unwrap();
        assert_eq!(by_name.id, "u1");
        assert_eq!(by_name.password, "hash");

        let by_id = db.get_user_by_id("u1").unwrap().unwrap();
        assert_eq!(by_id.name, "ann");

        assert!(db.get_user_by_name("bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "ann", "hash").unwrap();
        assert!(db.create_user("u2", "ann", "hash").is_err());
    }
}
