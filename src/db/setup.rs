//! `setup` table: key/value configuration rows (spec.md §6).

use super::DbError;
use rusqlite::{params, Connection, OptionalExtension};

pub struct SetupRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SetupRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM setup WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO setup (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<(), DbError> {
        self.conn.execute("DELETE FROM setup WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::Database;

    #[test]
    fn set_then_get_round_trips() {
        let db = Database::open_in_memory().unwrap();
        db.setup().set("hub_name", "TestHub").unwrap();
        assert_eq!(db.setup().get("hub_name").unwrap().as_deref(), Some("TestHub"));
    }

    #[test]
    fn missing_key_returns_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.setup().get("nope").unwrap().is_none());
    }

    #[test]
    fn set_overwrites_existing_value() {
        let db = Database::open_in_memory().unwrap();
        db.setup().set("k", "v1").unwrap();
        db.setup().set("k", "v2").unwrap();
        assert_eq!(db.setup().get("k").unwrap().as_deref(), Some("v2"));
    }
}
