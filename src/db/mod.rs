//! Persistent storage (spec.md §6: "a relational store accessed via a
//! small row/object mapper"). Synchronous `rusqlite`, matching the
//! single-threaded core — there is exactly one writer, the main loop.

mod banlist;
mod reglist;
mod setup;
mod zone;

pub use banlist::{BanListRepository, BanRow};
pub use reglist::{CredentialKind, RegListRepository, RegUser};
pub use setup::SetupRepository;
pub use zone::ZoneRepository;

use rusqlite::Connection as SqliteConnection;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("nick not registered: {0}")]
    NickNotFound(String),
    #[error("nick already registered: {0}")]
    NickExists(String),
}

/// A handle around the single SQLite connection. There's no pool: the
/// core is single-threaded and this is the only writer.
pub struct Database {
    conn: SqliteConnection,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = SqliteConnection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = SqliteConnection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS setup (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS reglist (
                nick           TEXT PRIMARY KEY COLLATE NOCASE,
                class          INTEGER NOT NULL,
                password       TEXT NOT NULL,
                encryption     TEXT NOT NULL,
                enabled        INTEGER NOT NULL DEFAULT 1,
                operator_note  TEXT NOT NULL DEFAULT '',
                user_note      TEXT NOT NULL DEFAULT '',
                first_login    INTEGER,
                last_login     INTEGER
            );
            CREATE TABLE IF NOT EXISTS banlist (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                nick      TEXT,
                ip        TEXT,
                ip_range  TEXT,
                host      TEXT,
                min_share INTEGER,
                reason    TEXT NOT NULL,
                operator  TEXT NOT NULL,
                kind      TEXT NOT NULL,
                start_ts  INTEGER NOT NULL,
                end_ts    INTEGER
            );
            CREATE TABLE IF NOT EXISTS kicklist (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                nick     TEXT NOT NULL,
                operator TEXT NOT NULL,
                reason   TEXT NOT NULL,
                ts       INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS zone (
                country_code TEXT PRIMARY KEY,
                country_name TEXT NOT NULL,
                user_count   INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )?;
        Ok(())
    }

    pub fn setup(&self) -> SetupRepository<'_> {
        SetupRepository::new(&self.conn)
    }

    pub fn reglist(&self) -> RegListRepository<'_> {
        RegListRepository::new(&self.conn)
    }

    pub fn banlist(&self) -> BanListRepository<'_> {
        BanListRepository::new(&self.conn)
    }

    pub fn zone(&self) -> ZoneRepository<'_> {
        ZoneRepository::new(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
    }
}
