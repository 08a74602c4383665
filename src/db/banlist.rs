//! `banlist`/`kicklist` tables (spec.md §6). Stores durable bans; the
//! in-memory [`crate::security::bans::BanStore`] is what's actually
//! consulted on the hot path and is rehydrated from here at startup.

use super::DbError;
use rusqlite::{params, Connection, Row};

#[derive(Debug, Clone)]
pub struct BanRow {
    pub id: i64,
    pub nick: Option<String>,
    pub ip: Option<String>,
    pub ip_range: Option<String>,
    pub host: Option<String>,
    pub min_share: Option<u64>,
    pub reason: String,
    pub operator: String,
    pub kind: String,
    pub start_ts: i64,
    pub end_ts: Option<i64>,
}

fn row_to_ban(row: &Row) -> rusqlite::Result<BanRow> {
    Ok(BanRow {
        id: row.get(0)?,
        nick: row.get(1)?,
        ip: row.get(2)?,
        ip_range: row.get(3)?,
        host: row.get(4)?,
        min_share: row.get::<_, Option<i64>>(5)?.map(|v| v as u64),
        reason: row.get(6)?,
        operator: row.get(7)?,
        kind: row.get(8)?,
        start_ts: row.get(9)?,
        end_ts: row.get(10)?,
    })
}

const COLUMNS: &str = "id, nick, ip, ip_range, host, min_share, reason, operator, kind, start_ts, end_ts";

pub struct BanListRepository<'a> {
    conn: &'a Connection,
}

impl<'a> BanListRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, ban: &BanRow) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO banlist (nick, ip, ip_range, host, min_share, reason, operator, kind, start_ts, end_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                ban.nick,
                ban.ip,
                ban.ip_range,
                ban.host,
                ban.min_share.map(|v| v as i64),
                ban.reason,
                ban.operator,
                ban.kind,
                ban.start_ts,
                ban.end_ts,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn all_active(&self, now_unix: i64) -> Result<Vec<BanRow>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM banlist WHERE end_ts IS NULL OR end_ts > ?1"))?;
        let rows = stmt.query_map(params![now_unix], row_to_ban)?;
        rows.collect::<Result<_, _>>().map_err(DbError::from)
    }

    pub fn delete(&self, id: i64) -> Result<(), DbError> {
        self.conn.execute("DELETE FROM banlist WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn delete_by_nick(&self, nick: &str) -> Result<usize, DbError> {
        Ok(self.conn.execute("DELETE FROM banlist WHERE nick = ?1", params![nick])?)
    }

    pub fn record_kick(&self, nick: &str, operator: &str, reason: &str, now_unix: i64) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO kicklist (nick, operator, reason, ts) VALUES (?1, ?2, ?3, ?4)",
            params![nick, operator, reason, now_unix],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use super::*;

    fn ban(nick: &str, end_ts: Option<i64>) -> BanRow {
        BanRow {
            id: 0,
            nick: Some(nick.to_string()),
            ip: None,
            ip_range: None,
            host: None,
            min_share: None,
            reason: "flood".to_string(),
            operator: "Hub-Security".to_string(),
            kind: "flood".to_string(),
            start_ts: 0,
            end_ts,
        }
    }

    #[test]
    fn expired_bans_are_excluded_from_active_set() {
        let db = Database::open_in_memory().unwrap();
        db.banlist().insert(&ban("spammer", Some(100))).unwrap();
        db.banlist().insert(&ban("permabanned", None)).unwrap();
        let active = db.banlist().all_active(200).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].nick.as_deref(), Some("permabanned"));
    }

    #[test]
    fn kick_is_recorded() {
        let db = Database::open_in_memory().unwrap();
        db.banlist().record_kick("rude", "op1", "language", 1000).unwrap();
    }
}
