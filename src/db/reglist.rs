//! `reglist` table: registered users (spec.md §6: "nick, class, password,
//! encryption kind, enabled, operator-note, user-note, first-login,
//! last-login").

use super::DbError;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// The credential kinds spec.md §4.3 names: "plain, legacy, md5 with
/// configured salt length".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Plain,
    Legacy,
    Md5,
}

impl CredentialKind {
    fn as_str(self) -> &'static str {
        match self {
            CredentialKind::Plain => "plain",
            CredentialKind::Legacy => "legacy",
            CredentialKind::Md5 => "md5",
        }
    }

    fn from_str(s: &str) -> CredentialKind {
        match s {
            "legacy" => CredentialKind::Legacy,
            "md5" => CredentialKind::Md5,
            _ => CredentialKind::Plain,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegUser {
    pub nick: String,
    pub class: u8,
    pub password: String,
    pub encryption: CredentialKind,
    pub enabled: bool,
    pub operator_note: String,
    pub user_note: String,
    pub first_login: Option<i64>,
    pub last_login: Option<i64>,
}

fn row_to_user(row: &Row) -> rusqlite::Result<RegUser> {
    Ok(RegUser {
        nick: row.get(0)?,
        class: row.get(1)?,
        password: row.get(2)?,
        encryption: CredentialKind::from_str(&row.get::<_, String>(3)?),
        enabled: row.get::<_, i64>(4)? != 0,
        operator_note: row.get(5)?,
        user_note: row.get(6)?,
        first_login: row.get(7)?,
        last_login: row.get(8)?,
    })
}

const COLUMNS: &str = "nick, class, password, encryption, enabled, operator_note, user_note, first_login, last_login";

pub struct RegListRepository<'a> {
    conn: &'a Connection,
}

impl<'a> RegListRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn find(&self, nick: &str) -> Result<Option<RegUser>, DbError> {
        Ok(self
            .conn
            .query_row(&format!("SELECT {COLUMNS} FROM reglist WHERE nick = ?1"), params![nick], row_to_user)
            .optional()?)
    }

    pub fn insert(&self, user: &RegUser) -> Result<(), DbError> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO reglist (nick, class, password, encryption, enabled, operator_note, user_note, first_login, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.nick,
                user.class,
                user.password,
                user.encryption.as_str(),
                user.enabled as i64,
                user.operator_note,
                user.user_note,
                user.first_login,
                user.last_login,
            ],
        )?;
        if changed == 0 {
            return Err(DbError::NickExists(user.nick.clone()));
        }
        Ok(())
    }

    pub fn update_class(&self, nick: &str, class: u8) -> Result<(), DbError> {
        self.require_exists(nick)?;
        self.conn.execute("UPDATE reglist SET class = ?1 WHERE nick = ?2", params![class, nick])?;
        Ok(())
    }

    pub fn update_password(&self, nick: &str, password: &str, encryption: CredentialKind) -> Result<(), DbError> {
        self.require_exists(nick)?;
        self.conn.execute(
            "UPDATE reglist SET password = ?1, encryption = ?2 WHERE nick = ?3",
            params![password, encryption.as_str(), nick],
        )?;
        Ok(())
    }

    pub fn touch_login(&self, nick: &str, now_unix: i64) -> Result<(), DbError> {
        self.require_exists(nick)?;
        self.conn.execute(
            "UPDATE reglist SET last_login = ?1, first_login = COALESCE(first_login, ?1) WHERE nick = ?2",
            params![now_unix, nick],
        )?;
        Ok(())
    }

    pub fn delete(&self, nick: &str) -> Result<(), DbError> {
        let changed = self.conn.execute("DELETE FROM reglist WHERE nick = ?1", params![nick])?;
        if changed == 0 {
            return Err(DbError::NickNotFound(nick.to_string()));
        }
        Ok(())
    }

    fn require_exists(&self, nick: &str) -> Result<(), DbError> {
        if self.find(nick)?.is_none() {
            return Err(DbError::NickNotFound(nick.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use super::*;

    fn user(nick: &str) -> RegUser {
        RegUser {
            nick: nick.to_string(),
            class: 2,
            password: "secret".to_string(),
            encryption: CredentialKind::Plain,
            enabled: true,
            operator_note: String::new(),
            user_note: String::new(),
            first_login: None,
            last_login: None,
        }
    }

    #[test]
    fn insert_then_find_round_trips() {
        let db = Database::open_in_memory().unwrap();
        db.reglist().insert(&user("alice")).unwrap();
        let found = db.reglist().find("alice").unwrap().unwrap();
        assert_eq!(found.class, 2);
        assert_eq!(found.encryption, CredentialKind::Plain);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.reglist().insert(&user("alice")).unwrap();
        assert!(matches!(db.reglist().insert(&user("alice")), Err(DbError::NickExists(_))));
    }

    #[test]
    fn touch_login_sets_first_login_once() {
        let db = Database::open_in_memory().unwrap();
        db.reglist().insert(&user("alice")).unwrap();
        db.reglist().touch_login("alice", 1000).unwrap();
        db.reglist().touch_login("alice", 2000).unwrap();
        let found = db.reglist().find("alice").unwrap().unwrap();
        assert_eq!(found.first_login, Some(1000));
        assert_eq!(found.last_login, Some(2000));
    }

    #[test]
    fn update_on_missing_nick_fails() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.reglist().update_class("ghost", 3), Err(DbError::NickNotFound(_))));
    }
}
