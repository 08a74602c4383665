//! `zone` table: per-country-code user-count buckets (spec.md §6), fed by
//! the geolocation interface (`src/geo.rs`) on login.

use super::DbError;
use rusqlite::{params, Connection};

pub struct ZoneRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ZoneRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn increment(&self, country_code: &str, country_name: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO zone (country_code, country_name, user_count) VALUES (?1, ?2, 1)
             ON CONFLICT(country_code) DO UPDATE SET user_count = user_count + 1",
            params![country_code, country_name],
        )?;
        Ok(())
    }

    pub fn decrement(&self, country_code: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE zone SET user_count = MAX(user_count - 1, 0) WHERE country_code = ?1",
            params![country_code],
        )?;
        Ok(())
    }

    pub fn count_for(&self, country_code: &str) -> Result<u64, DbError> {
        Ok(self
            .conn
            .query_row(
                "SELECT user_count FROM zone WHERE country_code = ?1",
                params![country_code],
                |row| row.get::<_, i64>(0),
            )
            .unwrap_or(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::super::Database;

    #[test]
    fn increment_and_decrement_track_count() {
        let db = Database::open_in_memory().unwrap();
        db.zone().increment("US", "United States").unwrap();
        db.zone().increment("US", "United States").unwrap();
        assert_eq!(db.zone().count_for("US").unwrap(), 2);
        db.zone().decrement("US").unwrap();
        assert_eq!(db.zone().count_for("US").unwrap(), 1);
    }

    #[test]
    fn decrement_does_not_go_negative() {
        let db = Database::open_in_memory().unwrap();
        db.zone().increment("FR", "France").unwrap();
        db.zone().decrement("FR").unwrap();
        db.zone().decrement("FR").unwrap();
        assert_eq!(db.zone().count_for("FR").unwrap(), 0);
    }

    #[test]
    fn unknown_zone_counts_zero() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.zone().count_for("ZZ").unwrap(), 0);
    }
}
