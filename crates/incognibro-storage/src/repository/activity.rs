//! Activity log repository.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::{parse_datetime, ActivityEntry, NewActivityEntry};

/// Repository for the protection activity log.
pub struct ActivityRepo;

impl ActivityRepo {
    /// Insert an entry and drop everything beyond the newest `capacity`
    /// entries, in one transaction.
    pub fn insert(
        conn: &Connection,
        entry: NewActivityEntry,
        capacity: usize,
    ) -> Result<ActivityEntry> {
        let created_at = Utc::now();
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO activity_log (target, detected_count, blocked_count, auto_stop_enabled, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.target,
                entry.detected_count,
                entry.blocked_count,
                entry.auto_stop_enabled,
                created_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "DELETE FROM activity_log WHERE id NOT IN
             (SELECT id FROM activity_log ORDER BY id DESC LIMIT ?1)",
            [i64::try_from(capacity).unwrap_or(i64::MAX)],
        )?;

        tx.commit()?;

        Ok(ActivityEntry {
            id,
            target: entry.target,
            detected_count: entry.detected_count,
            blocked_count: entry.blocked_count,
            auto_stop_enabled: entry.auto_stop_enabled,
            created_at,
        })
    }

    /// Get the most recent entries, newest first.
    pub fn get_recent(conn: &Connection, limit: usize) -> Result<Vec<ActivityEntry>> {
        let mut stmt = conn.prepare(
            "SELECT id, target, detected_count, blocked_count, auto_stop_enabled, created_at
             FROM activity_log ORDER BY id DESC LIMIT ?1",
        )?;

        let entries = stmt
            .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok(ActivityEntry {
                    id: row.get(0)?,
                    target: row.get(1)?,
                    detected_count: row.get(2)?,
                    blocked_count: row.get(3)?,
                    auto_stop_enabled: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Count stored entries.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM activity_log", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete every entry. Returns the number removed.
    pub fn clear(conn: &Connection) -> Result<usize> {
        let deleted = conn.execute("DELETE FROM activity_log", [])?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::run_migrations;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn entry(target: &str, detected: u32) -> NewActivityEntry {
        NewActivityEntry {
            target: target.to_string(),
            detected_count: detected,
            blocked_count: detected,
            auto_stop_enabled: true,
        }
    }

    #[test]
    fn test_insert_and_read_back() {
        let conn = setup_db();

        let stored = ActivityRepo::insert(&conn, entry("a.com", 2), 100).unwrap();
        let entries = ActivityRepo::get_recent(&conn, 10).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, stored.id);
        assert_eq!(entries[0].target, "a.com");
        assert_eq!(entries[0].detected_count, 2);
        assert!(entries[0].auto_stop_enabled);
    }

    #[test]
    fn test_newest_first() {
        let conn = setup_db();

        ActivityRepo::insert(&conn, entry("first", 0), 100).unwrap();
        ActivityRepo::insert(&conn, entry("second", 0), 100).unwrap();

        let targets: Vec<String> = ActivityRepo::get_recent(&conn, 10)
            .unwrap()
            .into_iter()
            .map(|e| e.target)
            .collect();
        assert_eq!(targets, ["second", "first"]);
    }

    #[test]
    fn test_insert_trims_to_capacity() {
        let conn = setup_db();

        for i in 0..5 {
            ActivityRepo::insert(&conn, entry(&format!("scan {i}"), 0), 3).unwrap();
        }

        assert_eq!(ActivityRepo::count(&conn).unwrap(), 3);
        let entries = ActivityRepo::get_recent(&conn, 10).unwrap();
        assert_eq!(entries[0].target, "scan 4");
        assert_eq!(entries[2].target, "scan 2");
    }

    #[test]
    fn test_undecodable_row_is_an_error() {
        let conn = setup_db();
        ActivityRepo::insert(&conn, entry("good", 1), 100).unwrap();
        conn.execute(
            "INSERT INTO activity_log
             (target, detected_count, blocked_count, auto_stop_enabled, created_at)
             VALUES ('bad', 'lots', 0, 1, '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        assert!(ActivityRepo::get_recent(&conn, 10).is_err());
    }

    #[test]
    fn test_clear() {
        let conn = setup_db();

        ActivityRepo::insert(&conn, entry("a", 0), 100).unwrap();
        ActivityRepo::insert(&conn, entry("b", 0), 100).unwrap();

        assert_eq!(ActivityRepo::clear(&conn).unwrap(), 2);
        assert_eq!(ActivityRepo::count(&conn).unwrap(), 0);
    }
}
