//! Privacy settings repository.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{parse_datetime, BlockEntry, PrivacySettings};

/// Repository for per-principal privacy settings.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Load a principal's settings. Principals without rows get the defaults.
    pub fn get(conn: &Connection, principal: &str) -> Result<PrivacySettings> {
        let auto_stop_tracking = Self::get_auto_stop(conn, principal)?;
        let block_list = Self::get_entries(conn, principal)?
            .into_iter()
            .map(|entry| entry.domain)
            .collect();

        Ok(PrivacySettings {
            block_list,
            auto_stop_tracking,
        })
    }

    /// Get the auto-stop flag, defaulting to enabled.
    pub fn get_auto_stop(conn: &Connection, principal: &str) -> Result<bool> {
        let enabled: Option<bool> = conn
            .query_row(
                "SELECT auto_stop_tracking FROM privacy_settings WHERE principal = ?1",
                [principal],
                |row| row.get(0),
            )
            .optional()?;

        Ok(enabled.unwrap_or(true))
    }

    /// Set the auto-stop flag (insert or update).
    pub fn set_auto_stop(conn: &Connection, principal: &str, enabled: bool) -> Result<()> {
        conn.execute(
            "INSERT INTO privacy_settings (principal, auto_stop_tracking) VALUES (?1, ?2)
             ON CONFLICT(principal) DO UPDATE
             SET auto_stop_tracking = ?2, updated_at = datetime('now')",
            params![principal, enabled],
        )?;

        Ok(())
    }

    /// Get a principal's block list entries in insertion order.
    pub fn get_entries(conn: &Connection, principal: &str) -> Result<Vec<BlockEntry>> {
        let mut stmt = conn.prepare(
            "SELECT id, domain, position, created_at FROM block_entries
             WHERE principal = ?1 ORDER BY position, id",
        )?;

        let entries = stmt
            .query_map([principal], |row| {
                Ok(BlockEntry {
                    id: row.get(0)?,
                    domain: row.get(1)?,
                    position: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Append an entry. Returns false if the principal already has it.
    pub fn insert_entry(conn: &Connection, principal: &str, domain: &str) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO block_entries (principal, domain, position)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1
                              FROM block_entries WHERE principal = ?1))",
            params![principal, domain],
        )?;

        Ok(inserted > 0)
    }

    /// Delete an entry. Returns false if the principal did not have it.
    pub fn delete_entry(conn: &Connection, principal: &str, domain: &str) -> Result<bool> {
        let deleted = conn.execute(
            "DELETE FROM block_entries WHERE principal = ?1 AND domain = ?2",
            params![principal, domain],
        )?;

        Ok(deleted > 0)
    }
}
