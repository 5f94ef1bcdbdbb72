//! User profile repository.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::UserProfile;

/// Repository for per-principal display profiles.
pub struct ProfileRepo;

impl ProfileRepo {
    /// Load a principal's profile, if one was saved.
    pub fn get(conn: &Connection, principal: &str) -> Result<Option<UserProfile>> {
        let profile = conn
            .query_row(
                "SELECT name FROM user_profiles WHERE principal = ?1",
                [principal],
                |row| Ok(UserProfile { name: row.get(0)? }),
            )
            .optional()?;

        Ok(profile)
    }

    /// Save a principal's profile (insert or update).
    pub fn save(conn: &Connection, principal: &str, profile: &UserProfile) -> Result<()> {
        conn.execute(
            "INSERT INTO user_profiles (principal, name) VALUES (?1, ?2)
             ON CONFLICT(principal) DO UPDATE
             SET name = ?2, updated_at = datetime('now')",
            params![principal, profile.name],
        )?;

        Ok(())
    }
}
