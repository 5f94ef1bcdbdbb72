//! High-level database interface.

use std::path::PathBuf;

use directories::ProjectDirs;
use incognibro_core::activity::{ActivityLog, ACTIVITY_LOG_CAPACITY};
use incognibro_core::domain::{is_valid_hostname, normalize};
use incognibro_core::settings::BlocklistUpdateResult;
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::models::{ActivityEntry, BlockEntry, NewActivityEntry, PrivacySettings, UserProfile};
use crate::pool::ConnectionPool;
use crate::repository::{ActivityRepo, ProfileRepo, SettingsRepo};

/// High-level database interface for Incognibro.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "incognibro", "incognibro")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("incognibro.db"))
    }

    // === Privacy settings ===

    /// Get a principal's privacy settings.
    pub fn get_privacy_settings(&self, principal: &str) -> Result<PrivacySettings> {
        let conn = self.pool.get()?;
        SettingsRepo::get(&conn, principal)
    }

    /// Set a principal's auto-stop preference.
    pub fn set_auto_stop_tracking(&self, principal: &str, enabled: bool) -> Result<()> {
        let conn = self.pool.get()?;
        SettingsRepo::set_auto_stop(&conn, principal, enabled)?;

        info!(principal, enabled, "Auto-stop tracking stored");
        Ok(())
    }

    /// Get a principal's block list entries with metadata.
    pub fn get_block_entries(&self, principal: &str) -> Result<Vec<BlockEntry>> {
        let conn = self.pool.get()?;
        SettingsRepo::get_entries(&conn, principal)
    }

    /// Add a domain to a principal's block list.
    ///
    /// The domain is normalized before it is stored. Adding a domain that is
    /// already present is not an error; the result has `success == false`.
    pub fn add_block_entry(&self, principal: &str, domain: &str) -> Result<BlocklistUpdateResult> {
        let normalized = normalize(domain);
        if normalized.is_empty() || !is_valid_hostname(&normalized) {
            return Err(StorageError::InvalidDomain(domain.to_string()));
        }

        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let inserted = SettingsRepo::insert_entry(&tx, principal, &normalized)?;
        let new_blocklist = SettingsRepo::get(&tx, principal)?.block_list;
        tx.commit()?;

        if inserted {
            info!(principal, domain = %normalized, "Block entry added");
            Ok(BlocklistUpdateResult::applied(
                new_blocklist,
                format!("Added {} to blocklist", normalized),
            ))
        } else {
            debug!(principal, domain = %normalized, "Block entry already present");
            Ok(BlocklistUpdateResult::unchanged(
                new_blocklist,
                format!("{} is already in your blocklist", normalized),
            ))
        }
    }

    /// Remove a domain from a principal's block list.
    ///
    /// Matches the stored entry exactly, or after normalization. Removing a
    /// domain that is not present yields `success == false`.
    pub fn remove_block_entry(
        &self,
        principal: &str,
        domain: &str,
    ) -> Result<BlocklistUpdateResult> {
        let normalized = normalize(domain);
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;

        let removed = SettingsRepo::delete_entry(&tx, principal, domain)?
            || (!normalized.is_empty()
                && normalized != domain
                && SettingsRepo::delete_entry(&tx, principal, &normalized)?);
        let new_blocklist = SettingsRepo::get(&tx, principal)?.block_list;
        tx.commit()?;

        let shown: &str = if normalized.is_empty() { domain } else { &normalized };

        if removed {
            info!(principal, domain = %shown, "Block entry removed");
            Ok(BlocklistUpdateResult::applied(
                new_blocklist,
                format!("Removed {} from blocklist", shown),
            ))
        } else {
            debug!(principal, domain = %shown, "Block entry not present");
            Ok(BlocklistUpdateResult::unchanged(
                new_blocklist,
                format!("{} is not in your blocklist", shown),
            ))
        }
    }

    // === Profiles ===

    /// Get a principal's profile, if one was saved.
    pub fn get_user_profile(&self, principal: &str) -> Result<Option<UserProfile>> {
        let conn = self.pool.get()?;
        ProfileRepo::get(&conn, principal)
    }

    /// Save a principal's profile. The name is trimmed and must not be blank.
    pub fn save_user_profile(
        &self,
        principal: &str,
        profile: &UserProfile,
    ) -> Result<UserProfile> {
        let name = profile.name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidProfile("name must not be empty".into()));
        }

        let profile = UserProfile::new(name);
        let conn = self.pool.get()?;
        ProfileRepo::save(&conn, principal, &profile)?;

        info!(principal, "Profile saved");
        Ok(profile)
    }

    // === Activity log ===

    /// Append an activity entry, keeping only the newest entries.
    pub fn log_activity(&self, entry: NewActivityEntry) -> Result<ActivityEntry> {
        let conn = self.pool.get()?;
        ActivityRepo::insert(&conn, entry, ACTIVITY_LOG_CAPACITY)
    }

    /// Get the activity log, newest first.
    pub fn get_activity(&self) -> Result<Vec<ActivityEntry>> {
        let conn = self.pool.get()?;
        ActivityRepo::get_recent(&conn, ACTIVITY_LOG_CAPACITY)
    }

    /// Count stored activity entries.
    pub fn count_activity(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        ActivityRepo::count(&conn)
    }

    /// Delete the activity log.
    pub fn clear_activity(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        let removed = ActivityRepo::clear(&conn)?;

        info!(removed, "Activity log cleared");
        Ok(removed)
    }
}

impl ActivityLog for Database {
    type Error = StorageError;

    fn add_entry(&self, entry: NewActivityEntry) -> Result<ActivityEntry> {
        self.log_activity(entry)
    }

    fn clear_log(&self) -> Result<()> {
        self.clear_activity().map(|_| ())
    }

    fn entries(&self) -> Result<Vec<ActivityEntry>> {
        self.get_activity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incognibro_core::scan::scan_and_log;

    const ALICE: &str = "alice";

    #[test]
    fn test_add_normalizes_domain() {
        let db = Database::in_memory().unwrap();

        let result = db
            .add_block_entry(ALICE, "https://www.Tracker.Example/pixel")
            .unwrap();

        assert!(result.success);
        assert_eq!(result.new_blocklist, ["tracker.example"]);
        assert_eq!(result.message, "Added tracker.example to blocklist");
    }

    #[test]
    fn test_add_duplicate_is_soft_failure() {
        let db = Database::in_memory().unwrap();
        db.add_block_entry(ALICE, "a.com").unwrap();

        let result = db.add_block_entry(ALICE, "WWW.A.COM").unwrap();

        assert!(!result.success);
        assert_eq!(result.new_blocklist, ["a.com"]);
        assert_eq!(result.message, "a.com is already in your blocklist");
    }

    #[test]
    fn test_add_rejects_invalid_domain() {
        let db = Database::in_memory().unwrap();

        assert!(matches!(
            db.add_block_entry(ALICE, "https://"),
            Err(StorageError::InvalidDomain(_))
        ));
        assert!(matches!(
            db.add_block_entry(ALICE, "not a domain"),
            Err(StorageError::InvalidDomain(_))
        ));
        assert!(db.get_privacy_settings(ALICE).unwrap().block_list.is_empty());
    }

    #[test]
    fn test_remove() {
        let db = Database::in_memory().unwrap();
        db.add_block_entry(ALICE, "a.com").unwrap();
        db.add_block_entry(ALICE, "b.com").unwrap();

        let result = db.remove_block_entry(ALICE, "a.com").unwrap();
        assert!(result.success);
        assert_eq!(result.new_blocklist, ["b.com"]);
        assert_eq!(result.message, "Removed a.com from blocklist");

        let result = db.remove_block_entry(ALICE, "a.com").unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "a.com is not in your blocklist");
    }

    #[test]
    fn test_remove_matches_normalized_form() {
        let db = Database::in_memory().unwrap();
        db.add_block_entry(ALICE, "a.com").unwrap();

        let result = db.remove_block_entry(ALICE, "http://www.a.com/").unwrap();
        assert!(result.success);
        assert!(result.new_blocklist.is_empty());
    }

    #[test]
    fn test_settings_round_trip() {
        let db = Database::in_memory().unwrap();
        db.add_block_entry(ALICE, "a.com").unwrap();
        db.set_auto_stop_tracking(ALICE, false).unwrap();

        let settings = db.get_privacy_settings(ALICE).unwrap();
        assert_eq!(settings.block_list, ["a.com"]);
        assert!(!settings.auto_stop_tracking);
    }

    #[test]
    fn test_profile_round_trip() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.get_user_profile(ALICE).unwrap(), None);

        let saved = db
            .save_user_profile(ALICE, &UserProfile::new("  Alice "))
            .unwrap();
        assert_eq!(saved.name, "Alice");
        assert_eq!(db.get_user_profile(ALICE).unwrap(), Some(saved));
    }

    #[test]
    fn test_blank_profile_name_rejected() {
        let db = Database::in_memory().unwrap();

        assert!(matches!(
            db.save_user_profile(ALICE, &UserProfile::new(" ")),
            Err(StorageError::InvalidProfile(_))
        ));
        assert_eq!(db.get_user_profile(ALICE).unwrap(), None);
    }

    #[test]
    fn test_scan_logs_to_database() {
        let db = Database::in_memory().unwrap();
        let settings = PrivacySettings::default();

        scan_and_log("tracker.doubleclick.net\ngoogle.com", Some(&settings), &db)
            .unwrap()
            .unwrap();

        let entries = db.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].detected_count, 1);
        assert_eq!(entries[0].blocked_count, 1);

        db.clear_log().unwrap();
        assert_eq!(db.count_activity().unwrap(), 0);
    }

    #[test]
    fn test_activity_capped() {
        let db = Database::in_memory().unwrap();

        for i in 0..(ACTIVITY_LOG_CAPACITY + 2) {
            db.log_activity(NewActivityEntry {
                target: format!("scan {i}"),
                detected_count: 0,
                blocked_count: 0,
                auto_stop_enabled: true,
            })
            .unwrap();
        }

        let entries = db.get_activity().unwrap();
        assert_eq!(entries.len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(entries[0].target, format!("scan {}", ACTIVITY_LOG_CAPACITY + 1));
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("incognibro.db");

        {
            let db = Database::with_path(&path).unwrap();
            db.add_block_entry(ALICE, "a.com").unwrap();
        }

        let db = Database::with_path(&path).unwrap();
        assert_eq!(db.get_privacy_settings(ALICE).unwrap().block_list, ["a.com"]);
    }
}
