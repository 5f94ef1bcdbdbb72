//! Data models for database entities.
//!
//! Settings and activity records use the core types directly; only rows with
//! storage-specific fields are defined here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use incognibro_core::activity::{ActivityEntry, NewActivityEntry};
pub use incognibro_core::profile::UserProfile;
pub use incognibro_core::settings::PrivacySettings;

/// A stored block list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub id: i64,
    /// Normalized hostname.
    pub domain: String,
    /// Insertion order within the principal's list.
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// Parses a timestamp written either by us (RFC 3339) or by SQLite's
/// `datetime('now')`.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}
