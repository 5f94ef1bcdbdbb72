//! Incognibro Storage - SQLite persistence layer.
//!
//! This crate provides database storage functionality for Incognibro.
//! It handles:
//!
//! - Per-principal privacy settings (custom block list, auto-stop flag)
//! - Per-principal display profiles
//! - The protection activity log (newest 100 scans)
//! - A [`SettingsService`](incognibro_core::SettingsService) over the local
//!   database for offline use
//!
//! # Example
//!
//! ```no_run
//! use incognibro_storage::Database;
//!
//! let db = Database::in_memory().unwrap();
//!
//! let result = db.add_block_entry("alice", "https://www.tracker.example/p").unwrap();
//! assert_eq!(result.new_blocklist, ["tracker.example"]);
//!
//! let settings = db.get_privacy_settings("alice").unwrap();
//! assert!(settings.auto_stop_tracking);
//! ```

mod database;
pub mod error;
pub mod local;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use database::Database;
pub use error::{Result, StorageError};
pub use local::LocalSettingsService;
pub use models::{ActivityEntry, BlockEntry, NewActivityEntry, PrivacySettings, UserProfile};
pub use pool::ConnectionPool;
pub use repository::{ActivityRepo, ProfileRepo, SettingsRepo};
