//! Incognibro Core - Domain classification and blocklist logic.
//!
//! This crate provides the core functionality for the Incognibro privacy
//! dashboard. It handles:
//!
//! - Domain normalization and validation of free-form user input
//! - Tracker classification against the built-in and user block lists
//! - Optimistic block list mutations reconciled with a settings service
//! - The user's display profile
//! - Scan summaries for the protection activity log
//!
//! # Example
//!
//! ```
//! use incognibro_core::{get_effective_blocklist, is_tracker_domain, normalize, parse_domain_input};
//!
//! assert_eq!(normalize("https://www.Example.com:8080/path"), "example.com");
//!
//! let parsed = parse_domain_input("ads.doubleclick.net, not a domain");
//! assert!(parsed[0].is_valid);
//! assert!(!parsed[1].is_valid);
//!
//! let blocklist = get_effective_blocklist(&["my-tracker.example"]);
//! assert!(is_tracker_domain("ads.doubleclick.net", &blocklist));
//! assert!(is_tracker_domain("cdn.my-tracker.example", &blocklist));
//! ```

pub mod activity;
pub mod blocklist;
pub mod cache;
pub mod coordinator;
pub mod domain;
pub mod notices;
pub mod profile;
pub mod scan;
pub mod settings;

pub use activity::{
    ActivityEntry, ActivityLog, MemoryActivityLog, NewActivityEntry, ACTIVITY_LOG_CAPACITY,
};
pub use blocklist::{
    get_effective_blocklist, is_tracker_domain, EffectiveBlocklist, BUILT_IN_TRACKER_DOMAINS,
};
pub use cache::{CacheTicket, PendingMutation, QueryCache};
pub use coordinator::{BlocklistCoordinator, MutationOutcome, PRIVACY_SETTINGS_KEY};
pub use domain::{is_valid_hostname, normalize, parse_domain_input, DomainError, ParsedDomain};
pub use notices::{Notice, NoticeBoard, NoticeLevel};
pub use profile::{ProfileManager, ProfileService, UserProfile, USER_PROFILE_KEY};
pub use scan::{classify, scan, scan_and_log, ClassificationResult, InvalidDomain, ScanReport};
pub use settings::{
    BlocklistUpdateResult, PrivacySettings, RemoteError, RemoteResult, SettingsService,
};
