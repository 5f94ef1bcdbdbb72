//! Tracker scans.
//!
//! A scan parses user input, classifies every valid domain against the
//! effective blocklist, and produces the summary that goes into the activity
//! log.
//!
//! ```
//! use incognibro_core::scan::scan;
//! use incognibro_core::settings::PrivacySettings;
//!
//! let settings = PrivacySettings::default();
//! let report = scan("tracker.doubleclick.net\ngoogle.com", Some(&settings)).unwrap();
//!
//! assert_eq!(report.result.trackers, ["tracker.doubleclick.net"]);
//! assert_eq!(report.result.non_trackers, ["google.com"]);
//! assert_eq!(report.activity.blocked_count, 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::activity::{ActivityLog, NewActivityEntry};
use crate::blocklist::EffectiveBlocklist;
use crate::domain::{parse_domain_input, DomainError, ParsedDomain};
use crate::settings::PrivacySettings;

/// Maximum characters of input kept as the log target.
pub const TARGET_PREVIEW_LEN: usize = 50;

/// A rejected token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidDomain {
    /// The token as typed.
    pub domain: String,
    pub error: DomainError,
}

/// Per-scan classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub trackers: Vec<String>,
    pub non_trackers: Vec<String>,
    pub invalid: Vec<InvalidDomain>,
}

impl ClassificationResult {
    /// Total number of tokens seen.
    pub fn total(&self) -> usize {
        self.trackers.len() + self.non_trackers.len() + self.invalid.len()
    }
}

/// Everything a completed scan produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub result: ClassificationResult,
    pub auto_stop_enabled: bool,
    /// Summary for the activity log.
    pub activity: NewActivityEntry,
}

/// Sorts parsed tokens into trackers, non-trackers and rejects.
pub fn classify(parsed: &[ParsedDomain], blocklist: &EffectiveBlocklist) -> ClassificationResult {
    let mut result = ClassificationResult::default();

    for item in parsed {
        if !item.is_valid {
            result.invalid.push(InvalidDomain {
                domain: item.original.clone(),
                error: item.error.unwrap_or(DomainError::InvalidFormat),
            });
        } else if blocklist.is_tracker(&item.normalized) {
            result.trackers.push(item.normalized.clone());
        } else {
            result.non_trackers.push(item.normalized.clone());
        }
    }

    result
}

/// Runs a scan of `input` against the built-in list plus the user's list.
///
/// Returns `None` for blank input. Without settings the user list is empty
/// and auto-stop counts as enabled.
pub fn scan(input: &str, settings: Option<&PrivacySettings>) -> Option<ScanReport> {
    if input.trim().is_empty() {
        return None;
    }

    let defaults = PrivacySettings::default();
    let settings = settings.unwrap_or(&defaults);

    let blocklist = EffectiveBlocklist::new(&settings.block_list);
    let result = classify(&parse_domain_input(input), &blocklist);
    let auto_stop_enabled = settings.auto_stop_tracking;

    let detected_count = u32::try_from(result.trackers.len()).unwrap_or(u32::MAX);
    let activity = NewActivityEntry {
        target: preview_target(input),
        detected_count,
        blocked_count: if auto_stop_enabled { detected_count } else { 0 },
        auto_stop_enabled,
    };

    tracing::debug!(
        trackers = result.trackers.len(),
        non_trackers = result.non_trackers.len(),
        invalid = result.invalid.len(),
        auto_stop_enabled,
        "Scan complete"
    );

    Some(ScanReport {
        result,
        auto_stop_enabled,
        activity,
    })
}

/// Runs [`scan`] and appends its summary to `log`.
pub fn scan_and_log<L: ActivityLog>(
    input: &str,
    settings: Option<&PrivacySettings>,
    log: &L,
) -> Result<Option<ScanReport>, L::Error> {
    let Some(report) = scan(input, settings) else {
        return Ok(None);
    };

    log.add_entry(report.activity.clone())?;
    Ok(Some(report))
}

/// Truncates raw input for display in the activity log.
pub fn preview_target(input: &str) -> String {
    if input.chars().count() > TARGET_PREVIEW_LEN {
        let head: String = input.chars().take(TARGET_PREVIEW_LEN).collect();
        format!("{}...", head)
    } else {
        input.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::MemoryActivityLog;

    fn settings(block_list: &[&str], auto_stop: bool) -> PrivacySettings {
        PrivacySettings {
            block_list: block_list.iter().map(|d| d.to_string()).collect(),
            auto_stop_tracking: auto_stop,
        }
    }

    #[test]
    fn scan_scenario_with_auto_stop() {
        let log = MemoryActivityLog::new();
        let settings = settings(&["doubleclick.net"], true);

        let report = scan_and_log("tracker.doubleclick.net\ngoogle.com", Some(&settings), &log)
            .unwrap()
            .unwrap();

        assert_eq!(report.result.trackers, ["tracker.doubleclick.net"]);
        assert_eq!(report.result.non_trackers, ["google.com"]);
        assert!(report.result.invalid.is_empty());

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].detected_count, 1);
        assert_eq!(entries[0].blocked_count, 1);
        assert!(entries[0].auto_stop_enabled);
        assert_eq!(entries[0].target, "tracker.doubleclick.net\ngoogle.com");
    }

    #[test]
    fn scan_without_auto_stop_blocks_nothing() {
        let settings = settings(&[], false);
        let report = scan("ads.hotjar.com, sentry.io", Some(&settings)).unwrap();

        assert_eq!(report.activity.detected_count, 2);
        assert_eq!(report.activity.blocked_count, 0);
        assert!(!report.activity.auto_stop_enabled);
    }

    #[test]
    fn scan_uses_user_list() {
        let settings = settings(&["my-tracker.example"], true);
        let report = scan("cdn.my-tracker.example", Some(&settings)).unwrap();
        assert_eq!(report.result.trackers, ["cdn.my-tracker.example"]);
    }

    #[test]
    fn scan_without_settings_uses_defaults() {
        let report = scan("https://www.google-analytics.com/collect", None).unwrap();

        assert_eq!(report.result.trackers, ["google-analytics.com"]);
        assert!(report.auto_stop_enabled);
        assert_eq!(report.activity.blocked_count, 1);
    }

    #[test]
    fn scan_collects_invalid_tokens() {
        let report = scan("good.com\nnot a domain!!\nhttps://", None).unwrap();

        assert_eq!(report.result.non_trackers, ["good.com"]);
        assert_eq!(
            report.result.invalid,
            [
                InvalidDomain {
                    domain: "not a domain!!".into(),
                    error: DomainError::InvalidFormat,
                },
                InvalidDomain {
                    domain: "https://".into(),
                    error: DomainError::Empty,
                },
            ]
        );
        assert_eq!(report.result.total(), 3);
    }

    #[test]
    fn blank_input_is_not_scanned_or_logged() {
        let log = MemoryActivityLog::new();
        assert!(scan_and_log("  \n ", None, &log).unwrap().is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn preview_truncates_long_input() {
        let long = "a".repeat(60);
        let preview = preview_target(&long);
        assert_eq!(preview, format!("{}...", "a".repeat(50)));

        let exact = "b".repeat(50);
        assert_eq!(preview_target(&exact), exact);
    }

    #[test]
    fn preview_counts_characters() {
        let input = "é".repeat(51);
        let preview = preview_target(&input);
        assert_eq!(preview.chars().count(), 53);
    }
}
