//! Tracker blocklist: built-in entries, merging, and classification.
//!
//! A domain is a tracker when it equals a blocklist entry or is a proper
//! subdomain of one. Both sides are normalized before comparison, so matching
//! is case-insensitive and ignores schemes, `www.`, paths and ports.
//!
//! ```
//! use incognibro_core::blocklist::is_tracker_domain;
//!
//! let list = ["doubleclick.net"];
//! assert!(is_tracker_domain("ads.doubleclick.net", &list));
//! assert!(!is_tracker_domain("notdoubleclick.net", &list));
//! assert!(!is_tracker_domain("doubleclick.net.evil.com", &list));
//! ```

use std::collections::HashSet;

use crate::domain::normalize;

/// Known tracking domains, blocked for every user.
///
/// Order is significant: it is the display order and the prefix of every
/// effective blocklist. Some entries carry a path; they match on their host.
pub const BUILT_IN_TRACKER_DOMAINS: &[&str] = &[
    // Google
    "doubleclick.net",
    "google-analytics.com",
    "googletagmanager.com",
    // Meta
    "facebook.com",
    "facebook.net",
    "connect.facebook.net",
    // X / Twitter
    "analytics.twitter.com",
    "ads.twitter.com",
    "ads-twitter.com",
    "pixel.twitter.com",
    "static.ads-twitter.com",
    // TikTok
    "analytics.tiktok.com",
    "ads.tiktok.com",
    // LinkedIn
    "ads.linkedin.com",
    "analytics.linkedin.com",
    // Pinterest
    "ads.pinterest.com",
    "analytics.pinterest.com",
    // Audience measurement
    "scorecardresearch.com",
    "quantserve.com",
    // Session replay and product analytics
    "hotjar.com",
    "mouseflow.com",
    "crazyegg.com",
    "mixpanel.com",
    "segment.com",
    "amplitude.com",
    "fullstory.com",
    "logrocket.com",
    // Error and performance monitoring
    "newrelic.com",
    "sentry.io",
    "bugsnag.com",
    "rollbar.com",
    "trackjs.com",
    // Microsoft
    "clarity.ms",
    "bing.com/analytics",
    // Regional
    "yandex.ru/metrika",
    "baidu.com/analytics",
];

/// Merges the built-in list with a user list.
///
/// Built-in entries come first in their fixed order, then user entries that
/// are not already present. Duplicates are detected on the stored strings as
/// given; callers normalize user entries before storing them.
pub fn get_effective_blocklist<S: AsRef<str>>(user_list: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();

    BUILT_IN_TRACKER_DOMAINS
        .iter()
        .copied()
        .chain(user_list.iter().map(AsRef::as_ref))
        .filter(|entry| seen.insert(*entry))
        .map(str::to_string)
        .collect()
}

/// Returns true if `domain` equals, or is a subdomain of, any entry.
///
/// The domain and each entry are normalized first. The first matching entry
/// wins; there is no allow-list.
pub fn is_tracker_domain<S: AsRef<str>>(domain: &str, blocklist: &[S]) -> bool {
    let domain = normalize(domain);

    blocklist.iter().any(|entry| {
        let entry = normalize(entry.as_ref());
        domain == entry || is_proper_subdomain(&domain, &entry)
    })
}

/// `ads.example.com` is a proper subdomain of `example.com`;
/// `notexample.com` is not.
fn is_proper_subdomain(domain: &str, parent: &str) -> bool {
    domain
        .strip_suffix(parent)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

/// An effective blocklist with its entries pre-normalized for lookups.
///
/// Built once per scan and then read without further allocation, so a scan
/// keeps using the snapshot it started with even if the user list changes.
#[derive(Debug, Clone, Default)]
pub struct EffectiveBlocklist {
    entries: Vec<String>,
    index: HashSet<String>,
}

impl EffectiveBlocklist {
    /// Builds the built-in list merged with `user_list`.
    pub fn new<S: AsRef<str>>(user_list: &[S]) -> Self {
        Self::from_entries(get_effective_blocklist(user_list))
    }

    /// Wraps an already merged list.
    pub fn from_entries(entries: Vec<String>) -> Self {
        let index = entries.iter().map(|e| normalize(e)).collect();
        Self { entries, index }
    }

    /// Entries in effective order, as stored.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Same answer as [`is_tracker_domain`] over [`Self::entries`].
    ///
    /// Walks the domain's parent suffixes (`a.b.c`, `b.c`, `c`) and looks each
    /// up in the normalized index.
    pub fn is_tracker(&self, domain: &str) -> bool {
        let domain = normalize(domain);
        let mut part = domain.as_str();

        loop {
            if self.index.contains(part) {
                return true;
            }

            match part.find('.') {
                Some(idx) => part = &part[idx + 1..],
                None => return false,
            }
        }
    }
}
