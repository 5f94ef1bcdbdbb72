//! Domain normalization and input parsing.
//!
//! Turns arbitrary user text (URLs, bare hostnames, lists of either) into
//! canonical hostnames that can be compared against a blocklist.
//!
//! ## Normalization
//!
//! ```text
//! "HTTPS://WWW.Example.COM:8080/path?x=1"  →  "example.com"
//! ```
//!
//! 1. trim and lowercase
//! 2. drop a leading `http://` / `https://`
//! 3. drop one leading `www.`
//! 4. cut at the first `/`, `?` or `#`
//! 5. cut at the first `:` (port)
//!
//! The steps repeat until the value is stable.
//!
//! ## Parsing
//!
//! ```
//! use incognibro_core::domain::parse_domain_input;
//!
//! let parsed = parse_domain_input("a.com, b.com;\nc.com");
//! let hosts: Vec<_> = parsed.iter().map(|p| p.normalized.as_str()).collect();
//! assert_eq!(hosts, ["a.com", "b.com", "c.com"]);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Hostname grammar: dot-separated labels of `[a-z0-9-]`, no leading or
/// trailing hyphen in any label.
static HOSTNAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*$")
        .expect("hostname pattern is valid")
});

/// Characters that separate domains in multi-domain input.
const INPUT_SEPARATORS: [char; 3] = ['\n', ',', ';'];

const SCHEMES: [&str; 2] = ["https://", "http://"];

/// Canonicalizes a URL or bare domain into a comparable hostname.
///
/// The steps are repeated until the value stops changing, so the result is a
/// fixed point: `normalize(&normalize(x)) == normalize(x)` for every input.
/// The result may be empty (e.g. for `"https://"`); validity is checked by
/// [`parse_domain_input`], not here.
///
/// # Examples
///
/// ```
/// use incognibro_core::domain::normalize;
///
/// assert_eq!(normalize("HTTPS://WWW.Foo.COM/bar?x=1#y"), "foo.com");
/// assert_eq!(normalize("foo.com:8080"), "foo.com");
/// assert_eq!(normalize("Example.com/"), "example.com");
/// ```
pub fn normalize(input: &str) -> String {
    let mut current = normalize_once(input);
    loop {
        // Later passes only remove characters, so this terminates.
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let mut host = lowered.as_str();

    for scheme in SCHEMES {
        if let Some(rest) = host.strip_prefix(scheme) {
            host = rest;
            break;
        }
    }

    host = host.strip_prefix("www.").unwrap_or(host);

    if let Some(end) = host.find(['/', '?', '#']) {
        host = &host[..end];
    }

    if let Some(end) = host.find(':') {
        host = &host[..end];
    }

    host.to_string()
}

/// Returns true if `host` is a well-formed, already-normalized hostname.
pub fn is_valid_hostname(host: &str) -> bool {
    HOSTNAME_PATTERN.is_match(host)
}

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainError {
    /// Nothing left after normalization.
    #[serde(rename = "Empty domain")]
    Empty,
    /// Normalized value does not follow hostname grammar.
    #[serde(rename = "Invalid domain format")]
    InvalidFormat,
    /// Processing the token failed unexpectedly.
    #[serde(rename = "Parse error")]
    ParseError,
}

impl DomainError {
    /// Human-readable reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "Empty domain",
            Self::InvalidFormat => "Invalid domain format",
            Self::ParseError => "Parse error",
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for DomainError {}

/// One token of scan input after normalization and validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDomain {
    /// The trimmed token as the user typed it.
    pub original: String,
    /// Normalized hostname. Empty for `Empty` and `ParseError` rejections.
    pub normalized: String,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DomainError>,
}

impl ParsedDomain {
    fn valid(original: &str, normalized: String) -> Self {
        Self {
            original: original.to_string(),
            normalized,
            is_valid: true,
            error: None,
        }
    }

    fn invalid(original: &str, normalized: String, error: DomainError) -> Self {
        Self {
            original: original.to_string(),
            normalized,
            is_valid: false,
            error: Some(error),
        }
    }

    /// Classifies a single trimmed, non-empty token.
    fn from_token(token: &str) -> Self {
        let normalized = normalize(token);

        if normalized.is_empty() {
            Self::invalid(token, normalized, DomainError::Empty)
        } else if !is_valid_hostname(&normalized) {
            Self::invalid(token, normalized, DomainError::InvalidFormat)
        } else {
            Self::valid(token, normalized)
        }
    }
}

/// Splits `input` on newlines, commas and semicolons and validates each
/// non-empty token, preserving input order.
///
/// Empty tokens produce no entry. A failure while handling one token marks
/// only that token as [`DomainError::ParseError`].
pub fn parse_domain_input(input: &str) -> Vec<ParsedDomain> {
    split_tokens(input)
        .map(|token| {
            panic::catch_unwind(AssertUnwindSafe(|| ParsedDomain::from_token(token)))
                .unwrap_or_else(|_| {
                    tracing::warn!(token, "Failed to parse domain token");
                    ParsedDomain::invalid(token, String::new(), DomainError::ParseError)
                })
        })
        .collect()
}

fn split_tokens(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(INPUT_SEPARATORS)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== normalize Tests ====================

    #[test]
    fn normalize_strips_scheme_www_path_and_port() {
        assert_eq!(normalize("HTTPS://WWW.Example.COM:8080/path?x=1"), "example.com");
        assert_eq!(normalize("HTTPS://WWW.Foo.COM/bar?x=1#y"), "foo.com");
    }

    #[test]
    fn normalize_bare_domain() {
        assert_eq!(normalize("Example.com/"), "example.com");
        assert_eq!(normalize("  example.com  "), "example.com");
    }

    #[test]
    fn normalize_strips_port() {
        assert_eq!(normalize("foo.com:8080"), "foo.com");
        assert_eq!(normalize("http://localhost:3000"), "localhost");
    }

    #[test]
    fn normalize_query_before_path() {
        assert_eq!(normalize("foo.com?next=/a/b"), "foo.com");
        assert_eq!(normalize("foo.com#frag/x"), "foo.com");
    }

    #[test]
    fn normalize_reaches_fixed_point() {
        assert_eq!(normalize("www.www.example.com"), "example.com");
        assert_eq!(normalize("a.com /x"), "a.com");
        assert_eq!(normalize("https:// www.a.com"), "a.com");
    }

    #[test]
    fn normalize_keeps_other_schemes() {
        // Only http(s) is recognised, so the colon acts as a port separator.
        assert_eq!(normalize("ftp://example.com"), "ftp");
    }

    #[test]
    fn normalize_can_be_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("https://"), "");
        assert_eq!(normalize("/path"), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "HTTPS://WWW.Example.COM:8080/path?x=1",
            "www.www.example.com",
            "http://https://example.com",
            "https://www.http://x.com",
            "  Mixed.Case.ORG  ",
            "not a domain!!",
            "www.",
            "ads.doubleclick.net:443",
            "https:// www.a.com",
            "a.com /x",
            "",
        ];

        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    // ==================== is_valid_hostname Tests ====================

    #[test]
    fn hostname_grammar() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("a-b.c0m"));
        assert!(is_valid_hostname("localhost"));
        assert!(is_valid_hostname("1.2.3.4"));

        assert!(!is_valid_hostname("-example.com"));
        assert!(!is_valid_hostname("example-.com"));
        assert!(!is_valid_hostname("example..com"));
        assert!(!is_valid_hostname(".example.com"));
        assert!(!is_valid_hostname("exa_mple.com"));
        assert!(!is_valid_hostname("not a domain!!"));
        assert!(!is_valid_hostname("bücher.de"));
    }

    // ==================== parse_domain_input Tests ====================

    #[test]
    fn parse_splits_and_trims() {
        let parsed = parse_domain_input("a.com, b.com;\nc.com");

        assert_eq!(parsed.len(), 3);
        assert!(parsed.iter().all(|p| p.is_valid));
        let hosts: Vec<_> = parsed.iter().map(|p| p.normalized.as_str()).collect();
        assert_eq!(hosts, ["a.com", "b.com", "c.com"]);
    }

    #[test]
    fn parse_drops_empty_tokens() {
        let parsed = parse_domain_input(",,\n ; a.com ;;\n\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].original, "a.com");
    }

    #[test]
    fn parse_flags_invalid_format() {
        let parsed = parse_domain_input("not a domain!!");

        assert_eq!(parsed.len(), 1);
        assert!(!parsed[0].is_valid);
        assert_eq!(parsed[0].error, Some(DomainError::InvalidFormat));
        assert_eq!(parsed[0].normalized, "not a domain!!");
    }

    #[test]
    fn parse_flags_empty_after_normalization() {
        let parsed = parse_domain_input("https://");

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].original, "https://");
        assert_eq!(parsed[0].normalized, "");
        assert_eq!(parsed[0].error, Some(DomainError::Empty));
    }

    #[test]
    fn parse_keeps_original_text() {
        let parsed = parse_domain_input("  HTTPS://WWW.Tracker.io/pixel  ");

        assert_eq!(parsed[0].original, "HTTPS://WWW.Tracker.io/pixel");
        assert_eq!(parsed[0].normalized, "tracker.io");
        assert!(parsed[0].is_valid);
    }

    #[test]
    fn parse_preserves_order_with_mixed_validity() {
        let parsed = parse_domain_input("good.com\nbad_host\nhttps://\nalso-good.net");
        let validity: Vec<_> = parsed.iter().map(|p| p.is_valid).collect();
        assert_eq!(validity, [true, false, false, true]);
    }

    #[test]
    fn parse_empty_input() {
        assert!(parse_domain_input("").is_empty());
        assert!(parse_domain_input("  \n , ; ").is_empty());
    }

    #[test]
    fn domain_error_serializes_as_reason() {
        let json = serde_json::to_string(&DomainError::InvalidFormat).unwrap();
        assert_eq!(json, "\"Invalid domain format\"");
        assert_eq!(DomainError::Empty.to_string(), "Empty domain");
    }
}
