//! Origin allow-list matching.
//!
//! # Responsibilities
//! - Compile the configured allow-list once at startup
//! - Decide whether a browser `Origin` may receive cross-origin permission
//!
//! # Matching Order
//! First match wins:
//! 1. Exact string match (raw header value or its serialized origin)
//! 2. Scheme-qualified entries: hostname equality, scheme and port ignored
//! 3. `.example.com` entries: hostname suffix (any subdomain depth)
//! 4. Bare hostname entries: hostname equality
//! 5. Dev mode only: `http(s)://localhost` / `http(s)://127.0.0.1`, any port
//!
//! An empty allow-list allows every origin. This is a deliberately permissive
//! bring-up mode and is logged as a warning at startup.
//!
//! # Design Decisions
//! - Pure functions only; the axum adapter lives in `cors.rs`
//! - Missing/empty `Origin` is always allowed (same-origin or non-browser)
//! - Unparseable origins are denied, never panic

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

static DEV_LOCALHOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(localhost|127\.0\.0\.1)(:\d+)?$").expect("static regex")
});

/// Why an allow-list entry was rejected at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OriginEntryError {
    #[error("entry is empty")]
    Empty,

    #[error("suffix entry has no domain after the leading dot")]
    EmptySuffix,

    #[error("origin has no host")]
    MissingHost,

    #[error("malformed origin: {0}")]
    Malformed(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryKind {
    /// `https://app.example.com[:port]`; holds the lowercase hostname.
    SchemeQualified(String),
    /// `.example.com`, kept with its leading dot.
    Suffix(String),
    /// `app.example.com`.
    Host(String),
}

/// A single compiled allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginEntry {
    raw: String,
    kind: EntryKind,
}

impl OriginEntry {
    /// Classify and compile an entry.
    pub fn parse(raw: &str) -> Result<Self, OriginEntryError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(OriginEntryError::Empty);
        }

        let kind = if raw.starts_with('.') {
            if raw.len() == 1 {
                return Err(OriginEntryError::EmptySuffix);
            }
            EntryKind::Suffix(raw.to_ascii_lowercase())
        } else if raw.contains("://") {
            let url = Url::parse(raw)?;
            let host = url.host_str().ok_or(OriginEntryError::MissingHost)?;
            EntryKind::SchemeQualified(host.to_ascii_lowercase())
        } else {
            EntryKind::Host(raw.to_ascii_lowercase())
        };

        Ok(Self {
            raw: raw.to_string(),
            kind,
        })
    }

    /// The entry as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Ordered, immutable set of allowed origins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<OriginEntry>,
}

impl AllowList {
    /// Compile configured entries, failing on the first bad one.
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Result<Self, OriginEntryError> {
        let entries = entries
            .iter()
            .filter(|e| !e.as_ref().trim().is_empty())
            .map(|e| OriginEntry::parse(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OriginEntry> {
        self.entries.iter()
    }

    fn scheme_qualified_hosts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match &e.kind {
            EntryKind::SchemeQualified(host) => Some(host.as_str()),
            _ => None,
        })
    }

    fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match &e.kind {
            EntryKind::Suffix(suffix) => Some(suffix.as_str()),
            _ => None,
        })
    }

    fn bare_hosts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match &e.kind {
            EntryKind::Host(host) => Some(host.as_str()),
            _ => None,
        })
    }
}

/// Outcome of an origin check, with the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginDecision {
    /// No `Origin` header, or an empty one.
    NoOrigin,
    /// Empty allow-list.
    Permissive,
    ExactMatch,
    SchemeHostMatch,
    SuffixMatch,
    HostMatch,
    DevLocalhost,
    /// Origin could not be parsed as a URL.
    Malformed,
    NotAllowed,
}

impl OriginDecision {
    pub fn is_allowed(self) -> bool {
        !matches!(self, OriginDecision::Malformed | OriginDecision::NotAllowed)
    }

    /// Short label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            OriginDecision::NoOrigin => "no_origin",
            OriginDecision::Permissive => "permissive",
            OriginDecision::ExactMatch => "exact",
            OriginDecision::SchemeHostMatch => "scheme_host",
            OriginDecision::SuffixMatch => "suffix",
            OriginDecision::HostMatch => "host",
            OriginDecision::DevLocalhost => "dev_localhost",
            OriginDecision::Malformed => "malformed",
            OriginDecision::NotAllowed => "not_allowed",
        }
    }
}

/// Process-wide origin policy, built once from configuration.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allow_list: AllowList,
    dev_mode: bool,
}

impl OriginPolicy {
    pub fn new(allow_list: AllowList, dev_mode: bool) -> Self {
        Self { allow_list, dev_mode }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Decide for a raw `Origin` header value.
    pub fn evaluate(&self, origin: Option<&str>) -> OriginDecision {
        decide(origin, &self.allow_list, self.dev_mode)
    }
}

fn decide(origin: Option<&str>, allow_list: &AllowList, dev_mode: bool) -> OriginDecision {
    let origin = match origin {
        Some(o) if !o.is_empty() => o,
        _ => return OriginDecision::NoOrigin,
    };

    if allow_list.is_empty() {
        return OriginDecision::Permissive;
    }

    let decision = match_allow_list(origin, allow_list);
    if decision.is_allowed() {
        return decision;
    }

    if dev_mode && DEV_LOCALHOST.is_match(origin) {
        return OriginDecision::DevLocalhost;
    }

    decision
}

/// Check an origin against the allow-list rules only (no dev-mode fallback).
fn match_allow_list(origin: &str, list: &AllowList) -> OriginDecision {
    let url = match Url::parse(origin) {
        Ok(url) => url,
        Err(_) => return OriginDecision::Malformed,
    };
    let hostname = match url.host_str() {
        Some(h) => h.to_ascii_lowercase(),
        None => return OriginDecision::Malformed,
    };
    let serialized = url.origin().ascii_serialization();

    if list
        .iter()
        .any(|e| e.as_str() == origin || e.as_str() == serialized)
    {
        return OriginDecision::ExactMatch;
    }
    if list.scheme_qualified_hosts().any(|h| h == hostname) {
        return OriginDecision::SchemeHostMatch;
    }
    if list.suffixes().any(|s| hostname.ends_with(s)) {
        return OriginDecision::SuffixMatch;
    }
    if list.bare_hosts().any(|h| h == hostname) {
        return OriginDecision::HostMatch;
    }

    OriginDecision::NotAllowed
}

/// Decide whether `origin` may receive cross-origin permission.
pub fn is_origin_allowed(origin: &str, allow_list: &AllowList, dev_mode: bool) -> bool {
    decide(Some(origin), allow_list, dev_mode).is_allowed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[&str]) -> AllowList {
        AllowList::new(entries).unwrap()
    }

    #[test]
    fn test_entry_classification() {
        assert_eq!(
            OriginEntry::parse("https://App.Example.com:8443").unwrap().kind,
            EntryKind::SchemeQualified("app.example.com".into())
        );
        assert_eq!(
            OriginEntry::parse(" .Example.com ").unwrap().kind,
            EntryKind::Suffix(".example.com".into())
        );
        assert_eq!(
            OriginEntry::parse("app.example.com").unwrap().kind,
            EntryKind::Host("app.example.com".into())
        );
        assert_eq!(OriginEntry::parse("  ").unwrap_err(), OriginEntryError::Empty);
        assert_eq!(OriginEntry::parse(".").unwrap_err(), OriginEntryError::EmptySuffix);
        assert!(OriginEntry::parse("https://").is_err());
    }

    #[test]
    fn test_missing_origin_always_allowed() {
        let policy = OriginPolicy::new(list(&["https://app.example.com"]), false);
        assert_eq!(policy.evaluate(None), OriginDecision::NoOrigin);
        assert_eq!(policy.evaluate(Some("")), OriginDecision::NoOrigin);
        assert!(is_origin_allowed("", &list(&["x.com"]), false));
    }

    #[test]
    fn test_empty_list_allows_everything() {
        let empty = AllowList::default();
        assert!(is_origin_allowed("https://anything.example", &empty, false));
        assert!(is_origin_allowed("http://10.0.0.1:9999", &empty, false));
        assert!(is_origin_allowed("not a url", &empty, false));
    }

    #[test]
    fn test_suffix_entries() {
        let l = list(&[".example.com"]);
        assert!(is_origin_allowed("https://x.example.com", &l, false));
        assert!(is_origin_allowed("http://a.b.example.com:8080", &l, false));
        assert!(!is_origin_allowed("https://notexample.com", &l, false));
        assert!(!is_origin_allowed("https://example.com.evil.com", &l, false));
        // Suffix requires the dot, so the apex itself is not covered.
        assert!(!is_origin_allowed("https://example.com", &l, false));
    }

    #[test]
    fn test_scheme_qualified_ignores_scheme_and_port() {
        let l = list(&["https://app.example.com"]);
        let policy = OriginPolicy::new(l.clone(), false);
        assert_eq!(policy.evaluate(Some("https://app.example.com")), OriginDecision::ExactMatch);
        assert_eq!(
            policy.evaluate(Some("http://app.example.com")),
            OriginDecision::SchemeHostMatch
        );
        assert!(is_origin_allowed("http://app.example.com:3000", &l, false));
        assert!(!is_origin_allowed("https://other.com", &l, false));
    }

    #[test]
    fn test_exact_match_with_trailing_slash() {
        let l = list(&["https://app.example.com"]);
        let policy = OriginPolicy::new(l, false);
        assert_eq!(
            policy.evaluate(Some("https://app.example.com/")),
            OriginDecision::ExactMatch
        );
    }

    #[test]
    fn test_bare_host_entries() {
        let l = list(&["app.example.com"]);
        let policy = OriginPolicy::new(l, false);
        assert_eq!(
            policy.evaluate(Some("https://APP.example.com:444")),
            OriginDecision::HostMatch
        );
        assert_eq!(
            policy.evaluate(Some("https://sub.app.example.com")),
            OriginDecision::NotAllowed
        );
    }

    #[test]
    fn test_ipv6_literal() {
        let l = list(&["http://[::1]:3000"]);
        assert!(is_origin_allowed("http://[::1]:5173", &l, false));
        assert!(!is_origin_allowed("http://[::2]", &l, false));
    }

    #[test]
    fn test_malformed_origin_denied() {
        let policy = OriginPolicy::new(list(&["app.example.com"]), true);
        assert_eq!(policy.evaluate(Some("null")), OriginDecision::Malformed);
        assert_eq!(policy.evaluate(Some("://broken")), OriginDecision::Malformed);
        assert!(!policy.evaluate(Some("http://")).is_allowed());
    }

    #[test]
    fn test_dev_mode_localhost() {
        let l = list(&["https://app.example.com"]);
        let dev = OriginPolicy::new(l.clone(), true);
        assert_eq!(dev.evaluate(Some("http://localhost:3000")), OriginDecision::DevLocalhost);
        assert_eq!(dev.evaluate(Some("http://127.0.0.1")), OriginDecision::DevLocalhost);
        assert_eq!(dev.evaluate(Some("https://localhost")), OriginDecision::DevLocalhost);
        assert!(!dev.evaluate(Some("http://localhost.evil.com")).is_allowed());
        assert!(!dev.evaluate(Some("http://localhost:3000/path")).is_allowed());

        let prod = OriginPolicy::new(l, false);
        assert!(!prod.evaluate(Some("http://localhost:3000")).is_allowed());
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        let l = list(&["app.example.com", ".example.com", "https://app.example.com"]);
        let policy = OriginPolicy::new(l, false);
        // Scheme-qualified is evaluated before suffix and bare host.
        assert_eq!(
            policy.evaluate(Some("http://app.example.com")),
            OriginDecision::SchemeHostMatch
        );
        assert_eq!(
            policy.evaluate(Some("https://api.example.com")),
            OriginDecision::SuffixMatch
        );
    }

    #[test]
    fn test_policy_reports_its_configuration() {
        let policy = OriginPolicy::new(list(&["https://a.com", ".b.com"]), true);
        assert_eq!(policy.allow_list().len(), 2);
        assert!(policy.dev_mode());
        let entries: Vec<&str> = policy.allow_list().iter().map(OriginEntry::as_str).collect();
        assert_eq!(entries, vec!["https://a.com", ".b.com"]);
    }
}
