//! Strongly-typed identifiers for clocklock

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Domain that always has a rule once the tracking state is loaded.
///
/// The rule is created with zero limit and zero cooldown, so it is inert
/// until the user edits it.
pub const DEFAULT_BOOTSTRAP_DOMAIN: &str = "youtube.com";

/// Canonical hostname a rule is keyed by.
///
/// Construction always normalizes: lowercase, surrounding whitespace and a
/// trailing dot removed, a single leading `www.` stripped. Deserialization
/// goes through the same path, so stored keys never carry a `www.` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    pub fn new(host: impl AsRef<str>) -> Self {
        Self(normalize_host(host.as_ref()))
    }

    /// Build a domain from either a bare hostname or a URL.
    ///
    /// `https://www.Example.com:8080/path?q` becomes `example.com`. Input
    /// that is not a hierarchical URL (`m.youtube.com`, `localhost:3000`) is
    /// read as `host[:port][/path]`.
    pub fn from_url_or_host(input: &str) -> Self {
        let input = input.trim();
        match Url::parse(input) {
            Ok(url) if !url.cannot_be_a_base() => Self::new(url.host_str().unwrap_or_default()),
            _ => Self::new(bare_host(input)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn bare_host(input: &str) -> &str {
    let authority = input.split(['/', '?', '#']).next().unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or_default();
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    authority.split(':').next().unwrap_or_default()
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Domain {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Domain {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Domain> for String {
    fn from(d: Domain) -> Self {
        d.0
    }
}

/// Unique identifier for a connected IPC client
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
