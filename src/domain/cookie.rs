use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single HTTP cookie as held by the web session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    /// Host the cookie belongs to, without a leading dot.
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

fn default_path() -> String {
    "/".to_string()
}

/// Identity of a cookie inside a jar. Two cookies with the same key replace each other.
pub type CookieKey = (String, String, String);

impl StoredCookie {
    pub fn key(&self) -> CookieKey {
        (self.domain.clone(), self.path.clone(), self.name.clone())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Domain-match per RFC 6265 section 5.1.3, host compared case-insensitively.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let domain = self.domain.trim_start_matches('.').to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    }
}

/// Ordered copy of every cookie in the active store at one moment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieJarSnapshot {
    pub cookies: Vec<StoredCookie>,
}

impl CookieJarSnapshot {
    /// Builds a snapshot in canonical `(domain, path, name)` order, last duplicate wins.
    pub fn from_cookies(cookies: impl IntoIterator<Item = StoredCookie>) -> Self {
        let mut by_key = std::collections::BTreeMap::new();
        for cookie in cookies {
            by_key.insert(cookie.key(), cookie);
        }
        Self {
            cookies: by_key.into_values().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }
}
