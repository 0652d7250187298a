//! Cookie store port and the persisted snapshot slot.

use crate::domain::{CookieJarSnapshot, CookieKey, StoredCookie};
use crate::infra::storage::{KeyValueStore, keys};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use url::Url;

/// The web session's active cookie store.
pub trait CookieStore: Send + Sync {
    /// Every cookie currently held, in any order.
    fn all(&self) -> Vec<StoredCookie>;
    /// Inserts or replaces the cookie with the same `(domain, path, name)`.
    fn insert(&self, cookie: StoredCookie);
    fn remove(&self, key: &CookieKey);
    fn clear(&self);
}

/// Persisted copy of the cookie store, owned by the session controller.
#[derive(Clone)]
pub struct CookieSnapshotSlot {
    store: Arc<dyn KeyValueStore>,
}

impl CookieSnapshotSlot {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<CookieJarSnapshot> {
        match self.store.get(keys::SESSION_COOKIES)? {
            Some(raw) => serde_json::from_str(&raw).context("decode cookie snapshot"),
            None => Ok(CookieJarSnapshot::default()),
        }
    }

    pub fn save(&self, snapshot: &CookieJarSnapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot).context("encode cookie snapshot")?;
        self.store.set(keys::SESSION_COOKIES, &raw)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(keys::SESSION_COOKIES)
    }
}

/// Copies the store into a snapshot, leaving out cookies already expired at `now`.
pub fn capture(cookies: &dyn CookieStore, now: DateTime<Utc>) -> CookieJarSnapshot {
    CookieJarSnapshot::from_cookies(cookies.all().into_iter().filter(|c| !c.is_expired_at(now)))
}

/// Loads a snapshot into the store, skipping cookies already expired at `now`.
pub fn restore(cookies: &dyn CookieStore, snapshot: &CookieJarSnapshot, now: DateTime<Utc>) -> usize {
    let mut restored = 0;
    for cookie in &snapshot.cookies {
        if cookie.is_expired_at(now) {
            continue;
        }
        cookies.insert(cookie.clone());
        restored += 1;
    }
    restored
}

/// `Cookie` request header value for `url`, or `None` when nothing applies.
///
/// Pairs are sorted by name; for duplicate names the most specific domain wins.
pub fn cookie_header(cookies: &[StoredCookie], url: &Url, now: DateTime<Utc>) -> Option<String> {
    let host = url.host_str()?;
    let secure_channel = url.scheme() == "https";
    let path = url.path();

    let mut applicable: Vec<&StoredCookie> = cookies
        .iter()
        .filter(|c| c.matches_host(host))
        .filter(|c| !c.is_expired_at(now))
        .filter(|c| secure_channel || !c.secure)
        .filter(|c| path_matches(path, &c.path))
        .collect();
    applicable.sort_by(|left, right| {
        left.name
            .cmp(&right.name)
            .then_with(|| right.domain.len().cmp(&left.domain.len()))
            .then_with(|| right.path.len().cmp(&left.path.len()))
    });
    applicable.dedup_by(|later, earlier| later.name == earlier.name);

    if applicable.is_empty() {
        return None;
    }
    Some(
        applicable
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// RFC 6265 section 5.1.4 path-match.
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if cookie_path.is_empty() || cookie_path == "/" || request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path[cookie_path.len()..].starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::cookie_jar::MemoryCookieStore;
    use crate::infra::storage::MemoryKeyValueStore;

    fn cookie(domain: &str, path: &str, name: &str, value: &str) -> StoredCookie {
        StoredCookie {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            expires: None,
            secure: false,
            http_only: true,
        }
    }

    #[test]
    fn test_snapshot_round_trip_through_fresh_store() -> Result<()> {
        let live = MemoryCookieStore::new();
        live.insert(cookie("example.com", "/", "sid", "abc"));
        live.insert(cookie("example.com", "/app", "pref", "dark"));
        live.insert(cookie("cdn.example.com", "/", "edge", "1"));

        let slot = CookieSnapshotSlot::new(Arc::new(MemoryKeyValueStore::new()));
        let first = capture(&live, Utc::now());
        slot.save(&first)?;

        let fresh = MemoryCookieStore::new();
        let restored = restore(&fresh, &slot.load()?, Utc::now());
        assert_eq!(restored, 3);
        assert_eq!(capture(&fresh, Utc::now()), first);
        Ok(())
    }

    #[test]
    fn test_restore_skips_expired() {
        let now = Utc::now();
        let mut stale = cookie("example.com", "/", "old", "1");
        stale.expires = Some(now - chrono::Duration::hours(1));
        let snapshot =
            CookieJarSnapshot::from_cookies(vec![stale, cookie("example.com", "/", "sid", "2")]);

        let fresh = MemoryCookieStore::new();
        assert_eq!(restore(&fresh, &snapshot, now), 1);
        assert_eq!(fresh.all().len(), 1);
    }

    #[test]
    fn test_stale_live_cookie_round_trips_to_same_set() {
        let now = Utc::now();
        let mut stale = cookie("example.com", "/", "old", "1");
        stale.expires = Some(now - chrono::Duration::minutes(1));
        let live = MemoryCookieStore::new();
        live.insert(stale);
        live.insert(cookie("example.com", "/", "sid", "2"));

        let snapshot = capture(&live, now);
        assert_eq!(snapshot.len(), 1);

        let fresh = MemoryCookieStore::new();
        assert_eq!(restore(&fresh, &snapshot, now), 1);
        assert_eq!(capture(&fresh, now), snapshot);
    }

    #[test]
    fn test_missing_snapshot_is_empty() -> Result<()> {
        let slot = CookieSnapshotSlot::new(Arc::new(MemoryKeyValueStore::new()));
        assert!(slot.load()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_cookie_header_filters_and_sorts() {
        let mut secure = cookie("example.com", "/", "token", "t");
        secure.secure = true;
        let cookies = vec![
            cookie("example.com", "/", "sid", "generic"),
            cookie("www.example.com", "/", "sid", "specific"),
            cookie("example.com", "/app", "pref", "dark"),
            cookie("example.com", "/other", "hidden", "x"),
            cookie("elsewhere.com", "/", "foreign", "y"),
            secure,
        ];
        let now = Utc::now();

        let https = Url::parse("https://www.example.com/app/page").unwrap();
        assert_eq!(
            cookie_header(&cookies, &https, now).as_deref(),
            Some("pref=dark; sid=specific; token=t")
        );

        let http = Url::parse("http://example.com/").unwrap();
        assert_eq!(
            cookie_header(&cookies, &http, now).as_deref(),
            Some("sid=generic")
        );

        let none = Url::parse("https://unrelated.org/").unwrap();
        assert_eq!(cookie_header(&cookies, &none, now), None);
    }

    #[test]
    fn test_path_matches() {
        assert!(path_matches("/app", "/app"));
        assert!(path_matches("/app/x", "/app"));
        assert!(path_matches("/app/x", "/app/"));
        assert!(!path_matches("/application", "/app"));
        assert!(path_matches("/anything", "/"));
    }
}
