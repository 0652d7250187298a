use crate::application::session::CookieStore;
use crate::domain::{CookieKey, StoredCookie};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::SystemTime;

const MAX_COOKIES: usize = 4096;

/// In-process cookie store keyed by `(domain, path, name)`.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<BTreeMap<CookieKey, StoredCookie>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cookies.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for MemoryCookieStore {
    fn all(&self) -> Vec<StoredCookie> {
        self.cookies.lock().values().cloned().collect()
    }

    fn insert(&self, cookie: StoredCookie) {
        let mut cookies = self.cookies.lock();
        if cookies.len() >= MAX_COOKIES && !cookies.contains_key(&cookie.key()) {
            log::warn!(target: "session", "cookie store full, dropping {}", cookie.name);
            return;
        }
        cookies.insert(cookie.key(), cookie);
    }

    fn remove(&self, key: &CookieKey) {
        self.cookies.lock().remove(key);
    }

    fn clear(&self) {
        self.cookies.lock().clear();
    }
}

/// Converts a `Set-Cookie` parsed by reqwest into a stored cookie.
///
/// Host-only cookies get the response host as domain; a cookie without a
/// path gets the directory of the response path (RFC 6265 default-path).
/// A `Domain` attribute that is neither the host nor one of its parents is
/// rejected (RFC 6265 section 5.3 step 6).
pub fn from_response_cookie(cookie: &reqwest::cookie::Cookie<'_>, url: &url::Url) -> Option<StoredCookie> {
    let host = url.host_str()?.to_ascii_lowercase();
    let domain = cookie
        .domain()
        .map(|d| d.trim_start_matches('.').to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| host.clone());

    let path = cookie
        .path()
        .filter(|p| p.starts_with('/'))
        .map(str::to_string)
        .unwrap_or_else(|| default_path(url.path()));

    let expires = match (cookie.max_age(), cookie.expires()) {
        (Some(max_age), _) => chrono::Duration::from_std(max_age)
            .ok()
            .map(|age| Utc::now() + age),
        (None, Some(at)) => Some(DateTime::<Utc>::from(at)),
        (None, None) => None,
    };

    let stored = StoredCookie {
        name: cookie.name().to_string(),
        value: cookie.value().to_string(),
        domain,
        path,
        expires,
        secure: cookie.secure(),
        http_only: cookie.http_only(),
    };
    if !stored.matches_host(&host) {
        log::warn!(
            target: "session",
            "rejecting cookie {} for {} set by {}",
            stored.name,
            stored.domain,
            host
        );
        return None;
    }
    Some(stored)
}

fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}

/// `true` for a cookie whose `Max-Age`/`Expires` asks for deletion.
pub fn is_deletion(cookie: &StoredCookie) -> bool {
    cookie.is_expired_at(DateTime::<Utc>::from(SystemTime::now()))
}
