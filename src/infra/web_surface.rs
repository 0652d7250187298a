//! Headless web surface.
//!
//! Fetches pages with `reqwest` instead of rendering them, following
//! redirects by hand so every hop's `Set-Cookie` lands in the session's
//! cookie store. Progress is reported as navigation events on a channel.

use crate::application::session::cookies::cookie_header;
use crate::application::session::{CookieStore, LoadRequest, NavigationEvent, WebSurface};
use crate::domain::SessionError;
use crate::infra::cookie_jar::{from_response_cookie, is_deletion};
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, LOCATION, USER_AGENT};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

const MAX_REDIRECTS: usize = 10;

pub struct HeadlessSurface {
    client: reqwest::Client,
    cookies: Arc<dyn CookieStore>,
    events: mpsc::UnboundedSender<NavigationEvent>,
}

impl HeadlessSurface {
    pub fn new(
        cookies: Arc<dyn CookieStore>,
        events: mpsc::UnboundedSender<NavigationEvent>,
    ) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SessionError::Surface {
                url: String::new(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            cookies,
            events,
        })
    }
}

impl WebSurface for HeadlessSurface {
    fn load(&self, request: LoadRequest) -> Result<(), SessionError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| SessionError::Surface {
            url: request.url.to_string(),
            reason: e.to_string(),
        })?;
        let client = self.client.clone();
        let cookies = Arc::clone(&self.cookies);
        let events = self.events.clone();

        let _ = events.send(NavigationEvent::Started);
        handle.spawn(async move {
            let timeout = request.timeout;
            let load = navigate(&client, cookies.as_ref(), request);
            let event = match tokio::time::timeout(timeout, load).await {
                Ok(Ok(final_url)) => NavigationEvent::Finished {
                    url: Some(final_url.to_string()),
                },
                Ok(Err(error)) => NavigationEvent::Failed { error },
                Err(_) => NavigationEvent::Failed {
                    error: format!("page did not respond within {}s", timeout.as_secs()),
                },
            };
            let _ = events.send(event);
        });
        Ok(())
    }
}

async fn navigate(
    client: &reqwest::Client,
    cookies: &dyn CookieStore,
    request: LoadRequest,
) -> Result<Url, String> {
    let mut current = request.url.clone();
    let mut extra_headers = build_headers(&request.headers)?;

    for _ in 0..=MAX_REDIRECTS {
        let mut headers = extra_headers.clone();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&request.user_agent).map_err(|e| e.to_string())?,
        );
        if !headers.contains_key(COOKIE) {
            if let Some(cookie) = cookie_header(&cookies.all(), &current, chrono::Utc::now()) {
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    headers.insert(COOKIE, value);
                }
            }
        }

        let response = client
            .get(current.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| format!("request to {current} failed: {e}"))?;

        for cookie in response.cookies() {
            let Some(stored) = from_response_cookie(&cookie, &current) else {
                continue;
            };
            if is_deletion(&stored) {
                cookies.remove(&stored.key());
            } else {
                cookies.insert(stored);
            }
        }

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| format!("redirect from {current} without Location"))?;
            current = current
                .join(location)
                .map_err(|e| format!("bad redirect target {location}: {e}"))?;
            // The caller's cookie header only applies to the first hop.
            extra_headers.remove(COOKIE);
            continue;
        }
        if !status.is_success() {
            return Err(format!("HTTP {} from {current}", status.as_u16()));
        }
        // Drain the body so the load only settles once the page is complete.
        response
            .bytes()
            .await
            .map_err(|e| format!("reading {current} failed: {e}"))?;
        return Ok(current);
    }

    Err(format!("too many redirects starting at {}", request.url))
}

fn build_headers(pairs: &[(String, String)]) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| e.to_string())?;
        let value = HeaderValue::from_str(value).map_err(|e| e.to_string())?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_headers() {
        let headers = build_headers(&[("Cookie".into(), "sid=1".into())]).unwrap();
        assert_eq!(headers.get(COOKIE).unwrap().to_str().unwrap(), "sid=1");
        assert!(build_headers(&[("bad header".into(), "x".into())]).is_err());
    }

    #[test]
    fn test_load_outside_runtime_is_an_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let surface =
            HeadlessSurface::new(Arc::new(crate::infra::cookie_jar::MemoryCookieStore::new()), tx)
                .unwrap();
        let request = LoadRequest {
            url: Url::parse("https://example.com/").unwrap(),
            user_agent: "test".into(),
            headers: Vec::new(),
            timeout: std::time::Duration::from_secs(1),
        };
        assert!(matches!(
            surface.load(request),
            Err(SessionError::Surface { .. })
        ));
    }
}
