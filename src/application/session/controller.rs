//! Web session controller.
//!
//! Drives a web surface through `Idle -> Loading -> {Loaded | Failed}` from
//! discrete navigation events, keeps the saved destination pointed at the
//! last page that finished loading and persists the cookie store after each
//! successful load.

use super::cookies::{self, CookieSnapshotSlot, CookieStore};
use super::surface::{LoadRequest, WebSurface};
use crate::application::gate::GateStateStore;
use crate::domain::{BLANK_PAGE, SessionError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Loaded => write!(f, "loaded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Inputs reported by the web surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    Started,
    /// The page settled; `url` is where the surface ended up, if it knows.
    Finished { url: Option<String> },
    /// Navigation or provisional load failure.
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub watchdog: Duration,
    pub page_load_timeout: Duration,
    pub user_agent: String,
}

/// Mobile Safari style user agent carrying the OS version.
pub fn user_agent(os_version: Option<&str>) -> String {
    let version = os_version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("17_0")
        .replace('.', "_");
    format!(
        "Mozilla/5.0 (iPhone; CPU iPhone OS {version} like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile"
    )
}

#[derive(Debug, Default)]
struct Navigation {
    state: NavigationState,
    /// Bumped on every start so a late watchdog can tell it is stale.
    sequence: u64,
    watchdog: Option<CancellationToken>,
    slow_loads: u64,
}

pub struct WebSessionController {
    gate: GateStateStore,
    snapshots: CookieSnapshotSlot,
    cookies: Arc<dyn CookieStore>,
    settings: SessionSettings,
    navigation: Arc<Mutex<Navigation>>,
}

impl WebSessionController {
    pub fn new(
        gate: GateStateStore,
        snapshots: CookieSnapshotSlot,
        cookies: Arc<dyn CookieStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            gate,
            snapshots,
            cookies,
            settings,
            navigation: Arc::new(Mutex::new(Navigation::default())),
        }
    }

    pub fn state(&self) -> NavigationState {
        self.navigation.lock().state
    }

    /// How many loads outlived the watchdog.
    pub fn slow_load_count(&self) -> u64 {
        self.navigation.lock().slow_loads
    }

    /// Restores persisted cookies, then loads the saved destination if there is one.
    ///
    /// Without a destination the controller stays idle and the surface is not touched.
    pub fn initialize(&self, surface: &dyn WebSurface) -> Result<Option<Url>, SessionError> {
        match self.restore_cookies() {
            Ok(count) => log::debug!(target: "session", "restored {} cookies", count),
            Err(err) => log::warn!(target: "session", "could not restore cookies: {:#}", err),
        }

        let Some(destination) = self.gate.usable_destination()? else {
            log::info!(target: "session", "no saved destination, staying idle");
            return Ok(None);
        };
        let url = Url::parse(&destination)
            .map_err(|_| SessionError::InvalidDestination(destination.clone()))?;

        let request = self.load_request(url.clone());
        surface.load(request)?;
        Ok(Some(url))
    }

    /// Request for the initial load: custom user agent plus stored cookies.
    pub fn load_request(&self, url: Url) -> LoadRequest {
        let mut headers = Vec::new();
        if let Some(cookie) = cookies::cookie_header(&self.cookies.all(), &url, chrono::Utc::now()) {
            headers.push(("Cookie".to_string(), cookie));
        }
        LoadRequest {
            url,
            user_agent: self.settings.user_agent.clone(),
            headers,
            timeout: self.settings.page_load_timeout,
        }
    }

    pub fn handle(&self, event: NavigationEvent) -> NavigationState {
        match event {
            NavigationEvent::Started => self.on_start(),
            NavigationEvent::Finished { url } => self.on_finish(url.as_deref()),
            NavigationEvent::Failed { error } => self.on_fail(&error),
        }
    }

    pub fn on_start(&self) -> NavigationState {
        let token = CancellationToken::new();
        let sequence = {
            let mut nav = self.navigation.lock();
            if let Some(previous) = nav.watchdog.take() {
                previous.cancel();
            }
            nav.state = NavigationState::Loading;
            nav.sequence += 1;
            nav.watchdog = Some(token.clone());
            nav.sequence
        };
        self.spawn_watchdog(token, sequence);
        NavigationState::Loading
    }

    pub fn on_finish(&self, url: Option<&str>) -> NavigationState {
        {
            let mut nav = self.navigation.lock();
            if nav.state != NavigationState::Loading {
                log::debug!(target: "session", "ignoring finish while {}", nav.state);
                return nav.state;
            }
            nav.state = NavigationState::Loaded;
            if let Some(watchdog) = nav.watchdog.take() {
                watchdog.cancel();
            }
        }

        if let Some(url) = url.filter(|u| *u != BLANK_PAGE) {
            if let Err(err) = self.gate.record_navigation(url) {
                log::warn!(target: "session", "could not save destination {}: {:#}", url, err);
            }
        }
        match self.snapshot_cookies() {
            Ok(count) => log::debug!(target: "session", "persisted {} cookies", count),
            Err(err) => log::warn!(target: "session", "could not persist cookies: {:#}", err),
        }
        NavigationState::Loaded
    }

    pub fn on_fail(&self, error: &str) -> NavigationState {
        let mut nav = self.navigation.lock();
        if nav.state != NavigationState::Loading {
            log::debug!(target: "session", "ignoring failure while {}: {}", nav.state, error);
            return nav.state;
        }
        nav.state = NavigationState::Failed;
        if let Some(watchdog) = nav.watchdog.take() {
            watchdog.cancel();
        }
        log::warn!(target: "session", "navigation failed: {}", error);
        NavigationState::Failed
    }

    /// Loads the persisted snapshot into the active store.
    pub fn restore_cookies(&self) -> anyhow::Result<usize> {
        let snapshot = self.snapshots.load()?;
        Ok(cookies::restore(
            self.cookies.as_ref(),
            &snapshot,
            chrono::Utc::now(),
        ))
    }

    /// Persists the active store as it is right now.
    pub fn snapshot_cookies(&self) -> anyhow::Result<usize> {
        let snapshot = cookies::capture(self.cookies.as_ref(), chrono::Utc::now());
        self.snapshots.save(&snapshot)?;
        Ok(snapshot.len())
    }

    /// Drops both the persisted snapshot and the live cookies.
    pub fn forget_cookies(&self) -> anyhow::Result<()> {
        self.cookies.clear();
        self.snapshots.clear()
    }

    fn spawn_watchdog(&self, token: CancellationToken, sequence: u64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::debug!(target: "session", "no runtime, load watchdog disabled");
            return;
        };
        let navigation = Arc::clone(&self.navigation);
        let limit = self.settings.watchdog;
        handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(limit) => {
                    let mut nav = navigation.lock();
                    if nav.sequence == sequence && nav.state == NavigationState::Loading {
                        nav.slow_loads += 1;
                        log::warn!(
                            target: "session",
                            "page did not finish loading within {}s",
                            limit.as_secs()
                        );
                    }
                }
            }
        });
    }
}

impl Drop for WebSessionController {
    fn drop(&mut self) {
        if let Some(watchdog) = self.navigation.lock().watchdog.take() {
            watchdog.cancel();
        }
    }
}
