use crate::application::gate::{DecisionParser, GatePoller, GateStateStore, PollerSettings};
use crate::application::launch::LaunchCoordinator;
use crate::application::profile::ProfileStore;
use crate::application::session::{
    CookieSnapshotSlot, CookieStore, SessionSettings, WebSessionController, user_agent,
};
use crate::domain::TransportError;
use crate::infra::app_config::{AppConfig, DEFAULT_ENDPOINT};
use crate::infra::cookie_jar::MemoryCookieStore;
use crate::infra::device::{DeviceProbe, SystemDevice};
use crate::infra::gate_client::{GateTransport, HttpGateTransport};
use crate::infra::storage::KeyValueStore;
use anyhow::Result;
use std::sync::Arc;
use url::Url;

/// Everything one process needs: storage, the gate and the session pieces.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub gate: GateStateStore,
    pub profiles: ProfileStore,
    pub cookies: Arc<MemoryCookieStore>,
    pub launch: LaunchCoordinator,
    device: Arc<dyn DeviceProbe>,
}

impl AppState {
    /// Wires the real HTTP transport and system device probe.
    pub fn new(config: AppConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let transport = HttpGateTransport::new()?;
        let device = SystemDevice::new(config.device.clone());
        Self::with_parts(config, store, Arc::new(transport), Arc::new(device))
    }

    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn GateTransport>,
        device: Arc<dyn DeviceProbe>,
    ) -> Result<Self> {
        let endpoint = gate_endpoint(&config.endpoint)?;
        let gate = GateStateStore::new(Arc::clone(&store));
        let poller = GatePoller::new(
            PollerSettings {
                endpoint,
                access_code: config.access_code.clone(),
                max_attempts: config.max_attempts,
                request_timeout: config.request_timeout(),
            },
            DecisionParser::new(config.expected_token.clone()),
            transport,
            Arc::clone(&device),
            gate.clone(),
        );

        Ok(Self {
            profiles: ProfileStore::new(Arc::clone(&store)),
            cookies: Arc::new(MemoryCookieStore::new()),
            launch: LaunchCoordinator::new(gate.clone(), poller),
            gate,
            store,
            config,
            device,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            watchdog: self.config.watchdog(),
            page_load_timeout: self.config.page_load_timeout(),
            user_agent: user_agent(self.device.os_version().as_deref()),
        }
    }

    /// A controller sharing this process' cookie store.
    pub fn session_controller(&self) -> WebSessionController {
        let cookies: Arc<dyn CookieStore> = self.cookies.clone();
        WebSessionController::new(
            self.gate.clone(),
            CookieSnapshotSlot::new(Arc::clone(&self.store)),
            cookies,
            self.session_settings(),
        )
    }

    pub fn device(&self) -> &dyn DeviceProbe {
        self.device.as_ref()
    }
}

/// Configured gate endpoint, or the built-in one when the configured value does not parse.
fn gate_endpoint(configured: &str) -> Result<Url> {
    match Url::parse(configured) {
        Ok(url) => Ok(url),
        Err(err) => {
            log::warn!(
                target: "gate",
                "{}, using {}",
                TransportError::InvalidEndpoint(format!("{configured}: {err}")),
                DEFAULT_ENDPOINT
            );
            Ok(Url::parse(DEFAULT_ENDPOINT)?)
        }
    }
}
