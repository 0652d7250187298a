//! Gate polling with linear backoff.

use super::parser::DecisionParser;
use super::state_store::GateStateStore;
use crate::domain::{GateDecision, GateError, GateRequest, Resolution, ResolutionSource};
use crate::infra::device::DeviceProbe;
use crate::infra::gate_client::GateTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

pub const MAX_BACKOFF_SECS: u64 = 30;

/// Delay after the inconclusive attempt `attempt` (1-indexed).
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt).clamp(1, MAX_BACKOFF_SECS))
}

/// Knobs for one poller, normally taken from `AppConfig`.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub endpoint: Url,
    pub access_code: String,
    pub max_attempts: u32,
    pub request_timeout: Duration,
}

/// What a single attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Terminal(GateDecision),
    Inconclusive(String),
}

pub struct GatePoller {
    settings: PollerSettings,
    parser: DecisionParser,
    transport: Arc<dyn GateTransport>,
    device: Arc<dyn DeviceProbe>,
    state: GateStateStore,
}

impl GatePoller {
    pub fn new(
        settings: PollerSettings,
        parser: DecisionParser,
        transport: Arc<dyn GateTransport>,
        device: Arc<dyn DeviceProbe>,
        state: GateStateStore,
    ) -> Self {
        Self {
            settings,
            parser,
            transport,
            device,
            state,
        }
    }

    /// Resolves the launch decision.
    ///
    /// Returns a saved destination without touching the network; otherwise
    /// polls until a terminal answer or the attempt budget runs out, in which
    /// case the answer is the native fallback. Nothing is written here.
    pub async fn resolve(&self, cancel: &CancellationToken) -> Result<Resolution, GateError> {
        match self.state.usable_destination() {
            Ok(Some(destination_url)) => {
                log::info!(target: "gate", "resuming saved destination {}", destination_url);
                return Ok(Resolution {
                    decision: GateDecision::WebSession { destination_url },
                    source: ResolutionSource::Saved,
                });
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!(target: "gate", "could not read saved destination: {:#}", err);
            }
        }

        let max_attempts = self.settings.max_attempts;
        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(GateError::Cancelled);
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(GateError::Cancelled),
                outcome = self.attempt_once() => outcome,
            };

            match outcome {
                AttemptOutcome::Terminal(decision) => {
                    log::info!(
                        target: "gate",
                        "attempt {}/{} returned {}",
                        attempt,
                        max_attempts,
                        decision
                    );
                    return Ok(Resolution {
                        decision,
                        source: ResolutionSource::Remote { attempts: attempt },
                    });
                }
                AttemptOutcome::Inconclusive(reason) => {
                    log::debug!(
                        target: "gate",
                        "attempt {}/{} inconclusive: {}",
                        attempt,
                        max_attempts,
                        reason
                    );
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(GateError::Cancelled),
                    _ = tokio::time::sleep(backoff_delay(attempt)) => {}
                }
            }
        }

        log::warn!(
            target: "gate",
            "no decision after {} attempts, falling back to native",
            max_attempts
        );
        Ok(Resolution {
            decision: GateDecision::NativeApp,
            source: ResolutionSource::Exhausted {
                attempts: max_attempts,
            },
        })
    }

    /// One GET, classified. Never fails: every problem is inconclusive.
    pub async fn attempt_once(&self) -> AttemptOutcome {
        let request = GateRequest::new(self.settings.access_code.clone(), self.device.probe());
        let url = request.to_url(&self.settings.endpoint);
        let timeout = self.settings.request_timeout;

        let response =
            match tokio::time::timeout(timeout, self.transport.fetch(&url, timeout)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => return AttemptOutcome::Inconclusive(err.to_string()),
                Err(_) => {
                    return AttemptOutcome::Inconclusive(format!(
                        "no response within {}s",
                        timeout.as_secs()
                    ));
                }
            };

        if !response.is_success() {
            return AttemptOutcome::Inconclusive(format!("HTTP {}", response.status));
        }
        let Some(text) = response.text() else {
            return AttemptOutcome::Inconclusive("empty or non-text body".to_string());
        };

        match self.parser.parse(text) {
            Some(decision) => AttemptOutcome::Terminal(decision),
            None => AttemptOutcome::Inconclusive("body has no token separator".to_string()),
        }
    }
}
