//! Launch flow: decide once per process which experience to show.

use crate::application::gate::{GatePoller, GateStateStore};
use crate::domain::{GateDecision, GateError, GateState, Resolution, ResolutionSource};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// What the host should render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Destination {
    Native,
    Web { url: String },
}

impl From<&GateDecision> for Destination {
    fn from(decision: &GateDecision) -> Self {
        match decision {
            GateDecision::NativeApp => Self::Native,
            GateDecision::WebSession { destination_url } => Self::Web {
                url: destination_url.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchOutcome {
    pub destination: Destination,
    pub resolution: Resolution,
}

pub struct LaunchCoordinator {
    gate: GateStateStore,
    poller: GatePoller,
    resolution: OnceCell<Resolution>,
}

impl LaunchCoordinator {
    pub fn new(gate: GateStateStore, poller: GatePoller) -> Self {
        Self {
            gate,
            poller,
            resolution: OnceCell::new(),
        }
    }

    /// Resolves the launch destination.
    ///
    /// Concurrent and repeated calls share one resolution. A cancelled
    /// resolution leaves nothing behind and may be started again.
    pub async fn launch(&self, cancel: &CancellationToken) -> Result<LaunchOutcome, GateError> {
        let resolution = self
            .resolution
            .get_or_try_init(|| self.resolve_and_persist(cancel))
            .await?
            .clone();
        Ok(LaunchOutcome {
            destination: Destination::from(&resolution.decision),
            resolution,
        })
    }

    /// The resolution of this process, once known.
    pub fn resolved(&self) -> Option<&Resolution> {
        self.resolution.get()
    }

    async fn resolve_and_persist(&self, cancel: &CancellationToken) -> Result<Resolution, GateError> {
        let state = self.gate.load().unwrap_or_else(|err| {
            log::warn!(target: "gate", "could not read gate state: {:#}", err);
            GateState::default()
        });
        if state.is_resolved_native() {
            log::info!(target: "gate", "native experience already resolved, skipping gate");
            return Ok(Resolution {
                decision: GateDecision::NativeApp,
                source: ResolutionSource::Saved,
            });
        }

        let resolution = self.poller.resolve(cancel).await?;
        if resolution.should_persist() {
            if let Err(err) = self.gate.save(&resolution.decision) {
                log::warn!(target: "gate", "could not persist gate decision: {:#}", err);
            }
        }
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::gate::{DecisionParser, PollerSettings};
    use crate::domain::{DeviceContext, TransportError};
    use crate::infra::device::FixedDevice;
    use crate::infra::gate_client::{GateResponse, GateTransport};
    use crate::infra::storage::{KeyValueStore, MemoryKeyValueStore, keys};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use url::Url;

    /// Answers every request with the same body after a short delay.
    struct FixedTransport {
        body: Option<&'static str>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl GateTransport for FixedTransport {
        async fn fetch(&self, _url: &Url, _timeout: Duration) -> Result<GateResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            match self.body {
                Some(body) => Ok(GateResponse {
                    status: 200,
                    body: body.as_bytes().to_vec(),
                }),
                None => Err(TransportError::Request("unreachable".into())),
            }
        }
    }

    fn coordinator(
        body: Option<&'static str>,
        kv: &MemoryKeyValueStore,
    ) -> (LaunchCoordinator, Arc<FixedTransport>) {
        let transport = Arc::new(FixedTransport {
            body,
            calls: AtomicU32::new(0),
        });
        let gate = GateStateStore::new(Arc::new(kv.clone()));
        let poller = GatePoller::new(
            PollerSettings {
                endpoint: Url::parse("https://gate.example.com/server.php").unwrap(),
                access_code: "code".into(),
                max_attempts: 3,
                request_timeout: Duration::from_secs(30),
            },
            DecisionParser::new("GJDFHDFHFDJGSDAGKGHK"),
            transport.clone(),
            Arc::new(FixedDevice(DeviceContext {
                os_name_version: "iOS 17.4".into(),
                preferred_language: "en".into(),
                hardware_model_id: "iPhone15,2".into(),
                region_code: Some("US".into()),
            })),
            gate.clone(),
        );
        (LaunchCoordinator::new(gate, poller), transport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_web_decision_is_persisted_and_resumed() {
        let kv = MemoryKeyValueStore::new();
        let (first, transport) =
            coordinator(Some("GJDFHDFHFDJGSDAGKGHK#https://example.com/x"), &kv);

        let outcome = first.launch(&CancellationToken::new()).await.unwrap();
        assert_eq!(
            outcome.destination,
            Destination::Web {
                url: "https://example.com/x".into()
            }
        );
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(kv.get_bool(keys::GATE_RESOLVED).unwrap());

        // Next launch of the app.
        let (second, transport) = coordinator(Some("WRONG#x"), &kv);
        let outcome = second.launch(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.resolution.source, ResolutionSource::Saved);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolved_native_skips_gate() {
        let kv = MemoryKeyValueStore::new();
        let (first, _) = coordinator(Some("WRONG#https://example.com/x"), &kv);
        assert_eq!(
            first.launch(&CancellationToken::new()).await.unwrap().destination,
            Destination::Native
        );

        let (second, transport) =
            coordinator(Some("GJDFHDFHFDJGSDAGKGHK#https://example.com/x"), &kv);
        let outcome = second.launch(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.destination, Destination::Native);
        assert_eq!(outcome.resolution.source, ResolutionSource::Saved);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_not_persisted() {
        let kv = MemoryKeyValueStore::new();
        let (coordinator, transport) = coordinator(None, &kv);

        let outcome = coordinator.launch(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.destination, Destination::Native);
        assert_eq!(
            outcome.resolution.source,
            ResolutionSource::Exhausted { attempts: 3 }
        );
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert!(kv.keys().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_launches_share_one_resolution() {
        let kv = MemoryKeyValueStore::new();
        let (coordinator, transport) =
            coordinator(Some("GJDFHDFHFDJGSDAGKGHK#https://example.com/x"), &kv);
        let cancel = CancellationToken::new();

        let (a, b) = tokio::join!(coordinator.launch(&cancel), coordinator.launch(&cancel));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        coordinator.launch(&cancel).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(coordinator.resolved().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_launch_persists_nothing() {
        let kv = MemoryKeyValueStore::new();
        let (coordinator, _) = coordinator(None, &kv);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            coordinator.launch(&cancel).await,
            Err(GateError::Cancelled)
        ));
        assert!(coordinator.resolved().is_none());
        assert!(kv.keys().is_empty());
    }
}
