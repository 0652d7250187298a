//! HTTP transport for gate requests.

use crate::domain::TransportError;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Raw answer from the gate endpoint, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl GateResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as trimmed UTF-8 text, `None` when it is not text or empty.
    pub fn text(&self) -> Option<&str> {
        let text = std::str::from_utf8(&self.body).ok()?.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Issues a single gate GET.
#[async_trait]
pub trait GateTransport: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<GateResponse, TransportError>;
}

/// `reqwest`-backed transport used in production.
#[derive(Debug, Clone)]
pub struct HttpGateTransport {
    client: reqwest::Client,
}

impl HttpGateTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl GateTransport for HttpGateTransport {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<GateResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(e, timeout))?;

        Ok(GateResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout.as_secs())
    } else {
        TransportError::Request(err.to_string())
    }
}
