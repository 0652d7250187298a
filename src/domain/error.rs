//! Domain error types for Pathways.
//!
//! None of these are fatal to the process: gate failures degrade to the
//! native experience and navigation failures leave persisted state alone.

use thiserror::Error;

/// Errors raised while resolving the launch gate.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Gate resolution was cancelled")]
    Cancelled,
}

/// A single gate request that could not produce a response.
///
/// Every variant is inconclusive: the poller retries it.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid gate endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Gate request timed out after {0}s")]
    Timeout(u64),

    #[error("Gate request failed: {0}")]
    Request(String),
}

/// Errors raised by the web session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage failed: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("Web surface failed to start loading {url}: {reason}")]
    Surface { url: String, reason: String },

    #[error("Invalid destination URL: {0}")]
    InvalidDestination(String),
}

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
