use crate::domain::SessionError;
use std::time::Duration;
use url::Url;

/// A page load handed to the web surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub url: Url,
    pub user_agent: String,
    /// Extra request headers, e.g. the restored `Cookie` header.
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Whatever renders web content. It reports progress back as navigation events.
pub trait WebSurface: Send + Sync {
    /// Starts loading. Must not block until the page settles.
    fn load(&self, request: LoadRequest) -> Result<(), SessionError>;
}
