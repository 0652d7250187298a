use serde::{Deserialize, Serialize};
use std::fmt;

/// Blank-page value a web surface reports before anything real has loaded.
pub const BLANK_PAGE: &str = "about:blank";

/// What the gate request says about the device it runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
    /// OS name followed by its version, e.g. `"iOS 17.4"`.
    pub os_name_version: String,
    /// Primary language code, e.g. `"en"`.
    pub preferred_language: String,
    /// Hardware model identifier, e.g. `"iPhone15,2"`.
    pub hardware_model_id: String,
    /// Region code when the locale carries one. Never empty.
    pub region_code: Option<String>,
}

/// One outbound gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRequest {
    pub access_code: String,
    pub device: DeviceContext,
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateDecision {
    /// Show the native recipe experience.
    NativeApp,
    /// Show the embedded web session at the given destination.
    WebSession { destination_url: String },
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativeApp => write!(f, "native"),
            Self::WebSession { destination_url } => write!(f, "web({destination_url})"),
        }
    }
}

/// Durable gate state, as read back from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    /// A terminal decision has been persisted.
    pub resolved: bool,
    /// The persisted decision was a web session.
    pub use_web_session: bool,
    /// Last known-good web destination.
    pub saved_destination_url: Option<String>,
}

impl GateState {
    /// Whether the persisted state routes to native without asking the gate again.
    pub fn is_resolved_native(&self) -> bool {
        self.resolved && !self.use_web_session
    }
}

/// Why a resolution produced its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Taken from a destination persisted by an earlier launch.
    Saved,
    /// Returned by the gate endpoint after `attempts` tries.
    Remote { attempts: u32 },
    /// The attempt budget ran out; the decision is the native fallback.
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub decision: GateDecision,
    pub source: ResolutionSource,
}

impl Resolution {
    /// Only decisions freshly returned by the endpoint are written back.
    pub fn should_persist(&self) -> bool {
        matches!(self.source, ResolutionSource::Remote { .. })
    }
}
