//! Device fingerprint for the gate request.
//!
//! Reads OS, locale and hardware information. Nothing here fails: each
//! field falls back to a best-effort default.

use crate::domain::DeviceContext;
use crate::infra::app_config::DeviceOverrides;
use crate::infra::platform::{self, Platform};

const FALLBACK_LANGUAGE: &str = "en";

/// Source of the device context sent with each gate attempt.
pub trait DeviceProbe: Send + Sync {
    fn probe(&self) -> DeviceContext;

    /// Bare OS version such as `17.4`, if one is known.
    fn os_version(&self) -> Option<String> {
        platform::numeric_version(&self.probe().os_name_version)
    }
}

/// Reads the running system, applying configured overrides on top.
#[derive(Debug, Clone, Default)]
pub struct SystemDevice {
    overrides: DeviceOverrides,
}

impl SystemDevice {
    pub fn new(overrides: DeviceOverrides) -> Self {
        Self { overrides }
    }
}

impl DeviceProbe for SystemDevice {
    fn probe(&self) -> DeviceContext {
        let mut context = fingerprint();
        let o = &self.overrides;
        if let Some(os) = non_empty(o.os_name_version.as_deref()) {
            context.os_name_version = os;
        }
        if let Some(lang) = non_empty(o.preferred_language.as_deref()) {
            context.preferred_language = lang;
        }
        if let Some(model) = non_empty(o.hardware_model_id.as_deref()) {
            context.hardware_model_id = model;
        }
        if let Some(region) = non_empty(o.region_code.as_deref()) {
            context.region_code = Some(region);
        }
        context
    }

    fn os_version(&self) -> Option<String> {
        match non_empty(self.overrides.os_name_version.as_deref()) {
            Some(os) => platform::numeric_version(&os),
            None => platform::os_version().and_then(|v| platform::numeric_version(&v)),
        }
    }
}

/// A probe that always reports the same device.
#[derive(Debug, Clone)]
pub struct FixedDevice(pub DeviceContext);

impl DeviceProbe for FixedDevice {
    fn probe(&self) -> DeviceContext {
        self.0.clone()
    }
}

/// Builds the device context from the running system.
pub fn fingerprint() -> DeviceContext {
    let platform = platform::current_platform();
    let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty() && value != "C" && value != "POSIX");
    let (language, region) = locale
        .as_deref()
        .map(parse_locale)
        .unwrap_or_else(|| (FALLBACK_LANGUAGE.to_string(), None));

    DeviceContext {
        os_name_version: os_name_version(platform, platform::os_version().as_deref()),
        preferred_language: language,
        hardware_model_id: hardware_model(platform),
        region_code: region,
    }
}

pub fn os_name_version(platform: Platform, version: Option<&str>) -> String {
    match version.map(str::trim).filter(|v| !v.is_empty()) {
        Some(version) => format!("{} {}", platform.os_name(), version),
        None => platform.os_name().to_string(),
    }
}

/// Splits a POSIX (`pt_BR.UTF-8@euro`) or BCP-47 (`pt-BR`) locale into
/// language and optional region.
pub fn parse_locale(raw: &str) -> (String, Option<String>) {
    let base = raw.split(['.', '@']).next().unwrap_or_default();
    let mut parts = base.split(['_', '-']).filter(|p| !p.is_empty());

    let language = parts
        .next()
        .filter(|p| p.chars().all(|c| c.is_ascii_alphabetic()) && (2..=3).contains(&p.len()))
        .map(|p| p.to_ascii_lowercase())
        .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string());

    // Script subtags (`zh-Hant-TW`) are four letters and skipped.
    let region = parts.find_map(|p| {
        let alpha = p.len() == 2 && p.chars().all(|c| c.is_ascii_alphabetic());
        let numeric = p.len() == 3 && p.chars().all(|c| c.is_ascii_digit());
        (alpha || numeric).then(|| p.to_ascii_uppercase())
    });

    (language, region)
}

fn hardware_model(platform: Platform) -> String {
    for var in ["SIMULATOR_MODEL_IDENTIFIER", "SIMULATOR_DEVICE_NAME"] {
        if let Some(value) = non_empty(std::env::var(var).ok().as_deref()) {
            return value;
        }
    }
    native_model()
        .and_then(|model| non_empty(Some(&model)))
        .unwrap_or_else(|| platform.device_class())
}

#[cfg(target_os = "linux")]
fn native_model() -> Option<String> {
    std::fs::read_to_string("/sys/devices/virtual/dmi/id/product_name").ok()
}

#[cfg(target_os = "macos")]
fn native_model() -> Option<String> {
    platform::command_output("sysctl", &["-n", "hw.model"])
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn native_model() -> Option<String> {
    None
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
