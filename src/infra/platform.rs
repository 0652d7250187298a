//! Platform detection with WSL support.
//!
//! Feeds the OS half of the device fingerprint: which platform we run on
//! and what version it reports.

use std::process::Command;
use std::sync::OnceLock;

/// Represents the detected platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    LinuxWsl,
    Windows,
    Unknown,
}

impl Platform {
    /// Name sent in the `os` field of the gate request.
    pub fn os_name(self) -> &'static str {
        match self {
            Self::MacOS => "macOS",
            Self::Linux => "Linux",
            Self::LinuxWsl => "Linux (WSL)",
            Self::Windows => "Windows",
            Self::Unknown => std::env::consts::OS,
        }
    }

    /// Generic device class used when no hardware model can be read.
    pub fn device_class(self) -> String {
        format!("{} device", self.os_name())
    }
}

/// Cached platform detection result.
static PLATFORM: OnceLock<Platform> = OnceLock::new();

/// Cached OS version string.
static OS_VERSION: OnceLock<Option<String>> = OnceLock::new();

/// Returns true if running inside WSL (Windows Subsystem for Linux).
pub fn is_wsl() -> bool {
    matches!(current_platform(), Platform::LinuxWsl)
}

/// Returns the current platform with WSL detection.
pub fn current_platform() -> Platform {
    *PLATFORM.get_or_init(detect_platform)
}

/// OS version as reported by the system, if it could be read.
pub fn os_version() -> Option<String> {
    OS_VERSION.get_or_init(detect_os_version).clone()
}

fn detect_platform() -> Platform {
    #[cfg(target_os = "macos")]
    {
        Platform::MacOS
    }
    #[cfg(target_os = "windows")]
    {
        Platform::Windows
    }
    #[cfg(target_os = "linux")]
    {
        if detect_wsl() {
            Platform::LinuxWsl
        } else {
            Platform::Linux
        }
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        Platform::Unknown
    }
}

fn detect_os_version() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|contents| os_release_version(&contents))
    }
    #[cfg(target_os = "macos")]
    {
        command_output("sw_vers", &["-productVersion"])
    }
    #[cfg(target_os = "windows")]
    {
        command_output("cmd", &["/C", "ver"]).and_then(|ver| numeric_version(&ver))
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}

/// Runs a probe command and returns its trimmed stdout when it succeeds.
pub fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Extracts `VERSION_ID` from an os-release file.
pub fn os_release_version(contents: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let value = line.strip_prefix("VERSION_ID=")?;
        let value = value.trim().trim_matches('"').trim_matches('\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// First dotted numeric run in `raw`, e.g. `10.0.19045` out of
/// `Microsoft Windows [Version 10.0.19045]`.
pub fn numeric_version(raw: &str) -> Option<String> {
    raw.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .map(|token| token.trim_matches('.'))
        .find(|token| token.starts_with(|c: char| c.is_ascii_digit()))
        .map(str::to_string)
}

/// Detects if running under WSL using multiple indicators.
#[cfg(target_os = "linux")]
fn detect_wsl() -> bool {
    if std::env::var("WSL_DISTRO_NAME").is_ok() {
        return true;
    }

    if std::path::Path::new("/proc/sys/fs/binfmt_misc/WSLInterop").exists() {
        return true;
    }

    if let Ok(version) = std::fs::read_to_string("/proc/version") {
        let version_lower = version.to_lowercase();
        if version_lower.contains("microsoft") || version_lower.contains("wsl") {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_platform_returns_consistent_value() {
        let p1 = current_platform();
        let p2 = current_platform();
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_is_wsl_matches_platform() {
        let platform = current_platform();
        assert_eq!(is_wsl(), platform == Platform::LinuxWsl);
    }

    #[test]
    fn test_os_release_version() {
        let contents = "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\n";
        assert_eq!(os_release_version(contents).as_deref(), Some("22.04"));
        assert_eq!(os_release_version("NAME=Arch\n"), None);
        assert_eq!(os_release_version("VERSION_ID=\n"), None);
    }

    #[test]
    fn test_numeric_version() {
        assert_eq!(numeric_version("iOS 17.4").as_deref(), Some("17.4"));
        assert_eq!(
            numeric_version("Microsoft Windows [Version 10.0.19045.1234]").as_deref(),
            Some("10.0.19045.1234")
        );
        assert_eq!(numeric_version("22.04").as_deref(), Some("22.04"));
        assert_eq!(numeric_version("Linux (WSL)"), None);
        assert_eq!(numeric_version(""), None);
    }

    #[test]
    fn test_device_class() {
        assert_eq!(Platform::MacOS.device_class(), "macOS device");
    }
}
