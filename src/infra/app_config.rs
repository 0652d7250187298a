use crate::domain::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://gate.example.com/server.php";
pub const DEFAULT_ACCESS_CODE: &str = "pathways";
pub const DEFAULT_EXPECTED_TOKEN: &str = "GJDFHDFHFDJGSDAGKGHK";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Gate endpoint queried on launch.
    pub endpoint: String,
    /// Access code sent as the `p` query parameter.
    pub access_code: String,
    /// Token that must prefix a web-session response.
    pub expected_token: String,
    pub max_attempts: u32,
    pub request_timeout_secs: u64,
    pub watchdog_secs: u64,
    pub page_load_timeout_secs: u64,
    /// Per-field overrides for the device fingerprint.
    pub device: DeviceOverrides,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceOverrides {
    pub os_name_version: Option<String>,
    pub preferred_language: Option<String>,
    pub hardware_model_id: Option<String>,
    pub region_code: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_code: DEFAULT_ACCESS_CODE.to_string(),
            expected_token: DEFAULT_EXPECTED_TOKEN.to_string(),
            max_attempts: 30,
            request_timeout_secs: 30,
            watchdog_secs: 5,
            page_load_timeout_secs: 60,
            device: DeviceOverrides::default(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_secs(self.watchdog_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}

/// Loads the config file, falling back to defaults when it is missing or invalid.
pub fn load_config() -> AppConfig {
    let path = config_path();
    match try_load_config(&path) {
        Ok(Some(config)) => config,
        Ok(None) => AppConfig::default(),
        Err(err) => {
            log::warn!("Ignoring config at {}: {}", path.display(), err);
            AppConfig::default()
        }
    }
}

pub fn try_load_config(path: &std::path::Path) -> Result<Option<AppConfig>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(toml::from_str(&contents)?))
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("PATHWAYS_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    app_data_dir().join("config.toml")
}

pub fn app_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("PATHWAYS_DATA_HOME") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = home::home_dir() {
            return home
                .join("Library")
                .join("Application Support")
                .join("Pathways");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("Pathways");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("pathways");
        }
        if let Some(home) = home::home_dir() {
            return home.join(".local").join("share").join("pathways");
        }
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".pathways")
}
