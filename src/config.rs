//! Phone Configuration
//!
//! Settings for the call core, the NUI bridge and the local event server.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("NUI base URL is required")]
    MissingBaseUrl,
    #[error("NUI base URL must start with http:// or https://: {0}")]
    InvalidBaseUrl(String),
    #[error("Timer tick interval must be greater than zero")]
    InvalidTickInterval,
    #[error("Ring timeout must be greater than zero when set")]
    InvalidRingTimeout,
    #[error("Request timeout must be greater than zero")]
    InvalidRequestTimeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneConfig {
    /// NUI callback base (e.g., "https://phone" inside the game client)
    pub nui_base_url: String,

    /// This device's phone number
    pub self_number: String,

    /// Local ring timeout; `None` relies on the game client to push `unanswered`
    pub ring_timeout_ms: Option<u64>,

    /// Call timer refresh interval
    pub tick_interval_ms: u64,

    /// Timeout for NUI callbacks
    pub request_timeout_ms: u64,

    /// Port for the local event bridge server (native only)
    pub bridge_port: u16,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            nui_base_url: "https://phone".to_string(),
            self_number: String::new(),
            ring_timeout_ms: None,
            tick_interval_ms: 1000,
            request_timeout_ms: 10_000,
            bridge_port: 3030,
        }
    }
}

impl PhoneConfig {
    /// Create config from environment variables, falling back to defaults
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from the page query string
    /// (e.g. `index.html?PHONE_SELF_NUMBER=5550001&PHONE_RING_TIMEOUT_MS=30000`).
    /// Missing or unreadable parameters fall back to defaults.
    #[cfg(target_arch = "wasm32")]
    pub fn from_page_url() -> Self {
        let params = web_sys::window()
            .and_then(|w| w.location().search().ok())
            .and_then(|search| web_sys::UrlSearchParams::new_with_str(&search).ok());

        match params {
            Some(params) => Self::from_lookup(|key| params.get(key)),
            None => {
                tracing::warn!("Page URL unavailable, using default phone configuration");
                Self::default()
            }
        }
    }

    /// Build config from `PHONE_*` keys resolved by `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            nui_base_url: lookup("PHONE_NUI_BASE_URL").unwrap_or(defaults.nui_base_url),
            self_number: lookup("PHONE_SELF_NUMBER").unwrap_or(defaults.self_number),
            ring_timeout_ms: lookup("PHONE_RING_TIMEOUT_MS").and_then(|p| p.parse().ok()),
            tick_interval_ms: lookup("PHONE_TICK_INTERVAL_MS")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.tick_interval_ms),
            request_timeout_ms: lookup("PHONE_REQUEST_TIMEOUT_MS")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.request_timeout_ms),
            bridge_port: lookup("PHONE_BRIDGE_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.bridge_port),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nui_base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if !self.nui_base_url.starts_with("http://") && !self.nui_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl(self.nui_base_url.clone()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        if self.ring_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidRingTimeout);
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn ring_timeout(&self) -> Option<Duration> {
        self.ring_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
