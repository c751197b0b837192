use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::prober::ProbeEndpoint;

pub const DEFAULT_APP_ROOT: &str = "http://localhost:8080/";
pub const DEFAULT_PROBE_PATH: &str = "PING";
pub const DEFAULT_PROBE_TIMEOUT_SECS: u32 = 30;
pub const DEFAULT_FALLBACK_POLL_SECS: u32 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u32 = 30;
pub const DEFAULT_FORCED_REACTIVATION_DELAY_MS: u64 = 1000;
pub const MAX_TIMEOUT_SECS: u32 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid probe endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("probe timeout must be between 1 and {max} seconds, got {secs}")]
    InvalidTimeout { secs: u32, max: u32 },

    #[error("fallback poll interval cannot be zero")]
    ZeroPollInterval,

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Heartbeat cadence of the host connection, or of our own probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatInterval {
    Every { secs: u32 },
    Disabled,
}

impl HeartbeatInterval {
    /// Hosts report heartbeat intervals as seconds with a negative sentinel for
    /// "disabled".
    pub fn from_host_secs(secs: i32) -> Self {
        match u32::try_from(secs) {
            Ok(secs) => HeartbeatInterval::Every { secs },
            Err(_) => HeartbeatInterval::Disabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Root URL of the online application; the probe path is resolved against it.
    pub app_root: String,
    pub probe_path: String,
    /// Probe request timeout, and the probe/heartbeat interval while offline.
    pub probe_timeout_secs: u32,
    /// `None` disables the periodic platform re-check.
    pub fallback_poll_secs: Option<u32>,
    /// `None` disables host request-timeout tracking.
    pub request_timeout_secs: Option<u32>,
    pub forced_reactivation_delay_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            app_root: DEFAULT_APP_ROOT.to_string(),
            probe_path: DEFAULT_PROBE_PATH.to_string(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            fallback_poll_secs: Some(DEFAULT_FALLBACK_POLL_SECS),
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            forced_reactivation_delay_ms: DEFAULT_FORCED_REACTIVATION_DELAY_MS,
        }
    }
}

impl ConnectivityConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_secs == 0 || self.probe_timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidTimeout {
                secs: self.probe_timeout_secs,
                max: MAX_TIMEOUT_SECS,
            });
        }
        if self.fallback_poll_secs == Some(0) {
            return Err(ConfigError::ZeroPollInterval);
        }
        self.probe_endpoint()?;
        Ok(())
    }

    pub fn probe_endpoint(&self) -> Result<ProbeEndpoint, ConfigError> {
        ProbeEndpoint::new(&self.app_root, &self.probe_path)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.probe_timeout_secs))
    }

    /// Interval used for probing and for the host heartbeat while offline.
    pub fn offline_interval(&self) -> HeartbeatInterval {
        HeartbeatInterval::Every {
            secs: self.probe_timeout_secs,
        }
    }

    pub fn fallback_poll(&self) -> Option<Duration> {
        self.fallback_poll_secs
            .map(|secs| Duration::from_secs(u64::from(secs)))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .map(|secs| Duration::from_secs(u64::from(secs)))
    }

    pub fn forced_reactivation_delay(&self) -> Duration {
        Duration::from_millis(self.forced_reactivation_delay_ms)
    }
}
