//! Server liveness prober.
//!
//! While offline the core POSTs to a well-known endpoint under the application
//! root. At most one probe request is outstanding; at most one probe schedule
//! is armed. Results are matched against the in-flight [`ProbeId`] so a late
//! answer to a probe that was abandoned (by a resume or a timeout) is dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use url::Url;

use crate::capabilities::Capabilities;
use crate::config::ConfigError;
use crate::event::Event;
use crate::machine::{arm_timer, disarm_timer};
use crate::model::{Model, TimerPurpose};

pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeEndpoint {
    url: String,
}

impl ProbeEndpoint {
    pub fn new(app_root: &str, path: &str) -> Result<Self, ConfigError> {
        let root = Self::validate_root(app_root)?;

        if path.is_empty() || path.starts_with('/') || path.contains("..") || path.contains("://") {
            return Err(ConfigError::InvalidEndpoint {
                url: path.to_string(),
                reason: "probe path must be a non-empty path relative to the application root"
                    .to_string(),
            });
        }

        let url = root.join(path).map_err(|e| ConfigError::InvalidEndpoint {
            url: path.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            url: url.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    fn validate_root(app_root: &str) -> Result<Url, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidEndpoint {
            url: Self::truncate_url(app_root),
            reason: reason.to_string(),
        };

        if app_root.trim().is_empty() {
            return Err(invalid("application root cannot be empty"));
        }

        if app_root.len() > MAX_URL_LENGTH {
            return Err(invalid("application root is too long"));
        }

        let mut parsed = Url::parse(app_root).map_err(|e| invalid(&e.to_string()))?;

        let scheme = parsed.scheme().to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(invalid("only 'http' and 'https' are allowed"));
        }

        if parsed.host_str().is_none() {
            return Err(invalid("URL must have a host"));
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(invalid("credentials in URL are not allowed"));
        }

        // Url::join replaces the last segment unless the root ends in a slash.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        parsed.set_query(None);
        parsed.set_fragment(None);

        Ok(parsed)
    }

    fn truncate_url(url: &str) -> String {
        if url.len() <= 100 {
            url.to_string()
        } else {
            let cut = (0..=100).rev().find(|i| url.is_char_boundary(*i)).unwrap_or(0);
            format!("{}...", &url[..cut])
        }
    }
}

impl fmt::Display for ProbeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeId(pub u64);

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    /// Any 2xx.
    Alive,
    /// Server reachable, but answered with a non-2xx status.
    BadStatus(u16),
    /// Transport failure or timeout.
    Failed(String),
}

impl ProbeOutcome {
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            ProbeOutcome::Alive
        } else {
            ProbeOutcome::BadStatus(status)
        }
    }
}

pub fn classify(result: crux_http::Result<crux_http::Response<Vec<u8>>>) -> ProbeOutcome {
    match result {
        Ok(response) => ProbeOutcome::from_status(u16::from(response.status())),
        Err(crux_http::Error::Http(e)) => ProbeOutcome::BadStatus(u16::from(e.code)),
        Err(e) => ProbeOutcome::Failed(e.to_string()),
    }
}

#[derive(Debug, Default)]
pub struct Prober {
    endpoint: Option<ProbeEndpoint>,
    in_flight: Option<ProbeId>,
    next_id: u64,
}

impl Prober {
    pub fn new(endpoint: Option<ProbeEndpoint>) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    pub fn endpoint(&self) -> Option<&ProbeEndpoint> {
        self.endpoint.as_ref()
    }

    pub fn in_flight(&self) -> Option<ProbeId> {
        self.in_flight
    }

    /// Reserve the next probe. `None` while another probe is outstanding or
    /// when no endpoint is configured.
    fn begin(&mut self) -> Option<(ProbeId, String)> {
        if self.in_flight.is_some() {
            return None;
        }
        let url = self.endpoint.as_ref()?.as_str().to_string();
        self.next_id = self.next_id.wrapping_add(1);
        let id = ProbeId(self.next_id);
        self.in_flight = Some(id);
        Some((id, url))
    }

    /// Returns `true` if `id` was the outstanding probe.
    pub fn settle(&mut self, id: ProbeId) -> bool {
        if self.in_flight == Some(id) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    pub fn abandon(&mut self) -> Option<ProbeId> {
        self.in_flight.take()
    }
}

/// Issue one probe now, unless one is already outstanding.
pub(crate) fn probe_now(model: &mut Model, caps: &Capabilities) {
    let Some((probe, url)) = model.prober.begin() else {
        if model.prober.endpoint().is_none() {
            warn!("liveness probe skipped: no probe endpoint configured");
        } else {
            debug!("liveness probe skipped: one already in flight");
        }
        return;
    };

    debug!(%probe, %url, "sending liveness probe");
    caps.http.post(&url).send(move |result| Event::ProbeCompleted {
        probe,
        outcome: classify(result),
    });

    let timeout = model.config.probe_timeout();
    arm_timer(model, caps, TimerPurpose::ProbeTimeout, timeout);
}

/// (Re)arm the repeating probe schedule; any previous schedule is replaced.
pub(crate) fn restart_schedule(model: &mut Model, caps: &Capabilities) {
    let interval = model.config.probe_timeout();
    arm_timer(model, caps, TimerPurpose::Probe, interval);
}

/// Cancel the schedule and forget the outstanding probe, whose response will
/// then be ignored.
pub(crate) fn stop(model: &mut Model, caps: &Capabilities) {
    disarm_timer(model, caps, TimerPurpose::Probe);
    disarm_timer(model, caps, TimerPurpose::ProbeTimeout);
    if let Some(probe) = model.prober.abandon() {
        debug!(%probe, "abandoned in-flight probe");
    }
}
