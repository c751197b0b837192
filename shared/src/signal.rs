//! Network signal adapter.
//!
//! Turns the heterogeneous connectivity hints a shell can observe (browser
//! online/offline events, container network events, parent-window messages and
//! location hash fragments) into [`NetworkSignal`]s the state machine
//! understands. Which sources are consulted depends on the [`Environment`] the
//! shell reports at startup.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activation::ActivationReason;

/// Posted to the parent window once the core is listening for its messages.
pub const READY_MESSAGE: &str = "offline-mode-ready";

const COMMAND_PREFIX: &str = "cordova-";

/// A connectivity hint exactly as the shell observed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawSignal {
    BrowserOnline,
    BrowserOffline,
    ContainerOnline,
    ContainerOffline,
    ParentMessage { data: String },
    HashChanged { hash: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSignal {
    Down(ActivationReason),
    Up,
    /// Connectivity may have changed; check with a liveness probe.
    Uncertain,
}

impl NetworkSignal {
    fn from_online(online: bool) -> Self {
        if online {
            NetworkSignal::Up
        } else {
            NetworkSignal::Down(ActivationReason::NoNetwork)
        }
    }
}

/// Commands a hosting container sends through `postMessage` or the location
/// hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentCommand {
    Offline,
    Online,
    Pause,
    Resume,
    Other,
}

impl ParentCommand {
    pub fn parse(data: &str) -> Self {
        match data.trim().strip_prefix(COMMAND_PREFIX) {
            Some("offline") => ParentCommand::Offline,
            Some("online") => ParentCommand::Online,
            Some("pause") => ParentCommand::Pause,
            Some("resume") => ParentCommand::Resume,
            _ => ParentCommand::Other,
        }
    }

    pub fn from_hash(hash: &str) -> Self {
        match hash.strip_prefix('#') {
            Some(command) => Self::parse(command),
            None => ParentCommand::Other,
        }
    }

    pub fn signal(self) -> Option<NetworkSignal> {
        match self {
            ParentCommand::Offline => Some(NetworkSignal::Down(ActivationReason::NoNetwork)),
            ParentCommand::Online => Some(NetworkSignal::Up),
            ParentCommand::Pause | ParentCommand::Resume => Some(NetworkSignal::Uncertain),
            ParentCommand::Other => None,
        }
    }
}

/// What the shell knows about its surroundings at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Platform connectivity flag (`navigator.onLine` or equivalent).
    pub online: bool,
    /// Running inside a parent frame or container webview.
    pub embedded: bool,
    /// Connectivity reported by a native container, if one is present.
    pub container_connectivity: Option<bool>,
    pub location_hash: Option<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            online: true,
            embedded: false,
            container_connectivity: None,
            location_hash: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    /// Someone else's signal.
    NotMine,
    /// Recognised; `None` when it carries nothing actionable.
    Consumed(Option<NetworkSignal>),
}

pub trait SignalSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Signals from an authoritative source silence non-authoritative ones for
    /// the rest of the session.
    fn authoritative(&self) -> bool {
        false
    }

    fn translate(&self, raw: &RawSignal) -> Translation;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSignals;

impl SignalSource for BrowserSignals {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn translate(&self, raw: &RawSignal) -> Translation {
        match raw {
            RawSignal::BrowserOnline => Translation::Consumed(Some(NetworkSignal::Up)),
            RawSignal::BrowserOffline => {
                Translation::Consumed(Some(NetworkSignal::Down(ActivationReason::NoNetwork)))
            }
            _ => Translation::NotMine,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerSignals {
    embedded: bool,
}

impl ContainerSignals {
    pub fn new(embedded: bool) -> Self {
        Self { embedded }
    }
}

impl SignalSource for ContainerSignals {
    fn name(&self) -> &'static str {
        "container"
    }

    fn authoritative(&self) -> bool {
        true
    }

    fn translate(&self, raw: &RawSignal) -> Translation {
        match raw {
            RawSignal::ContainerOnline => Translation::Consumed(Some(NetworkSignal::Up)),
            RawSignal::ContainerOffline => {
                Translation::Consumed(Some(NetworkSignal::Down(ActivationReason::NoNetwork)))
            }
            RawSignal::ParentMessage { .. } | RawSignal::HashChanged { .. } if !self.embedded => {
                debug!("ignoring container command: not embedded");
                Translation::Consumed(None)
            }
            RawSignal::ParentMessage { data } => {
                Translation::Consumed(ParentCommand::parse(data).signal())
            }
            RawSignal::HashChanged { hash } => {
                Translation::Consumed(ParentCommand::from_hash(hash).signal())
            }
            _ => Translation::NotMine,
        }
    }
}

/// Masks the raw platform connectivity flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectivityFilter {
    container_online: Option<bool>,
}

impl ConnectivityFilter {
    pub fn record_container(&mut self, online: bool) {
        self.container_online = Some(online);
    }

    /// `None` while forced offline: the state is pinned and the platform flag
    /// must not move it.
    pub fn apply(&self, raw: bool, forced_offline: bool) -> Option<bool> {
        if forced_offline {
            return None;
        }
        Some(self.container_online.unwrap_or(raw))
    }
}

pub struct SignalAdapter {
    sources: Vec<Box<dyn SignalSource>>,
    container_authoritative: bool,
    filter: ConnectivityFilter,
}

impl SignalAdapter {
    /// Container signals are only listened to inside a frame or a native
    /// container; a plain browser page only has its own online/offline events.
    pub fn for_environment(env: &Environment) -> Self {
        let mut sources: Vec<Box<dyn SignalSource>> = Vec::with_capacity(2);
        if env.embedded || env.container_connectivity.is_some() {
            sources.push(Box::new(ContainerSignals::new(env.embedded)));
        }
        sources.push(Box::new(BrowserSignals));

        let mut filter = ConnectivityFilter::default();
        if let Some(online) = env.container_connectivity {
            filter.record_container(online);
        }

        Self {
            sources,
            container_authoritative: env.container_connectivity.is_some(),
            filter,
        }
    }

    pub fn container_authoritative(&self) -> bool {
        self.container_authoritative
    }

    pub fn normalize(&mut self, raw: &RawSignal) -> Option<NetworkSignal> {
        let Some((source, translated)) = self.sources.iter().find_map(|source| {
            match source.translate(raw) {
                Translation::NotMine => None,
                Translation::Consumed(signal) => Some((source, signal)),
            }
        }) else {
            debug!(?raw, "no source listens for this signal");
            return None;
        };

        let Some(signal) = translated else {
            debug!(source = source.name(), ?raw, "signal carried no command");
            return None;
        };

        if source.authoritative() {
            self.container_authoritative = true;
            if matches!(raw, RawSignal::ContainerOnline | RawSignal::ContainerOffline) {
                self.filter
                    .record_container(matches!(raw, RawSignal::ContainerOnline));
            }
        } else if self.container_authoritative {
            debug!(source = source.name(), ?raw, "suppressed: container is authoritative");
            return None;
        }

        Some(signal)
    }

    /// Signal to apply before anything else, when the page starts without
    /// connectivity.
    pub fn startup_signal(env: &Environment) -> Option<NetworkSignal> {
        let online = env.container_connectivity.unwrap_or(env.online);
        if !online {
            return Some(NetworkSignal::Down(ActivationReason::NoNetwork));
        }

        let hash_offline = env.embedded
            && env
                .location_hash
                .as_deref()
                .is_some_and(|hash| ParentCommand::from_hash(hash) == ParentCommand::Offline);
        hash_offline.then_some(NetworkSignal::Down(ActivationReason::NoNetwork))
    }

    /// Signal for a polled platform connectivity flag, if any.
    pub fn filter_platform(&self, online: bool, forced_offline: bool) -> Option<NetworkSignal> {
        self.filter
            .apply(online, forced_offline)
            .map(NetworkSignal::from_online)
    }
}

impl Default for SignalAdapter {
    fn default() -> Self {
        Self::for_environment(&Environment::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded() -> Environment {
        Environment {
            embedded: true,
            ..Environment::default()
        }
    }

    fn message(data: &str) -> RawSignal {
        RawSignal::ParentMessage {
            data: data.to_string(),
        }
    }

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!(ParentCommand::parse("cordova-offline"), ParentCommand::Offline);
        assert_eq!(ParentCommand::parse("cordova-online"), ParentCommand::Online);
        assert_eq!(ParentCommand::parse("cordova-pause"), ParentCommand::Pause);
        assert_eq!(ParentCommand::parse("cordova-resume"), ParentCommand::Resume);
        assert_eq!(ParentCommand::parse("offline"), ParentCommand::Other);
        assert_eq!(ParentCommand::parse("cordova-reboot"), ParentCommand::Other);
        assert_eq!(ParentCommand::from_hash("#cordova-offline"), ParentCommand::Offline);
        assert_eq!(ParentCommand::from_hash("cordova-offline"), ParentCommand::Other);
    }

    #[test]
    fn test_browser_signals() {
        let mut adapter = SignalAdapter::default();
        assert_eq!(
            adapter.normalize(&RawSignal::BrowserOffline),
            Some(NetworkSignal::Down(ActivationReason::NoNetwork))
        );
        assert_eq!(adapter.normalize(&RawSignal::BrowserOnline), Some(NetworkSignal::Up));
    }

    #[test]
    fn test_messages_ignored_when_not_embedded() {
        let mut adapter = SignalAdapter::default();
        assert_eq!(adapter.normalize(&message("cordova-offline")), None);
        assert_eq!(
            adapter.normalize(&RawSignal::HashChanged {
                hash: "#cordova-offline".into()
            }),
            None
        );
        // An ignored message does not make the container authoritative.
        assert!(!adapter.container_authoritative());
        assert_eq!(adapter.normalize(&RawSignal::BrowserOnline), Some(NetworkSignal::Up));
    }

    #[test]
    fn test_messages_accepted_when_embedded() {
        let mut adapter = SignalAdapter::for_environment(&embedded());
        assert_eq!(
            adapter.normalize(&message("cordova-offline")),
            Some(NetworkSignal::Down(ActivationReason::NoNetwork))
        );
        assert_eq!(
            adapter.normalize(&message("cordova-pause")),
            Some(NetworkSignal::Uncertain)
        );
        assert_eq!(
            adapter.normalize(&RawSignal::HashChanged {
                hash: "#cordova-online".into()
            }),
            Some(NetworkSignal::Up)
        );
        assert_eq!(adapter.normalize(&message("hello")), None);
    }

    #[test]
    fn test_plain_browser_has_no_container_source() {
        let mut adapter = SignalAdapter::default();
        assert_eq!(adapter.normalize(&RawSignal::ContainerOffline), None);
        assert_eq!(adapter.normalize(&RawSignal::ContainerOnline), None);
        assert!(!adapter.container_authoritative());
        assert_eq!(
            adapter.normalize(&RawSignal::BrowserOffline),
            Some(NetworkSignal::Down(ActivationReason::NoNetwork))
        );
    }

    #[test]
    fn test_container_silences_browser() {
        let mut adapter = SignalAdapter::for_environment(&embedded());
        assert!(adapter.normalize(&RawSignal::BrowserOffline).is_some());

        assert_eq!(
            adapter.normalize(&RawSignal::ContainerOnline),
            Some(NetworkSignal::Up)
        );
        assert!(adapter.container_authoritative());
        assert_eq!(adapter.normalize(&RawSignal::BrowserOffline), None);
        assert_eq!(adapter.normalize(&RawSignal::BrowserOnline), None);
    }

    #[test]
    fn test_container_environment_is_authoritative_from_start() {
        let env = Environment {
            container_connectivity: Some(true),
            ..Environment::default()
        };
        let mut adapter = SignalAdapter::for_environment(&env);
        assert_eq!(adapter.normalize(&RawSignal::BrowserOffline), None);
        // Native container without a parent frame: no message vocabulary.
        assert_eq!(adapter.normalize(&message("cordova-offline")), None);
        assert_eq!(
            adapter.normalize(&RawSignal::ContainerOffline),
            Some(NetworkSignal::Down(ActivationReason::NoNetwork))
        );
    }

    #[test]
    fn test_startup_signal() {
        assert_eq!(SignalAdapter::startup_signal(&Environment::default()), None);

        let offline = Environment {
            online: false,
            ..Environment::default()
        };
        assert_eq!(
            SignalAdapter::startup_signal(&offline),
            Some(NetworkSignal::Down(ActivationReason::NoNetwork))
        );

        let container_online = Environment {
            online: false,
            container_connectivity: Some(true),
            ..Environment::default()
        };
        assert_eq!(SignalAdapter::startup_signal(&container_online), None);

        let hashed = Environment {
            location_hash: Some("#cordova-offline".into()),
            ..embedded()
        };
        assert_eq!(
            SignalAdapter::startup_signal(&hashed),
            Some(NetworkSignal::Down(ActivationReason::NoNetwork))
        );

        let hashed_top_level = Environment {
            embedded: false,
            ..hashed
        };
        assert_eq!(SignalAdapter::startup_signal(&hashed_top_level), None);
    }

    #[test]
    fn test_filter() {
        let mut filter = ConnectivityFilter::default();
        assert_eq!(filter.apply(true, false), Some(true));
        assert_eq!(filter.apply(false, false), Some(false));
        assert_eq!(filter.apply(true, true), None);

        filter.record_container(false);
        assert_eq!(filter.apply(true, false), Some(false));
    }

    #[test]
    fn test_filter_platform_follows_container() {
        let mut adapter = SignalAdapter::default();
        adapter.normalize(&RawSignal::ContainerOffline);
        assert_eq!(
            adapter.filter_platform(true, false),
            Some(NetworkSignal::Down(ActivationReason::NoNetwork))
        );
        assert_eq!(adapter.filter_platform(true, true), None);
    }
}
