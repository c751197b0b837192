use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::activation::{ActivationEvent, ActivationReason};
use crate::capabilities::TimerId;
use crate::config::{ConnectivityConfig, HeartbeatInterval};
use crate::event::Event;
use crate::prober::{ProbeId, Prober};
use crate::signal::SignalAdapter;
use crate::view::{OfflinePresentation, OfflineView, SplashScreen};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for `Event::Started`.
    #[default]
    Idle,
    /// Waiting for the forced-offline flag.
    Restoring,
    Running,
}

/// Every page life begins offline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectivityState {
    Online,
    #[default]
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    Probe,
    ProbeTimeout,
    FallbackPoll,
    RequestTimeout,
    ForcedReactivation,
}

/// At most one live timer per purpose. Firings for ids that are no longer
/// tracked are stale.
#[derive(Debug, Default)]
pub struct Timers {
    next: u64,
    armed: HashMap<TimerPurpose, TimerId>,
}

impl Timers {
    /// Allocates a fresh id for `purpose`, returning it with the id it
    /// replaces, if any.
    pub fn arm(&mut self, purpose: TimerPurpose) -> (TimerId, Option<TimerId>) {
        self.next = self.next.wrapping_add(1);
        let id = TimerId(self.next);
        (id, self.armed.insert(purpose, id))
    }

    pub fn disarm(&mut self, purpose: TimerPurpose) -> Option<TimerId> {
        self.armed.remove(&purpose)
    }

    pub fn take_if_current(&mut self, id: TimerId) -> Option<TimerPurpose> {
        let purpose = self
            .armed
            .iter()
            .find_map(|(purpose, armed)| (*armed == id).then_some(*purpose))?;
        self.armed.remove(&purpose);
        Some(purpose)
    }

    pub fn id(&self, purpose: TimerPurpose) -> Option<TimerId> {
        self.armed.get(&purpose).copied()
    }
}

/// The host application's connection, once it has attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostLink {
    pub heartbeat: HeartbeatInterval,
    /// Interval to put back on resume, captured when offline probing took the
    /// heartbeat over.
    pub restore: Option<HeartbeatInterval>,
}

impl HostLink {
    pub fn new(heartbeat: HeartbeatInterval) -> Self {
        Self {
            heartbeat,
            restore: None,
        }
    }
}

pub struct Model {
    pub(crate) config: ConnectivityConfig,
    pub(crate) phase: Phase,
    pub(crate) pending: Vec<Event>,
    pub(crate) state: ConnectivityState,
    pub(crate) last_offline_event: Option<ActivationEvent>,
    pub(crate) forced_offline: bool,
    pub(crate) view: Box<dyn OfflineView>,
    pub(crate) host: Option<HostLink>,
    pub(crate) signals: SignalAdapter,
    pub(crate) prober: Prober,
    pub(crate) timers: Timers,
}

impl Default for Model {
    fn default() -> Self {
        Self::with_view(Box::new(SplashScreen::new()))
    }
}

impl Model {
    /// A model driving a custom offline view instead of the splash screen.
    pub fn with_view(view: Box<dyn OfflineView>) -> Self {
        Self {
            config: ConnectivityConfig::default(),
            phase: Phase::default(),
            pending: Vec::new(),
            state: ConnectivityState::default(),
            last_offline_event: None,
            forced_offline: false,
            view,
            host: None,
            signals: SignalAdapter::default(),
            prober: Prober::default(),
            timers: Timers::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state == ConnectivityState::Online
    }

    pub fn last_offline_event(&self) -> Option<&ActivationEvent> {
        self.last_offline_event.as_ref()
    }

    pub fn last_offline_reason(&self) -> Option<ActivationReason> {
        self.last_offline_event.as_ref().map(ActivationEvent::reason)
    }

    pub fn forced_offline(&self) -> bool {
        self.forced_offline
    }

    pub fn config(&self) -> &ConnectivityConfig {
        &self.config
    }

    pub fn view(&self) -> &dyn OfflineView {
        self.view.as_ref()
    }

    pub fn presentation(&self) -> OfflinePresentation {
        self.view.presentation()
    }

    pub fn host(&self) -> Option<&HostLink> {
        self.host.as_ref()
    }

    pub fn in_flight_probe(&self) -> Option<ProbeId> {
        self.prober.in_flight()
    }

    pub fn timer(&self, purpose: TimerPurpose) -> Option<TimerId> {
        self.timers.id(purpose)
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }
}
