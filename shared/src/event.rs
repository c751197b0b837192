use serde::{Deserialize, Serialize};

use crate::capabilities::TimerOutput;
use crate::config::ConnectivityConfig;
use crate::persistence::PersistenceError;
use crate::prober::{ProbeId, ProbeOutcome};
use crate::signal::{Environment, RawSignal};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Shell lifecycle
    Started {
        environment: Environment,
        config: ConnectivityConfig,
    },
    Signal(RawSignal),

    // Developer console and server side application
    ForceOffline,
    ForceOnline,

    // Host connection
    HostAttached {
        /// Negative means the host heartbeat is disabled.
        heartbeat_interval_secs: i32,
    },
    HostRequestStarting,
    /// Server side request timeout; negative disables tracking. Applies from
    /// the next request on.
    RequestTimeoutChanged {
        secs: i32,
    },
    HostResponseStarted,
    HostResponseEnded,
    HostCommunicationError {
        status: u16,
        details: String,
    },
    HeartbeatResponded {
        status: u16,
    },

    // Internal
    #[serde(skip)]
    ForcedFlagRestored(Result<bool, PersistenceError>),
    #[serde(skip)]
    ForcedFlagStored(Result<(), PersistenceError>),
    #[serde(skip)]
    TimerElapsed(TimerOutput),
    #[serde(skip)]
    ProbeCompleted { probe: ProbeId, outcome: ProbeOutcome },
    #[serde(skip)]
    PlatformConnectivity { online: bool },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Started { .. } => "started",
            Event::Signal(_) => "signal",
            Event::ForceOffline => "force_offline",
            Event::ForceOnline => "force_online",
            Event::HostAttached { .. } => "host_attached",
            Event::HostRequestStarting => "host_request_starting",
            Event::RequestTimeoutChanged { .. } => "request_timeout_changed",
            Event::HostResponseStarted => "host_response_started",
            Event::HostResponseEnded => "host_response_ended",
            Event::HostCommunicationError { .. } => "host_communication_error",
            Event::HeartbeatResponded { .. } => "heartbeat_responded",
            Event::ForcedFlagRestored(_) => "forced_flag_restored",
            Event::ForcedFlagStored(_) => "forced_flag_stored",
            Event::TimerElapsed(_) => "timer_elapsed",
            Event::ProbeCompleted { .. } => "probe_completed",
            Event::PlatformConnectivity { .. } => "platform_connectivity",
        }
    }

    /// Events that must wait until the forced-offline flag has been read.
    pub fn needs_restored_state(&self) -> bool {
        !matches!(
            self,
            Event::Started { .. }
                | Event::ForcedFlagRestored(_)
                | Event::ForcedFlagStored(_)
                | Event::TimerElapsed(_)
        )
    }
}
