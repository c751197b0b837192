use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::activation::{
    ActivationEvent, ActivationReason, ACTIVATED_BY_REQUEST, APP_STARTING, BAD_RESPONSE, UNKNOWN,
};
use crate::capabilities::{Capabilities, ConnectivityNotice, TimerOutput};
use crate::config::{ConnectivityConfig, HeartbeatInterval};
use crate::event::Event;
use crate::machine::{self, arm_timer, disarm_timer, go_offline, resume};
use crate::model::{ConnectivityState, HostLink, Model, Phase, TimerPurpose};
use crate::persistence::{self, PersistenceError};
use crate::prober::{self, Prober, ProbeId, ProbeOutcome};
use crate::signal::{Environment, NetworkSignal, SignalAdapter, READY_MESSAGE};
use crate::view::OfflinePresentation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ViewModel {
    pub online: bool,
    pub forced_offline: bool,
    pub presentation: OfflinePresentation,
    pub reason: Option<ActivationReason>,
    pub message: Option<String>,
}

#[derive(Default)]
pub struct App;

impl App {
    fn start(
        model: &mut Model,
        caps: &Capabilities,
        environment: &Environment,
        config: ConnectivityConfig,
    ) {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "invalid connectivity config, falling back to defaults");
                ConnectivityConfig::default()
            }
        };

        let endpoint = match config.probe_endpoint() {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                warn!(error = %e, "liveness probing disabled");
                None
            }
        };
        info!(
            embedded = environment.embedded,
            online = environment.online,
            endpoint = endpoint.as_ref().map(|e| e.as_str()),
            "offline mode starting"
        );

        model.prober = Prober::new(endpoint);
        model.config = config;
        model.signals = SignalAdapter::for_environment(environment);
        model.phase = Phase::Restoring;

        if let Some(signal) = SignalAdapter::startup_signal(environment) {
            info!(?signal, "platform reports no connectivity at startup");
            machine::apply_signal(model, caps, signal);
        }

        if environment.embedded {
            caps.platform.notify_parent(READY_MESSAGE);
        }
    }

    fn flag_restored(
        &self,
        model: &mut Model,
        caps: &Capabilities,
        result: Result<bool, PersistenceError>,
    ) {
        let forced = result.unwrap_or_else(|e| {
            warn!(error = %e, "forced-offline flag unreadable, assuming not forced");
            false
        });

        model.forced_offline = forced;
        model.phase = Phase::Running;

        if forced {
            info!("restored forced offline from a previous page life");
            go_offline(model, caps, ACTIVATED_BY_REQUEST);
            let delay = model.config.forced_reactivation_delay();
            arm_timer(model, caps, TimerPurpose::ForcedReactivation, delay);
        } else if model.last_offline_event.is_none() {
            go_offline(model, caps, APP_STARTING);
        } else {
            caps.render.render();
        }

        if let Some(every) = model.config.fallback_poll() {
            arm_timer(model, caps, TimerPurpose::FallbackPoll, every);
        }

        let pending = std::mem::take(&mut model.pending);
        if !pending.is_empty() {
            debug!(count = pending.len(), "replaying events received during startup");
        }
        for event in pending {
            crux_core::App::update(self, event, model, caps);
        }
    }

    fn timer_elapsed(model: &mut Model, caps: &Capabilities, output: TimerOutput) {
        let TimerOutput::Elapsed { id } = output else {
            debug!(id = %output.id(), "timer cancelled by shell");
            return;
        };
        let Some(purpose) = model.timers.take_if_current(id) else {
            debug!(%id, "stale timer firing ignored");
            return;
        };

        match purpose {
            TimerPurpose::Probe => {
                if model.state == ConnectivityState::Offline && !model.forced_offline {
                    prober::probe_now(model, caps);
                    prober::restart_schedule(model, caps);
                }
            }
            TimerPurpose::ProbeTimeout => {
                if let Some(probe) = model.prober.abandon() {
                    warn!(%probe, "liveness probe timed out");
                    if !model.forced_offline {
                        go_offline(model, caps, UNKNOWN);
                    }
                }
            }
            TimerPurpose::FallbackPoll => {
                caps.platform
                    .query_connectivity(|online| Event::PlatformConnectivity { online });
                if let Some(every) = model.config.fallback_poll() {
                    arm_timer(model, caps, TimerPurpose::FallbackPoll, every);
                }
            }
            TimerPurpose::RequestTimeout => {
                warn!("host request timed out");
                go_offline(model, caps, BAD_RESPONSE);
            }
            TimerPurpose::ForcedReactivation => {
                if model.forced_offline && !model.view.is_active() {
                    let event = model
                        .last_offline_event
                        .clone()
                        .unwrap_or(ACTIVATED_BY_REQUEST);
                    info!("re-asserting forced offline view");
                    model.view.activate(&event);
                    caps.render.render();
                }
            }
        }
    }

    fn probe_completed(
        model: &mut Model,
        caps: &Capabilities,
        probe: ProbeId,
        outcome: ProbeOutcome,
    ) {
        if !model.prober.settle(probe) {
            debug!(%probe, ?outcome, "stale probe result dropped");
            return;
        }
        disarm_timer(model, caps, TimerPurpose::ProbeTimeout);

        if model.forced_offline {
            debug!(%probe, "probe result ignored: forced offline");
            return;
        }

        match outcome {
            ProbeOutcome::Alive => {
                if model.state == ConnectivityState::Offline {
                    resume(model, caps);
                } else {
                    debug!(%probe, "server alive, already online");
                }
            }
            ProbeOutcome::BadStatus(status) => {
                machine::server_answered(model, caps, status, "liveness probe");
            }
            ProbeOutcome::Failed(error) => {
                warn!(%probe, %error, "liveness probe failed");
                let event = ActivationEvent::new(
                    ActivationReason::Unknown,
                    format!("Offline mode because server is unreachable: {error}"),
                );
                go_offline(model, caps, event);
            }
        }
    }

    fn host_attached(model: &mut Model, caps: &Capabilities, heartbeat: HeartbeatInterval) {
        info!(?heartbeat, "host connection attached");
        match model.host.as_mut() {
            // A re-attach keeps the interval captured when offline probing
            // took over the heartbeat.
            Some(link) => link.heartbeat = heartbeat,
            None => model.host = Some(HostLink::new(heartbeat)),
        }

        if model.forced_offline {
            caps.host.set_application_running(false);
            let event = model
                .last_offline_event
                .clone()
                .unwrap_or(ACTIVATED_BY_REQUEST);
            caps.host.broadcast(ConnectivityNotice::Offline { event });
            caps.render.render();
        } else if model.state == ConnectivityState::Online {
            caps.host.set_application_running(true);
        } else {
            // The host only attaches after the server answered.
            resume(model, caps);
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        if model.phase != Phase::Running && event.needs_restored_state() {
            debug!(event = event.name(), "queued until startup completes");
            model.pending.push(event);
            return;
        }

        match event {
            Event::Started {
                environment,
                config,
            } => {
                if model.phase == Phase::Idle {
                    Self::start(model, caps, &environment, config);
                    if let Err(e) = persistence::restore(caps) {
                        self.flag_restored(model, caps, Err(e));
                    }
                } else {
                    warn!("duplicate start ignored");
                }
            }

            Event::ForcedFlagRestored(result) => {
                if model.phase == Phase::Restoring {
                    self.flag_restored(model, caps, result);
                } else {
                    debug!("late forced-offline flag ignored");
                }
            }

            Event::ForcedFlagStored(result) => match result {
                Ok(()) => debug!("forced-offline flag persisted"),
                Err(e) => warn!(error = %e, "failed to persist forced-offline flag"),
            },

            Event::Signal(raw) => {
                if let Some(signal) = model.signals.normalize(&raw) {
                    debug!(?raw, ?signal, "network signal");
                    machine::apply_signal(model, caps, signal);
                }
            }

            Event::PlatformConnectivity { online } => {
                match model.signals.filter_platform(online, model.forced_offline) {
                    // A polled "online" only says the device has a network; ask the server.
                    Some(NetworkSignal::Up) => {
                        if model.state == ConnectivityState::Offline {
                            prober::probe_now(model, caps);
                        }
                    }
                    Some(signal) => machine::apply_signal(model, caps, signal),
                    None => debug!(online, "platform connectivity masked"),
                }
            }

            Event::ForceOffline => machine::force_offline(model, caps),
            Event::ForceOnline => machine::force_online(model, caps),

            Event::HostAttached {
                heartbeat_interval_secs,
            } => {
                let heartbeat = HeartbeatInterval::from_host_secs(heartbeat_interval_secs);
                Self::host_attached(model, caps, heartbeat);
            }

            Event::HostRequestStarting => {
                if let Some(timeout) = model.config.request_timeout() {
                    arm_timer(model, caps, TimerPurpose::RequestTimeout, timeout);
                }
            }

            Event::RequestTimeoutChanged { secs } => {
                let secs = u32::try_from(secs).ok();
                debug!(?secs, "host request timeout changed");
                model.config.request_timeout_secs = secs;
                if secs.is_none() {
                    disarm_timer(model, caps, TimerPurpose::RequestTimeout);
                }
            }

            Event::HostResponseStarted => {
                disarm_timer(model, caps, TimerPurpose::RequestTimeout);
            }

            Event::HostResponseEnded => resume(model, caps),

            Event::HostCommunicationError { status, details } => {
                warn!(status, %details, "host communication error");
                disarm_timer(model, caps, TimerPurpose::RequestTimeout);
                go_offline(model, caps, BAD_RESPONSE);
            }

            Event::HeartbeatResponded { status } => {
                machine::server_answered(model, caps, status, "heartbeat");
            }

            Event::TimerElapsed(output) => Self::timer_elapsed(model, caps, output),

            Event::ProbeCompleted { probe, outcome } => {
                Self::probe_completed(model, caps, probe, outcome);
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel {
            online: model.state == ConnectivityState::Online,
            forced_offline: model.forced_offline,
            presentation: model.view.presentation(),
            reason: model.last_offline_reason(),
            message: model
                .last_offline_event
                .as_ref()
                .map(|event| event.message().to_string()),
        }
    }
}
