//! Connectivity state machine.
//!
//! Two states, [`ConnectivityState::Online`] and [`ConnectivityState::Offline`].
//! All mutation of the connectivity pair (`state`, `last_offline_event`)
//! happens here, called from `App::update` one event at a time. The offline
//! view is driven through its trait object and has no way back into the
//! machine, so a transition never re-enters another one.

use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::activation::{ActivationEvent, ActivationReason, ACTIVATED_BY_REQUEST};
use crate::capabilities::{Capabilities, ConnectivityNotice};
use crate::event::Event;
use crate::model::{ConnectivityState, Model, TimerPurpose};
use crate::prober;
use crate::signal::NetworkSignal;
use crate::view::ViewContext;

/// Start a timer for `purpose`, cancelling the one it replaces.
pub(crate) fn arm_timer(
    model: &mut Model,
    caps: &Capabilities,
    purpose: TimerPurpose,
    after: Duration,
) {
    let (id, previous) = model.timers.arm(purpose);
    if let Some(previous) = previous {
        caps.timer.cancel(previous);
    }
    debug!(%id, ?purpose, ?after, "timer armed");
    caps.timer.start(id, after, Event::TimerElapsed);
}

/// No-op when nothing is armed for `purpose`.
pub(crate) fn disarm_timer(model: &mut Model, caps: &Capabilities, purpose: TimerPurpose) {
    if let Some(id) = model.timers.disarm(purpose) {
        debug!(%id, ?purpose, "timer cancelled");
        caps.timer.cancel(id);
    }
}

#[instrument(level = "debug", skip(model, caps), fields(reason = %event.reason()))]
pub(crate) fn go_offline(model: &mut Model, caps: &Capabilities, event: ActivationEvent) {
    let duplicate = model.state == ConnectivityState::Offline
        && model
            .last_offline_event
            .as_ref()
            .is_some_and(|last| last.same_reason(&event));
    if duplicate {
        debug!("already offline for this reason");
        return;
    }

    info!(detail = event.message(), "network offline");
    model.state = ConnectivityState::Offline;
    model.view.activate(&event);
    model.last_offline_event = Some(event.clone());

    if model.forced_offline {
        prober::stop(model, caps);
    } else {
        start_offline_probing(model, caps);
    }

    if model.host.is_some() {
        caps.host.set_application_running(false);
        caps.host.broadcast(ConnectivityNotice::Offline { event });
    }

    caps.render.render();
}

/// Shorten the probe cadence: the host heartbeat when a host is attached,
/// our own probe schedule otherwise.
fn start_offline_probing(model: &mut Model, caps: &Capabilities) {
    let interval = model.config.offline_interval();
    match model.host.as_mut() {
        Some(host) => {
            if host.restore.is_none() {
                host.restore = Some(host.heartbeat);
            }
            host.heartbeat = interval;
            debug!(?interval, "host heartbeat redirected");
            caps.host.set_heartbeat_interval(interval);
        }
        None => prober::restart_schedule(model, caps),
    }
}

#[instrument(level = "debug", skip(model, caps))]
pub(crate) fn resume(model: &mut Model, caps: &Capabilities) {
    if model.forced_offline {
        debug!("resume ignored: forced offline");
        return;
    }
    if model.state == ConnectivityState::Online {
        debug!("resume ignored: already online");
        return;
    }

    prober::stop(model, caps);

    let ctx = ViewContext {
        host_started: model.host.is_some(),
    };
    if !model.view.deactivate(&ctx) {
        info!("offline view kept the surface, staying offline");
        caps.render.render();
        return;
    }

    info!("network back online");
    model.state = ConnectivityState::Online;
    model.last_offline_event = None;

    if let Some(host) = model.host.as_mut() {
        caps.host.set_application_running(true);
        if let Some(interval) = host.restore.take() {
            host.heartbeat = interval;
            debug!(?interval, "host heartbeat restored");
            caps.host.set_heartbeat_interval(interval);
        }
        caps.host.broadcast(ConnectivityNotice::Online);
    }

    caps.render.render();
}

pub(crate) fn apply_signal(model: &mut Model, caps: &Capabilities, signal: NetworkSignal) {
    match signal {
        NetworkSignal::Down(reason) => go_offline(model, caps, ActivationEvent::for_reason(reason)),
        NetworkSignal::Up => resume(model, caps),
        NetworkSignal::Uncertain => {
            if model.forced_offline {
                debug!("uncertain connectivity ignored: forced offline");
            } else {
                prober::probe_now(model, caps);
            }
        }
    }
}

pub(crate) fn force_offline(model: &mut Model, caps: &Capabilities) {
    info!("going offline due to a force offline call");
    model.forced_offline = true;
    crate::persistence::store(caps, true);
    prober::stop(model, caps);
    go_offline(model, caps, ACTIVATED_BY_REQUEST);
}

pub(crate) fn force_online(model: &mut Model, caps: &Capabilities) {
    info!("going online due to a force online call");
    model.forced_offline = false;
    crate::persistence::store(caps, false);
    disarm_timer(model, caps, TimerPurpose::ForcedReactivation);
    resume(model, caps);
}

/// Treat a status reported by the server (probe or heartbeat) as liveness.
pub(crate) fn server_answered(model: &mut Model, caps: &Capabilities, status: u16, what: &str) {
    if (200..300).contains(&status) {
        resume(model, caps);
    } else {
        let event = ActivationEvent::new(
            ActivationReason::BadResponse,
            format!("The server answered the {what} with status {status}."),
        );
        go_offline(model, caps, event);
    }
}
