#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crux_core::testing::AppTester;
use offline_mode::capabilities::{
    HostOperation, PlatformOperation, TimerId, TimerOperation, TimerOutput,
};
use offline_mode::{
    ActivationEvent, ActivationReason, App, ConnectivityConfig, Effect, Environment, Event, Model,
    OfflineView, ViewContext,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCall {
    Activate(ActivationReason),
    Deactivate,
}

/// Offline view that records every call and hands the surface back only when
/// told to.
pub struct RecordingView {
    active: Arc<AtomicBool>,
    accept: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<ViewCall>>>,
}

#[derive(Clone)]
pub struct ViewProbe {
    active: Arc<AtomicBool>,
    accept: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<ViewCall>>>,
}

impl ViewProbe {
    pub fn calls(&self) -> Vec<ViewCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    /// Hide the overlay behind the core's back, as a user dismissing it would.
    pub fn dismiss(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

pub fn recording_view(accept: bool) -> (RecordingView, ViewProbe) {
    let active = Arc::new(AtomicBool::new(false));
    let accept = Arc::new(AtomicBool::new(accept));
    let calls = Arc::new(Mutex::new(Vec::new()));
    let view = RecordingView {
        active: active.clone(),
        accept: accept.clone(),
        calls: calls.clone(),
    };
    (
        view,
        ViewProbe {
            active,
            accept,
            calls,
        },
    )
}

impl OfflineView for RecordingView {
    fn activate(&mut self, event: &ActivationEvent) {
        self.active.store(true, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push(ViewCall::Activate(event.reason()));
    }

    fn deactivate(&mut self, _ctx: &ViewContext) -> bool {
        self.calls.lock().unwrap().push(ViewCall::Deactivate);
        if self.accept.load(Ordering::SeqCst) {
            self.active.store(false, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Drive `Started` and the forced-flag read, returning the effects of both.
pub fn start_with(
    app: &AppTester<App, Effect>,
    model: &mut Model,
    environment: Environment,
    forced: bool,
) -> Vec<Effect> {
    let mut effects = app
        .update(
            Event::Started {
                environment,
                config: ConnectivityConfig::default(),
            },
            model,
        )
        .effects;
    effects.extend(
        app.update(Event::ForcedFlagRestored(Ok(forced)), model)
            .effects,
    );
    effects
}

pub fn start(app: &AppTester<App, Effect>, model: &mut Model) -> Vec<Effect> {
    start_with(app, model, Environment::default(), false)
}

pub fn embedded() -> Environment {
    Environment {
        embedded: true,
        ..Environment::default()
    }
}

pub fn fire(app: &AppTester<App, Effect>, model: &mut Model, id: TimerId) -> Vec<Effect> {
    app.update(Event::TimerElapsed(TimerOutput::Elapsed { id }), model)
        .effects
}

pub fn timer_ops(effects: &[Effect]) -> Vec<TimerOperation> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Timer(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

pub fn host_ops(effects: &[Effect]) -> Vec<HostOperation> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Host(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

pub fn platform_ops(effects: &[Effect]) -> Vec<PlatformOperation> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Platform(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

pub fn http_requests(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::Http(_)))
        .count()
}

pub fn renders(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::Render(_)))
        .count()
}

pub fn key_value_requests(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::KeyValue(_)))
        .count()
}
