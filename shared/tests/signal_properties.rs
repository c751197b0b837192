mod common;

use crux_core::testing::AppTester;
use proptest::prelude::*;

use offline_mode::prober::ProbeOutcome;
use offline_mode::{App, Effect, Event, Model, RawSignal, TimerPurpose};

use common::{embedded, fire, start_with};

#[derive(Debug, Clone)]
enum Step {
    Raw(RawSignal),
    ForceOffline,
    ForceOnline,
    AttachHost,
    CommunicationError,
    ResponseEnded,
    Heartbeat(u16),
    Platform(bool),
    ProbeAnswered(Option<u16>),
    ProbeTick,
    ProbeTimeout,
}

fn raw_signal() -> impl Strategy<Value = RawSignal> {
    prop_oneof![
        Just(RawSignal::BrowserOnline),
        Just(RawSignal::BrowserOffline),
        Just(RawSignal::ContainerOnline),
        Just(RawSignal::ContainerOffline),
        prop_oneof![
            Just("cordova-offline"),
            Just("cordova-online"),
            Just("cordova-pause"),
            Just("cordova-resume"),
            Just("hello"),
        ]
        .prop_map(|data| RawSignal::ParentMessage {
            data: data.to_string()
        }),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => raw_signal().prop_map(Step::Raw),
        1 => Just(Step::ForceOffline),
        1 => Just(Step::ForceOnline),
        1 => Just(Step::AttachHost),
        1 => Just(Step::CommunicationError),
        1 => Just(Step::ResponseEnded),
        1 => prop_oneof![Just(200u16), Just(503u16)].prop_map(Step::Heartbeat),
        1 => any::<bool>().prop_map(Step::Platform),
        2 => prop_oneof![Just(None), Just(Some(200u16)), Just(Some(500u16))]
            .prop_map(Step::ProbeAnswered),
        2 => Just(Step::ProbeTick),
        1 => Just(Step::ProbeTimeout),
    ]
}

fn apply(app: &AppTester<App, Effect>, model: &mut Model, step: Step) {
    let event = match step {
        Step::Raw(raw) => Event::Signal(raw),
        Step::ForceOffline => Event::ForceOffline,
        Step::ForceOnline => Event::ForceOnline,
        Step::AttachHost => Event::HostAttached {
            heartbeat_interval_secs: 300,
        },
        Step::CommunicationError => Event::HostCommunicationError {
            status: 500,
            details: "error".into(),
        },
        Step::ResponseEnded => Event::HostResponseEnded,
        Step::Heartbeat(status) => Event::HeartbeatResponded { status },
        Step::Platform(online) => Event::PlatformConnectivity { online },
        Step::ProbeAnswered(status) => {
            let Some(probe) = model.in_flight_probe() else {
                return;
            };
            let outcome = match status {
                Some(status) => ProbeOutcome::from_status(status),
                None => ProbeOutcome::Failed("connection refused".into()),
            };
            Event::ProbeCompleted { probe, outcome }
        }
        Step::ProbeTick => {
            if let Some(id) = model.timer(TimerPurpose::Probe) {
                fire(app, model, id);
            }
            return;
        }
        Step::ProbeTimeout => {
            if let Some(id) = model.timer(TimerPurpose::ProbeTimeout) {
                fire(app, model, id);
            }
            return;
        }
    };
    app.update(event, model);
}

proptest! {
    #[test]
    fn connectivity_invariants_hold(forced in any::<bool>(), steps in prop::collection::vec(step(), 0..60)) {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        start_with(&app, &mut model, embedded(), forced);

        for step in steps {
            apply(&app, &mut model, step);

            // The splash screen only declines while offline, so the view
            // mirrors the state exactly.
            prop_assert_eq!(model.view().is_active(), !model.is_online());
            prop_assert_eq!(model.last_offline_event().is_some(), !model.is_online());

            if model.forced_offline() {
                prop_assert!(!model.is_online());
                prop_assert_eq!(model.timer(TimerPurpose::Probe), None);
                prop_assert_eq!(model.in_flight_probe(), None);
            }

            if model.is_online() {
                prop_assert_eq!(model.timer(TimerPurpose::Probe), None);
                if let Some(host) = model.host() {
                    prop_assert_eq!(host.restore, None);
                }
            }

            prop_assert_eq!(
                model.in_flight_probe().is_some(),
                model.timer(TimerPurpose::ProbeTimeout).is_some()
            );
        }
    }
}
