#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod activation;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
mod machine;
pub mod model;
pub mod persistence;
pub mod prober;
pub mod signal;
pub mod view;

pub use activation::{ActivationEvent, ActivationReason};
pub use app::{App, ViewModel};
pub use capabilities::{Capabilities, ConnectivityNotice, Effect};
pub use config::{ConfigError, ConnectivityConfig, HeartbeatInterval};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::{ConnectivityState, Model, Phase, TimerPurpose};
pub use signal::{Environment, RawSignal};
pub use view::{OfflinePresentation, OfflineView, SplashScreen, ViewContext};
