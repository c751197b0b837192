mod host;
mod platform;
mod timer;

pub use self::host::{ConnectivityNotice, Host, HostOperation};
pub use self::platform::{Platform, PlatformOperation, PlatformOutput};
pub use self::timer::{Timer, TimerId, TimerOperation, TimerOutput};

// Render, Http and KeyValue are Crux's own capabilities; the rest are ours.
pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

#[allow(unused_imports)]
use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub key_value: KeyValue<Event>,
    pub timer: Timer<Event>,
    pub host: Host<Event>,
    pub platform: Platform<Event>,
}
