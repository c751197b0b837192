//! Commands to the host application's connection (its request pipeline and
//! heartbeat). The host reports back through `Event::Host*` events.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::activation::ActivationEvent;
use crate::config::HeartbeatInterval;

/// Broadcast to listeners interested in connectivity changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectivityNotice {
    Offline { event: ActivationEvent },
    Online,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostOperation {
    /// Suspends (`false`) or resumes (`true`) the host's own request traffic.
    SetApplicationRunning { running: bool },
    SetHeartbeatInterval { interval: HeartbeatInterval },
    Broadcast { notice: ConnectivityNotice },
}

impl Operation for HostOperation {
    type Output = ();
}

pub struct Host<E> {
    context: CapabilityContext<HostOperation, E>,
}

impl<Ev> Capability<Ev> for Host<Ev> {
    type Operation = HostOperation;
    type MappedSelf<MappedEv> = Host<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Host::new(self.context.map_event(f))
    }
}

impl<E> Host<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<HostOperation, E>) -> Self {
        Self { context }
    }

    pub fn set_application_running(&self, running: bool) {
        self.notify(HostOperation::SetApplicationRunning { running });
    }

    pub fn set_heartbeat_interval(&self, interval: HeartbeatInterval) {
        self.notify(HostOperation::SetHeartbeatInterval { interval });
    }

    pub fn broadcast(&self, notice: ConnectivityNotice) {
        self.notify(HostOperation::Broadcast { notice });
    }

    fn notify(&self, operation: HostOperation) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(operation).await;
        });
    }
}
