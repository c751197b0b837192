use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformOperation {
    /// Read the platform's current connectivity flag.
    QueryConnectivity,
    /// Post a message to the embedding parent window.
    NotifyParent { message: String },
}

impl Operation for PlatformOperation {
    type Output = PlatformOutput;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformOutput {
    Connectivity { online: bool },
    Delivered,
}

pub struct Platform<E> {
    context: CapabilityContext<PlatformOperation, E>,
}

impl<Ev> Capability<Ev> for Platform<Ev> {
    type Operation = PlatformOperation;
    type MappedSelf<MappedEv> = Platform<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Platform::new(self.context.map_event(f))
    }
}

impl<E> Platform<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<PlatformOperation, E>) -> Self {
        Self { context }
    }

    /// A shell answering with anything but `Connectivity` is treated as online.
    pub fn query_connectivity<F>(&self, callback: F)
    where
        F: FnOnce(bool) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let output = context
                .request_from_shell(PlatformOperation::QueryConnectivity)
                .await;
            let online = match output {
                PlatformOutput::Connectivity { online } => online,
                PlatformOutput::Delivered => true,
            };
            context.update_app(callback(online));
        });
    }

    pub fn notify_parent(&self, message: impl Into<String>) {
        let message = message.into();
        let context = self.context.clone();
        self.context.spawn(async move {
            context
                .notify_shell(PlatformOperation::NotifyParent { message })
                .await;
        });
    }
}
