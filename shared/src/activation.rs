use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Why the offline presentation was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationReason {
    /// The device has no network connection.
    NoNetwork,
    /// The server answered, but with an error status.
    BadResponse,
    /// Requested by the server side application or from the developer console.
    ActivatedByRequest,
    /// The request failed for an unclassified reason (exception, timeout).
    Unknown,
    /// The online application is still loading.
    AppStarting,
}

impl ActivationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationReason::NoNetwork => "no_network",
            ActivationReason::BadResponse => "bad_response",
            ActivationReason::ActivatedByRequest => "activated_by_request",
            ActivationReason::Unknown => "unknown",
            ActivationReason::AppStarting => "app_starting",
        }
    }
}

impl fmt::Display for ActivationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of a transition to offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationEvent {
    message: Cow<'static, str>,
    reason: ActivationReason,
}

pub const NO_NETWORK: ActivationEvent =
    ActivationEvent::from_static(ActivationReason::NoNetwork, "Offline mode because a network failure.");

pub const UNKNOWN: ActivationEvent =
    ActivationEvent::from_static(ActivationReason::Unknown, "Offline mode because server is unreachable.");

pub const ACTIVATED_BY_REQUEST: ActivationEvent = ActivationEvent::from_static(
    ActivationReason::ActivatedByRequest,
    "Offline mode started by a request.",
);

pub const BAD_RESPONSE: ActivationEvent = ActivationEvent::from_static(
    ActivationReason::BadResponse,
    "The response from the server seems to take a very long time. \
     Either the server is down or there's a network issue.",
);

pub const APP_STARTING: ActivationEvent =
    ActivationEvent::from_static(ActivationReason::AppStarting, "Loading app.");

impl ActivationEvent {
    pub const fn from_static(reason: ActivationReason, message: &'static str) -> Self {
        Self {
            message: Cow::Borrowed(message),
            reason,
        }
    }

    pub fn new(reason: ActivationReason, message: impl Into<String>) -> Self {
        Self {
            message: Cow::Owned(message.into()),
            reason,
        }
    }

    /// The well-known event for a reason.
    pub fn for_reason(reason: ActivationReason) -> Self {
        match reason {
            ActivationReason::NoNetwork => NO_NETWORK,
            ActivationReason::BadResponse => BAD_RESPONSE,
            ActivationReason::ActivatedByRequest => ACTIVATED_BY_REQUEST,
            ActivationReason::Unknown => UNKNOWN,
            ActivationReason::AppStarting => APP_STARTING,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn reason(&self) -> ActivationReason {
        self.reason
    }

    /// Duplicate detection ignores the free-text message.
    pub fn same_reason(&self, other: &ActivationEvent) -> bool {
        self.reason == other.reason
    }
}

impl fmt::Display for ActivationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.reason)
    }
}
