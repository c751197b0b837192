//! Offline presentation contract.
//!
//! The state machine drives an [`OfflineView`] but never renders anything
//! itself. [`SplashScreen`] is the default view; applications with a richer
//! offline experience install their own implementation with
//! [`Model::with_view`](crate::Model::with_view).

use serde::{Deserialize, Serialize};

use crate::activation::{ActivationEvent, ActivationReason};

/// What the view knows about the surrounding application when asked to step
/// aside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewContext {
    /// A host connection was attached at some point in this page life.
    pub host_started: bool,
}

/// Which screen the shell should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OfflinePresentation {
    /// Online application owns the surface.
    #[default]
    Hidden,
    /// Bootstrapping, no server contact yet.
    Loading,
    /// Server cannot be reached.
    Unreachable {
        reason: ActivationReason,
        message: String,
    },
    /// Network is back but the online application was never loaded.
    ReloadPrompt,
    /// A custom view is active and renders itself.
    Custom,
}

pub trait OfflineView: Send + Sync {
    /// Take over the visible surface. May be called while already active, in
    /// which case only the content for `event` is refreshed.
    fn activate(&mut self, event: &ActivationEvent);

    /// Try to hand the surface back. Returning `false` keeps the view active
    /// and the state machine offline.
    fn deactivate(&mut self, ctx: &ViewContext) -> bool;

    fn is_active(&self) -> bool;

    fn presentation(&self) -> OfflinePresentation {
        if self.is_active() {
            OfflinePresentation::Custom
        } else {
            OfflinePresentation::Hidden
        }
    }
}

/// Default splash screen: a loading indicator while the app starts, an
/// "unreachable" notice on failures and a reload prompt when the network comes
/// back before the online app ever loaded.
#[derive(Debug, Clone, Default)]
pub struct SplashScreen {
    active: bool,
    presentation: OfflinePresentation,
    activations: u32,
}

impl SplashScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the overlay was (re)built. Layout is only initialised
    /// on the first activation of an activation streak.
    pub fn activations(&self) -> u32 {
        self.activations
    }

    fn content_for(event: &ActivationEvent) -> OfflinePresentation {
        match event.reason() {
            ActivationReason::AppStarting => OfflinePresentation::Loading,
            reason => OfflinePresentation::Unreachable {
                reason,
                message: event.message().to_string(),
            },
        }
    }
}

impl OfflineView for SplashScreen {
    fn activate(&mut self, event: &ActivationEvent) {
        if !self.active {
            self.active = true;
            self.activations = self.activations.saturating_add(1);
        }
        self.presentation = Self::content_for(event);
    }

    fn deactivate(&mut self, ctx: &ViewContext) -> bool {
        if !ctx.host_started {
            self.presentation = OfflinePresentation::ReloadPrompt;
            return false;
        }
        self.active = false;
        self.presentation = OfflinePresentation::Hidden;
        true
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn presentation(&self) -> OfflinePresentation {
        self.presentation.clone()
    }
}
