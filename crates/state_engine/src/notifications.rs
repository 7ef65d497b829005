//! Change notification: the listener trait for synchronous subscribers and
//! the ECS events queued for systems.
//!
//! Listeners run inside the engine call that caused the change, in
//! registration order, after override resolution and the substate cascade
//! have settled. The same [`StateChange`] is queued and flushed as a
//! [`StateChanged`] event once per frame by the plugin.

use bevy::prelude::*;

use crate::definition::StateId;
use crate::engine::StateEngine;
use crate::transition::TransitionStatus;

// =============================================================================
// Change description
// =============================================================================

/// What triggered a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    /// `set_state` enabled the state (after override resolution).
    Activated(StateId),
    /// `set_state` on an active toggle state turned it off.
    ToggledOff(StateId),
    /// A blend enabled the state without overriding anything yet.
    BlendStarted(StateId),
    /// A blend ended and override resolution ran for the state.
    BlendSettled(StateId),
}

impl ChangeCause {
    pub fn state(&self) -> StateId {
        match *self {
            ChangeCause::Activated(id)
            | ChangeCause::ToggledOff(id)
            | ChangeCause::BlendStarted(id)
            | ChangeCause::BlendSettled(id) => id,
        }
    }
}

/// One settled mutation of the active set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub cause: ChangeCause,
    /// States that became active, in ID order.
    pub enabled: Vec<StateId>,
    /// States that became inactive (overridden, toggled off or cascaded), in ID order.
    pub disabled: Vec<StateId>,
}

// =============================================================================
// Listener interface
// =============================================================================

/// Synchronous observer of engine changes.
///
/// The engine is borrowed immutably for the call, so listeners can query the
/// settled active set but cannot re-enter `set_state`. Systems that need to
/// react with further changes should read [`StateChanged`] events instead.
pub trait StateChangeListener: Send + Sync {
    fn on_state_changed(&mut self, engine: &StateEngine, change: &StateChange);

    fn on_scene_changed(&mut self, _engine: &StateEngine) {}
}

impl<F> StateChangeListener for F
where
    F: FnMut(&StateEngine, &StateChange) + Send + Sync,
{
    fn on_state_changed(&mut self, engine: &StateEngine, change: &StateChange) {
        self(engine, change)
    }
}

/// Handle returned by [`StateEngine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

// =============================================================================
// ECS events
// =============================================================================

/// Request a `set_state` from any system. Applied at the start of the
/// engine's update chain.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetStateRequest(pub StateId);

#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct StateChanged(pub StateChange);

/// Fired after each scene load a transition completes.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneChanged;

/// A transition sequencer on `entity` returned to idle.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct TransitionFinished {
    pub entity: Entity,
    pub status: TransitionStatus,
}
