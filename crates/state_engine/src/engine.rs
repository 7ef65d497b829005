//! The state engine: active bit-vector, override resolution, blocking,
//! substate cascade, side effects and change notification.
//!
//! Exactly one [`StateEngine`] exists per app, inserted as a resource by
//! [`StateEnginePlugin`](crate::StateEnginePlugin). All mutation of the
//! active set goes through its methods, which Bevy serialises via `ResMut`.
//!
//! Every mutating call follows the same sequence: flip bits, run side
//! effects, run the substate cascade, then notify listeners synchronously and
//! queue a [`StateChanged`](crate::notifications::StateChanged) event.

use bevy::prelude::*;

use crate::active_set::ActiveSet;
use crate::blend::BlendTask;
use crate::catalog_error::UnknownState;
use crate::config::CascadeMode;
use crate::cursor::CursorMode;
use crate::definition::StateId;
use crate::notifications::{ChangeCause, ListenerId, StateChange, StateChangeListener};
use crate::registry::{RegisteredState, StateRegistry};
use crate::time_scale::TimeScaleController;

/// Result of [`StateEngine::set_state`]. A refusal is an expected steady-state
/// condition, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeOutcome {
    /// The state is now active.
    Activated,
    /// The state was an active toggle state and is now inactive.
    ToggledOff,
    /// The state is blocked; nothing changed.
    Refused,
}

#[derive(Resource)]
pub struct StateEngine {
    registry: StateRegistry,
    active: ActiveSet,
    time_scale: TimeScaleController,
    cursor: CursorMode,
    cascade: CascadeMode,
    listeners: Vec<(ListenerId, Box<dyn StateChangeListener>)>,
    next_listener_id: u64,
    pending_changes: Vec<StateChange>,
    pending_scene_changes: usize,
}

impl StateEngine {
    /// Create an engine with every state inactive.
    pub fn new(registry: StateRegistry) -> Self {
        let active = ActiveSet::new(registry.len());
        Self {
            registry,
            active,
            time_scale: TimeScaleController::default(),
            cursor: CursorMode::default(),
            cascade: CascadeMode::default(),
            listeners: Vec::new(),
            next_listener_id: 0,
            pending_changes: Vec::new(),
            pending_scene_changes: 0,
        }
    }

    pub fn with_cascade_mode(mut self, mode: CascadeMode) -> Self {
        self.cascade = mode;
        self
    }

    pub fn set_cascade_mode(&mut self, mode: CascadeMode) {
        self.cascade = mode;
    }

    pub fn cascade_mode(&self) -> CascadeMode {
        self.cascade
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    pub fn time_scale(&self) -> &TimeScaleController {
        &self.time_scale
    }

    pub fn cursor_mode(&self) -> CursorMode {
        self.cursor
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn is_active(&self, id: StateId) -> bool {
        self.active.contains(id)
    }

    /// True if any `blocked_by` state is active or any `substate_of` parent
    /// is inactive.
    pub fn is_blocked(&self, id: StateId) -> bool {
        let state = self.registry.get(id);
        state.blocked_by.iter().any(|b| self.active.contains(*b))
            || state.substate_of.iter().any(|p| !self.active.contains(*p))
    }

    /// Whether every state in `ids` is active. With `exact`, the active set
    /// must also hold nothing else. Duplicates in `ids` count once.
    pub fn are_all_active(&self, ids: &[StateId], exact: bool) -> bool {
        if exact {
            let mut wanted = ActiveSet::new(self.active.len());
            for id in ids {
                wanted.set(*id, true);
            }
            return wanted == self.active;
        }
        ids.iter().all(|id| self.active.contains(*id))
    }

    pub fn has_any_active(&self, ids: &[StateId]) -> bool {
        ids.iter().any(|id| self.active.contains(*id))
    }

    pub fn active_count(&self) -> usize {
        self.active.count()
    }

    /// Active states in ID order.
    pub fn active_states(&self) -> Vec<StateId> {
        self.active.iter().collect()
    }

    /// Active state names joined with " / ", for logs and debug overlays.
    pub fn describe_active(&self) -> String {
        self.active
            .iter()
            .map(|id| self.registry.name(id))
            .collect::<Vec<_>>()
            .join(" / ")
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Activate `id`, or deactivate it if it is an active toggle state.
    pub fn set_state(&mut self, id: StateId) -> StateChangeOutcome {
        if self.is_blocked(id) {
            debug!("State '{}' is blocked, ignoring activation", self.registry.name(id));
            return StateChangeOutcome::Refused;
        }

        let before = self.active.clone();
        if self.registry.get(id).toggle && self.active.contains(id) {
            self.active.set(id, false);
            self.on_disable_state(id);
            self.settle(ChangeCause::ToggledOff(id), &before);
            return StateChangeOutcome::ToggledOff;
        }

        self.check_override(id);
        self.active.set(id, true);
        self.on_enable_state(id);
        self.settle(ChangeCause::Activated(id), &before);
        StateChangeOutcome::Activated
    }

    pub fn set_state_by_name(&mut self, name: &str) -> Result<StateChangeOutcome, UnknownState> {
        let id = self.registry.lookup(name)?;
        Ok(self.set_state(id))
    }

    /// Deactivate every other state that `id` overrides.
    ///
    /// Unprotected states survive only if `id` lists them in
    /// `do_not_override` (which includes its parents) or they are substates
    /// of `id` itself, so re-activating a parent keeps its children. States marked
    /// `cant_override_by_default` survive unless `id` lists them in
    /// `always_override`. Disable side effects run for each state turned off.
    ///
    /// This does not notify; callers settle the change themselves.
    pub fn check_override(&mut self, id: StateId) {
        let state = self.registry.get(id);
        if state.do_not_override_any {
            return;
        }
        for other in self.registry.iter() {
            if other.id == id {
                continue;
            }
            let was_active = self.active.contains(other.id);
            let keep = if !other.cant_override_by_default {
                was_active && (state.protects(other.id) || other.substate_of.contains(&id))
            } else {
                was_active && !state.forces(other.id)
            };
            if was_active && !keep {
                apply_disable_effects(other, &mut self.time_scale);
                self.active.set(other.id, false);
            }
        }
    }

    /// Deactivate active substates whose parents are no longer all active.
    /// Returns how many states were turned off.
    pub fn control_substates(&mut self) -> usize {
        let mut total = 0;
        loop {
            let mut pass = 0;
            for state in self.registry.iter() {
                if !state.is_substate() || !self.active.contains(state.id) {
                    continue;
                }
                if state.substate_of.iter().any(|p| !self.active.contains(*p)) {
                    self.active.set(state.id, false);
                    apply_disable_effects(state, &mut self.time_scale);
                    pass += 1;
                }
            }
            total += pass;
            if pass == 0 || self.cascade == CascadeMode::SinglePass {
                break;
            }
        }
        total
    }

    /// Enable side effects: cursor policy and the enable time-scale directive.
    pub fn on_enable_state(&mut self, id: StateId) {
        let state = self.registry.get(id);
        self.cursor = CursorMode::from_lock_flag(state.lock_cursor);
        self.time_scale.apply(state.time_scale_on_enable);
    }

    /// Disable side effects: the disable time-scale directive only.
    pub fn on_disable_state(&mut self, id: StateId) {
        apply_disable_effects(self.registry.get(id), &mut self.time_scale);
    }

    /// Enable `id` alongside everything currently active. Override resolution
    /// is deferred until the returned task settles.
    ///
    /// `timeout` is in seconds; `<= 0` waits on the end condition only.
    pub fn blend_into_state(&mut self, id: StateId, timeout: f32) -> BlendTask {
        let before = self.active.clone();
        self.active.set(id, true);
        self.on_enable_state(id);
        self.settle(ChangeCause::BlendStarted(id), &before);
        BlendTask::new(id, timeout)
    }

    pub(crate) fn finish_blend(&mut self, id: StateId) {
        let before = self.active.clone();
        self.check_override(id);
        self.settle(ChangeCause::BlendSettled(id), &before);
    }

    // -------------------------------------------------------------------------
    // Notification
    // -------------------------------------------------------------------------

    /// Register a listener. Listeners run in registration order.
    pub fn subscribe(&mut self, listener: impl StateChangeListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the listener was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Tell listeners a scene finished loading.
    pub fn notify_scene_changed(&mut self) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener.on_scene_changed(self);
        }
        self.listeners = listeners;
        self.pending_scene_changes += 1;
    }

    /// Take the changes queued since the last call. The plugin flushes these
    /// as [`StateChanged`](crate::notifications::StateChanged) events every
    /// frame; engines used without it should drain them periodically.
    pub fn drain_changes(&mut self) -> Vec<StateChange> {
        std::mem::take(&mut self.pending_changes)
    }

    pub(crate) fn take_scene_changes(&mut self) -> usize {
        std::mem::take(&mut self.pending_scene_changes)
    }

    fn settle(&mut self, cause: ChangeCause, before: &ActiveSet) {
        debug_assert_eq!(before.len(), self.active.len());
        self.control_substates();
        let change = StateChange {
            cause,
            enabled: self.active.difference(before).collect(),
            disabled: before.difference(&self.active).collect(),
        };
        debug!(
            "State change {:?}: active = [{}]",
            change.cause,
            self.describe_active()
        );

        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener.on_state_changed(self, &change);
        }
        self.listeners = listeners;
        self.pending_changes.push(change);
    }
}

fn apply_disable_effects(state: &RegisteredState, time_scale: &mut TimeScaleController) {
    time_scale.apply(state.time_scale_on_disable);
}
