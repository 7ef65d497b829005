//! Plugin that wires the state engine into a Bevy app.
//!
//! Kept in its own file following the one-plugin-per-file convention.

use bevy::prelude::*;

use crate::activity::{update_activities, ActivityToggled};
use crate::blend::{advance_blends, StateBlends};
use crate::catalog::StateCatalog;
use crate::catalog_error::CatalogLoadError;
use crate::config::StateEngineSettings;
use crate::cursor::sync_cursor;
use crate::definition::StateId;
use crate::engine::StateEngine;
use crate::notifications::{SceneChanged, SetStateRequest, StateChanged, TransitionFinished};
use crate::registry::StateRegistry;
use crate::scene_loading::SceneLoaderResource;
use crate::time_scale::sync_time_scale;
use crate::transition::{apply_transition_requests, drive_transitions, StartTransition};

/// Ordered phases of the engine's `Update` work.
///
/// Configured as a chain: `Requests` → `Transitions` → `Events` → `Sync`.
/// Systems that send [`SetStateRequest`] or [`StartTransition`] should run
/// before `Requests` to have them applied in the same frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateEngineSet {
    /// Settings changes, queued `set_state` and transition requests.
    Requests,
    /// Sequencers and standalone blends advance by one frame.
    Transitions,
    /// Queued changes are flushed as events.
    Events,
    /// Time scale, cursor and activities mirror the settled state.
    Sync,
}

/// State activated once during `Startup`.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefaultState(pub Option<StateId>);

pub struct StateEnginePlugin {
    registry: StateRegistry,
    default_state: Option<StateId>,
    settings: StateEngineSettings,
}

impl StateEnginePlugin {
    pub fn new(registry: StateRegistry) -> Self {
        Self {
            registry,
            default_state: None,
            settings: StateEngineSettings::default(),
        }
    }

    /// Build from a catalog, taking its `default_state` if it names one.
    pub fn from_catalog(catalog: StateCatalog) -> Result<Self, CatalogLoadError> {
        let (registry, default_state) = catalog.build_registry()?;
        Ok(Self {
            default_state,
            ..Self::new(registry)
        })
    }

    pub fn with_default_state(mut self, state: StateId) -> Self {
        self.default_state = Some(state);
        self
    }

    pub fn with_settings(mut self, settings: StateEngineSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl Plugin for StateEnginePlugin {
    fn build(&self, app: &mut App) {
        info!(
            "State engine: {} states, cascade {:?}",
            self.registry.len(),
            self.settings.cascade
        );

        let engine = StateEngine::new(self.registry.clone()).with_cascade_mode(self.settings.cascade);

        app.insert_resource(engine)
            .insert_resource(self.settings)
            .insert_resource(DefaultState(self.default_state))
            .init_resource::<StateBlends>()
            .init_resource::<SceneLoaderResource>()
            .add_event::<SetStateRequest>()
            .add_event::<StartTransition>()
            .add_event::<StateChanged>()
            .add_event::<SceneChanged>()
            .add_event::<TransitionFinished>()
            .add_event::<ActivityToggled>();

        app.configure_sets(
            Update,
            (
                StateEngineSet::Requests,
                StateEngineSet::Transitions,
                StateEngineSet::Events,
                StateEngineSet::Sync,
            )
                .chain(),
        );

        app.add_systems(Startup, apply_default_state)
            .add_systems(
                Update,
                (apply_settings, apply_state_requests, apply_transition_requests)
                    .chain()
                    .in_set(StateEngineSet::Requests),
            )
            .add_systems(
                Update,
                (drive_transitions, advance_blends)
                    .chain()
                    .in_set(StateEngineSet::Transitions),
            )
            .add_systems(Update, flush_state_events.in_set(StateEngineSet::Events))
            .add_systems(
                Update,
                (sync_time_scale, sync_cursor, update_activities)
                    .chain()
                    .in_set(StateEngineSet::Sync),
            );
    }
}

// =============================================================================
// Systems
// =============================================================================

fn apply_default_state(default_state: Res<DefaultState>, mut engine: ResMut<StateEngine>) {
    let Some(state) = default_state.0 else {
        return;
    };
    let outcome = engine.set_state(state);
    info!(
        "Default state '{}': {outcome:?}",
        engine.registry().name(state)
    );
}

fn apply_settings(settings: Res<StateEngineSettings>, mut engine: ResMut<StateEngine>) {
    if settings.is_changed() && engine.cascade_mode() != settings.cascade {
        engine.set_cascade_mode(settings.cascade);
    }
}

fn apply_state_requests(mut requests: EventReader<SetStateRequest>, mut engine: ResMut<StateEngine>) {
    for SetStateRequest(state) in requests.read() {
        if !engine.registry().contains(*state) {
            warn!("Ignoring request for unknown state {state}");
            continue;
        }
        let outcome = engine.set_state(*state);
        debug!("set_state('{}') -> {outcome:?}", engine.registry().name(*state));
    }
}

fn flush_state_events(
    mut engine: ResMut<StateEngine>,
    mut changed: EventWriter<StateChanged>,
    mut scenes: EventWriter<SceneChanged>,
) {
    for change in engine.drain_changes() {
        changed.send(StateChanged(change));
    }
    for _ in 0..engine.take_scene_changes() {
        scenes.send(SceneChanged);
    }
}
