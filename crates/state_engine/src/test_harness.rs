//! # TestApp: headless harness for the state engine
//!
//! Wraps a `bevy::app::App` with `MinimalPlugins` and [`StateEnginePlugin`].
//! Time advances by a fixed [`TestApp::FRAME`] per update, so transition
//! delays and blend timeouts are deterministic.

use std::time::Duration;

use bevy::app::App;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use crate::definition::{StateDefinition, StateId};
use crate::engine::{StateChangeOutcome, StateEngine};
use crate::notifications::SetStateRequest;
use crate::registry::StateRegistry;
use crate::scene_loading::{SceneLoader, SceneLoaderResource};
use crate::state_engine_plugin::StateEnginePlugin;
use crate::transition::StartTransition;

pub struct TestApp {
    app: App,
}

impl TestApp {
    /// Real and virtual time advance by this much on every update.
    pub const FRAME: Duration = Duration::from_millis(100);

    /// App over the given catalog, with nothing active.
    ///
    /// Panics if the catalog does not validate.
    pub fn new(catalog: Vec<StateDefinition>) -> Self {
        let registry = StateRegistry::build(catalog).expect("test catalog must be valid");
        Self::with_plugin(StateEnginePlugin::new(registry))
    }

    pub fn with_plugin(plugin: StateEnginePlugin) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Self::FRAME));
        app.add_plugins(plugin);

        // First update runs Startup (default state) and one Update pass.
        app.update();
        Self { app }
    }

    // -----------------------------------------------------------------------
    // Frames
    // -----------------------------------------------------------------------

    pub fn update(&mut self) {
        self.app.update();
    }

    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.update();
        }
    }

    /// Update until `done` holds, at most `max` frames. Returns the number of
    /// frames run, or `None` if `done` never held.
    pub fn tick_until(&mut self, max: u32, mut done: impl FnMut(&mut World) -> bool) -> Option<u32> {
        for n in 1..=max {
            self.app.update();
            if done(self.app.world_mut()) {
                return Some(n);
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Engine access
    // -----------------------------------------------------------------------

    pub fn engine(&self) -> &StateEngine {
        self.app.world().resource::<StateEngine>()
    }

    pub fn engine_mut(&mut self) -> Mut<'_, StateEngine> {
        self.app.world_mut().resource_mut::<StateEngine>()
    }

    /// Resolve a state name. Panics on unknown names.
    pub fn id(&self, name: &str) -> StateId {
        self.engine()
            .registry()
            .lookup(name)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.engine().is_active(self.id(name))
    }

    pub fn active_names(&self) -> Vec<String> {
        let engine = self.engine();
        engine
            .active_states()
            .into_iter()
            .map(|id| engine.registry().name(id).to_string())
            .collect()
    }

    /// Call `set_state` directly, outside the schedule.
    pub fn set_state(&mut self, name: &str) -> StateChangeOutcome {
        let id = self.id(name);
        self.engine_mut().set_state(id)
    }

    /// Queue a [`SetStateRequest`] for the next update.
    pub fn request(&mut self, name: &str) {
        let id = self.id(name);
        self.app.world_mut().send_event(SetStateRequest(id));
    }

    pub fn start_transition(&mut self, sequencer: Entity) {
        self.app.world_mut().send_event(StartTransition(sequencer));
    }

    pub fn install_loader(&mut self, loader: impl SceneLoader + 'static) {
        self.app
            .world_mut()
            .insert_resource(SceneLoaderResource(Box::new(loader)));
    }

    // -----------------------------------------------------------------------
    // World access
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn spawn(&mut self, bundle: impl Bundle) -> Entity {
        self.app.world_mut().spawn(bundle).id()
    }

    /// Take every pending event of type `E`.
    pub fn drain_events<E: Event>(&mut self) -> Vec<E> {
        self.app
            .world_mut()
            .resource_mut::<Events<E>>()
            .drain()
            .collect()
    }

    pub fn virtual_speed(&self) -> f32 {
        self.app.world().resource::<Time<Virtual>>().relative_speed()
    }
}
