//! Transition sequencers driven by the plugin, with deterministic frame time.

use bevy::prelude::*;

use crate::blend::StateBlends;
use crate::definition::{StateDefinition, TimeScaleDirective};
use crate::engine::StateEngine;
use crate::notifications::{ChangeCause, SceneChanged, StateChanged, TransitionFinished};
use crate::registry::StateRegistry;
use crate::scene_loading::{
    SceneLoadError, SceneLoadMode, SceneLoadStatus, SceneLoadTicket, SceneLoader, SceneRef,
};
use crate::state_engine_plugin::StateEnginePlugin;
use crate::test_harness::TestApp;
use crate::transition::{
    BlendMode, TransitionError, TransitionPhase, TransitionSequencer, TransitionStatus, WaitFrames,
};

fn game() -> TestApp {
    let registry = StateRegistry::build(vec![
        StateDefinition::new("MainMenu"),
        StateDefinition::new("Loading").time_scale_on_enable(TimeScaleDirective::Set(0.0)),
        StateDefinition::new("Playing").time_scale_on_enable(TimeScaleDirective::Set(1.0)),
    ])
    .unwrap();
    let menu = registry.id_of("MainMenu").unwrap();
    TestApp::with_plugin(StateEnginePlugin::new(registry).with_default_state(menu))
}

/// Loader that refuses scenes named "Missing".
#[derive(Default)]
struct PickyLoader {
    next: u64,
}

impl SceneLoader for PickyLoader {
    fn begin_load(
        &mut self,
        scene: &SceneRef,
        _mode: SceneLoadMode,
    ) -> Result<SceneLoadTicket, SceneLoadError> {
        if *scene == SceneRef::from("Missing") {
            return Err(SceneLoadError::NotFound(scene.clone()));
        }
        self.next += 1;
        Ok(SceneLoadTicket(self.next))
    }

    fn poll_load(&mut self, _ticket: SceneLoadTicket) -> SceneLoadStatus {
        SceneLoadStatus::Loaded
    }
}

/// Update until a `TransitionFinished` arrives, collecting scene changes.
fn run_to_finish(app: &mut TestApp, max_frames: u32) -> (TransitionFinished, usize, u32) {
    let mut scene_changes = 0;
    for frame in 1..=max_frames {
        app.update();
        scene_changes += app.drain_events::<SceneChanged>().len();
        if let Some(finished) = app.drain_events::<TransitionFinished>().pop() {
            return (finished, scene_changes, frame);
        }
    }
    panic!("transition did not finish within {max_frames} frames");
}

#[test]
fn test_second_start_is_rejected_and_first_completes() {
    let mut app = game();
    let playing = app.id("Playing");
    let mut sequencer = TransitionSequencer::new(playing).with_scenes(["Level1", "Level2"]);
    sequencer.add_mid_work(WaitFrames::new(2));
    let entity = app.spawn(sequencer);

    app.start_transition(entity);
    app.start_transition(entity);
    let (finished, scene_changes, frames) = run_to_finish(&mut app, 50);

    assert_eq!(finished.entity, entity);
    assert_eq!(finished.status, TransitionStatus::Completed);
    assert_eq!(scene_changes, 2, "scenes loaded once, not twice");
    assert_eq!(frames, 5);
    assert_eq!(app.active_names(), ["Playing"]);

    let sequencer = app.world_mut().get::<TransitionSequencer>(entity).unwrap();
    assert_eq!(sequencer.phase(), TransitionPhase::Idle);
}

#[test]
fn test_start_while_running_returns_in_progress() {
    let mut app = game();
    let playing = app.id("Playing");
    let mut sequencer = TransitionSequencer::new(playing);
    sequencer.add_pre_work(WaitFrames::new(5));
    let entity = app.spawn(sequencer);
    app.start_transition(entity);
    app.update();

    let world = app.world_mut();
    world.resource_scope(|world, mut engine: Mut<StateEngine>| {
        let mut sequencer = world.get_mut::<TransitionSequencer>(entity).unwrap();
        assert!(sequencer.is_transitioning());
        assert_eq!(
            sequencer.transition(&mut engine),
            Err(TransitionError::TransitionInProgress)
        );
    });

    let (finished, _, _) = run_to_finish(&mut app, 20);
    assert_eq!(finished.status, TransitionStatus::Completed);
}

#[test]
fn test_scene_failure_aborts_and_reports() {
    let mut app = game();
    app.install_loader(PickyLoader::default());
    let playing = app.id("Playing");
    let entity = app.spawn(TransitionSequencer::new(playing).with_scenes(["Level1", "Missing"]));

    app.start_transition(entity);
    let (finished, scene_changes, _) = run_to_finish(&mut app, 20);

    assert_eq!(
        finished.status,
        TransitionStatus::Aborted(TransitionError::SceneLoad(SceneLoadError::NotFound(
            SceneRef::from("Missing")
        )))
    );
    assert_eq!(scene_changes, 1);
    assert_eq!(app.active_names(), ["MainMenu"]);
    let sequencer = app.world_mut().get::<TransitionSequencer>(entity).unwrap();
    assert!(!sequencer.is_transitioning());
}

#[test]
fn test_delays_run_on_real_time_while_virtual_time_is_frozen() {
    let mut app = game();
    let loading = app.id("Loading");
    let playing = app.id("Playing");
    let mut sequencer = TransitionSequencer::new(loading)
        .with_blend_mode(BlendMode::SwitchOnStart)
        .with_delays(0.3, 0.0)
        .with_scenes(["Level1"]);
    sequencer.add_post_callback(move |engine: &mut StateEngine| {
        engine.set_state(playing);
    });
    let entity = app.spawn(sequencer);

    app.start_transition(entity);
    app.update();
    assert!(app.is_active("Loading"));
    assert_eq!(app.virtual_speed(), 0.0);

    let (finished, _, _) = run_to_finish(&mut app, 10);
    assert_eq!(finished.status, TransitionStatus::Completed);
    assert_eq!(app.active_names(), ["Playing"]);
    assert_eq!(app.virtual_speed(), 1.0);
}

#[test]
fn test_blend_mode_keeps_both_states_until_idle() {
    let mut app = game();
    let playing = app.id("Playing");
    let menu = app.id("MainMenu");
    let mut sequencer = TransitionSequencer::new(playing).with_blend_mode(BlendMode::Blend);
    sequencer.add_mid_work(WaitFrames::new(3));
    let entity = app.spawn(sequencer);
    app.drain_events::<StateChanged>();

    app.start_transition(entity);
    app.update();
    assert_eq!(app.active_names(), ["MainMenu", "Playing"]);
    app.update();
    assert_eq!(app.active_names(), ["MainMenu", "Playing"]);

    run_to_finish(&mut app, 10);
    assert_eq!(app.active_names(), ["Playing"]);

    let changes = app.drain_events::<StateChanged>();
    let settled = changes
        .iter()
        .find(|StateChanged(c)| c.cause == ChangeCause::BlendSettled(playing))
        .expect("blend settled");
    assert_eq!(settled.0.disabled, vec![menu]);
}

#[test]
fn test_standalone_blend_times_out() {
    let mut app = game();
    let loading = app.id("Loading");
    app.world_mut()
        .resource_scope(|world, mut blends: Mut<StateBlends>| {
            let mut engine = world.resource_mut::<StateEngine>();
            blends.start(&mut engine, loading, 0.35, |_| false);
        });
    assert_eq!(app.active_names(), ["MainMenu", "Loading"]);

    let frames = app.tick_until(10, |world| world.resource::<StateBlends>().is_empty());
    assert_eq!(frames, Some(4));
    assert_eq!(app.active_names(), ["Loading"]);
}
