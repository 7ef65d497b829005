//! The demo's transitions, one sequencer entity each.

use std::time::Duration;

use bevy::prelude::*;

use state_engine::{
    BlendMode, StateEngine, StateId, TransitionFinished, TransitionSequencer, TransitionStatus,
    WaitFor,
};

pub struct DemoSequencersPlugin;

impl Plugin for DemoSequencersPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_sequencers)
            .add_systems(Update, log_finished_transitions);
    }
}

fn lookup(engine: &StateEngine, name: &str) -> Option<StateId> {
    let id = engine.registry().id_of(name);
    if id.is_none() {
        warn!("Catalog has no '{name}' state, skipping its demo transition");
    }
    id
}

fn spawn_sequencers(mut commands: Commands, engine: Res<StateEngine>) {
    if let Some(playing) = lookup(&engine, "Playing") {
        let mut start_game = TransitionSequencer::new(playing)
            .with_scenes(["Level1", "Ui"])
            .with_delays(0.2, 0.2);
        if let Some(loading) = lookup(&engine, "Loading") {
            start_game.add_pre_callback(move |engine: &mut StateEngine| {
                engine.set_state(loading);
            });
        }
        start_game.add_pre_work(WaitFor::new(Duration::from_millis(300)));
        commands.spawn((Name::new("Start game"), start_game));

        let broken = TransitionSequencer::new(playing).with_scenes(["Level1", "Missing"]);
        commands.spawn((Name::new("Start game (missing scene)"), broken));

        let next_level = TransitionSequencer::new(playing)
            .with_blend_mode(BlendMode::SwitchOnStart)
            .with_additive_loading(true)
            .with_scenes(["Level2"]);
        commands.spawn((Name::new("Stream next level"), next_level));
    }

    if let Some(menu) = lookup(&engine, "MainMenu") {
        let mut quit = TransitionSequencer::new(menu)
            .with_blend_mode(BlendMode::SwitchOnEnd)
            .with_scenes(["MainMenu"]);
        quit.add_mid_work(WaitFor::new(Duration::from_millis(500)));
        commands.spawn((Name::new("Quit to menu"), quit));
    }

    if let Some(credits) = lookup(&engine, "Credits") {
        let mut crossfade = TransitionSequencer::new(credits).with_blend_mode(BlendMode::Blend);
        crossfade.add_mid_work(WaitFor::new(Duration::from_secs(1)));
        commands.spawn((Name::new("Crossfade to credits"), crossfade));
    }
}

fn log_finished_transitions(mut finished: EventReader<TransitionFinished>, names: Query<&Name>) {
    for event in finished.read() {
        let name = names
            .get(event.entity)
            .map(|n| n.as_str().to_string())
            .unwrap_or_else(|_| event.entity.to_string());
        match &event.status {
            TransitionStatus::Aborted(e) => warn!("Transition '{name}' aborted: {e}"),
            status => info!("Transition '{name}' finished: {status:?}"),
        }
    }
}
