//! World content for the demo: a spinner that runs on virtual time and a
//! "PAUSED" banner driven by a state-based activity.

use bevy::prelude::*;

use state_engine::{StateBasedActivity, StateEngine, StateEngineSet, StateMatch};

pub struct DemoScenePlugin;

impl Plugin for DemoScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene)
            .add_systems(Update, spin.after(StateEngineSet::Sync));
    }
}

#[derive(Component)]
struct Spinner;

fn setup_scene(mut commands: Commands, engine: Res<StateEngine>) {
    commands.spawn(Camera2d);

    let registry = engine.registry();
    let playing = registry.id_of("Playing");
    let paused = registry.id_of("Paused");

    let mut spinner = commands.spawn((
        Spinner,
        Sprite::from_color(Color::srgb(0.25, 0.6, 0.9), Vec2::splat(160.0)),
        Transform::from_xyz(200.0, 0.0, 0.0),
    ));
    if let Some(playing) = playing {
        spinner.insert(StateBasedActivity::shown_in([playing]));
    }

    if let Some(paused) = paused {
        commands.spawn((
            Text::new("PAUSED"),
            TextFont {
                font_size: 48.0,
                ..default()
            },
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(24.0),
                right: Val::Px(32.0),
                ..default()
            },
            StateBasedActivity::shown_in([paused]),
        ));
    }

    // Visible only in the main menu with nothing layered on top.
    if let Some(menu) = registry.id_of("MainMenu") {
        commands.spawn((
            Text::new("Main menu"),
            TextFont {
                font_size: 32.0,
                ..default()
            },
            Node {
                position_type: PositionType::Absolute,
                bottom: Val::Px(24.0),
                right: Val::Px(32.0),
                ..default()
            },
            StateBasedActivity::shown_in([menu]).with_active_match(StateMatch::MatchExactly),
        ));
    }
}

fn spin(time: Res<Time<Virtual>>, mut spinners: Query<&mut Transform, With<Spinner>>) {
    for mut transform in &mut spinners {
        transform.rotate_z(time.delta_secs() * 1.5);
    }
}
