//! Egui control panel for the demo, plus the ESC pause toggle.
//!
//! The panel lists every catalog state (click to `set_state`), the engine's
//! side-effect outputs and the demo transitions with their current phase.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use state_engine::{
    SetStateRequest, StartTransition, StateChanged, StateEngine, StateEngineSet,
    TransitionSequencer,
};

pub struct DemoUiPlugin;

impl Plugin for DemoUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (toggle_pause, state_panel).before(StateEngineSet::Requests),
        )
        .add_systems(Update, log_state_changes.after(StateEngineSet::Events));
    }
}

// =============================================================================
// Systems
// =============================================================================

/// ESC toggles the `Paused` state while `Playing` is active.
fn toggle_pause(
    keyboard: Res<ButtonInput<KeyCode>>,
    engine: Res<StateEngine>,
    mut contexts: EguiContexts,
    mut requests: EventWriter<SetStateRequest>,
) {
    // Don't intercept ESC if egui is consuming keyboard input (e.g. text fields).
    if contexts.ctx_mut().wants_keyboard_input() {
        return;
    }
    if !keyboard.just_pressed(KeyCode::Escape) {
        return;
    }
    let registry = engine.registry();
    let (Some(playing), Some(paused)) = (registry.id_of("Playing"), registry.id_of("Paused")) else {
        return;
    };
    if engine.is_active(playing) {
        requests.send(SetStateRequest(paused));
    }
}

fn state_panel(
    mut contexts: EguiContexts,
    engine: Res<StateEngine>,
    sequencers: Query<(Entity, &Name, &TransitionSequencer)>,
    mut set_state: EventWriter<SetStateRequest>,
    mut start: EventWriter<StartTransition>,
) {
    let ctx = contexts.ctx_mut();

    egui::SidePanel::left("state_panel")
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.heading("States");
            ui.label(format!("Active: {}", engine.describe_active()));
            ui.label(format!(
                "Time scale: {:.2} (previous {:.2})",
                engine.time_scale().current(),
                engine.time_scale().previous()
            ));
            ui.label(format!("Cursor: {:?}", engine.cursor_mode()));
            ui.separator();

            for state in engine.registry().iter() {
                let active = engine.is_active(state.id);
                let blocked = engine.is_blocked(state.id);
                let mut text = egui::RichText::new(&state.name);
                if active {
                    text = text.strong().color(egui::Color32::LIGHT_GREEN);
                }
                let button = ui
                    .add_enabled(!blocked, egui::Button::new(text))
                    .on_disabled_hover_text("Blocked");
                if button.clicked() {
                    set_state.send(SetStateRequest(state.id));
                }
            }

            ui.separator();
            ui.heading("Transitions");
            for (entity, name, sequencer) in &sequencers {
                let busy = sequencer.is_transitioning();
                let label = if busy {
                    format!("{} ({:?})", name.as_str(), sequencer.phase())
                } else {
                    name.as_str().to_string()
                };
                if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
                    start.send(StartTransition(entity));
                }
            }

            ui.separator();
            ui.small("ESC toggles pause while playing");
        });
}

fn log_state_changes(mut changes: EventReader<StateChanged>, engine: Res<StateEngine>) {
    for StateChanged(change) in changes.read() {
        info!(
            "{:?} -> [{}]",
            change.cause,
            engine.describe_active()
        );
    }
}
