//! Cursor policy applied by state enable hooks.

use bevy::prelude::*;
use bevy::window::{CursorGrabMode, PrimaryWindow};

use crate::config::StateEngineSettings;
use crate::engine::StateEngine;

/// Cursor policy of the most recently enabled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    /// Cursor visible and free to leave the window.
    #[default]
    Free,
    /// Cursor hidden and locked to the window.
    Locked,
}

impl CursorMode {
    pub fn from_lock_flag(lock: bool) -> Self {
        if lock {
            CursorMode::Locked
        } else {
            CursorMode::Free
        }
    }
}

/// Mirrors the engine's cursor policy onto the primary window.
///
/// Headless apps have no primary window, so this is a no-op there.
pub(crate) fn sync_cursor(
    engine: Res<StateEngine>,
    settings: Res<StateEngineSettings>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    if !settings.apply_cursor {
        return;
    }
    let locked = engine.cursor_mode() == CursorMode::Locked;
    let grab_mode = if locked {
        CursorGrabMode::Locked
    } else {
        CursorGrabMode::None
    };
    for mut window in &mut windows {
        if window.cursor_options.grab_mode != grab_mode || window.cursor_options.visible == locked {
            window.cursor_options.grab_mode = grab_mode;
            window.cursor_options.visible = !locked;
        }
    }
}
