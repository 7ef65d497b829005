//! Current/previous time scale with set-and-remember and swap-back semantics.
//!
//! The controller is owned by the [`StateEngine`](crate::engine::StateEngine)
//! and only changes through state enable/disable hooks. The plugin mirrors
//! [`TimeScaleController::current`] onto `Time<Virtual>` each frame.

use bevy::prelude::*;

use crate::config::{StateEngineSettings, DEFAULT_TIME_SCALE};
use crate::definition::TimeScaleDirective;
use crate::engine::StateEngine;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScaleController {
    current: f32,
    previous: f32,
}

impl Default for TimeScaleController {
    fn default() -> Self {
        Self {
            current: DEFAULT_TIME_SCALE,
            previous: DEFAULT_TIME_SCALE,
        }
    }
}

impl TimeScaleController {
    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn previous(&self) -> f32 {
        self.previous
    }

    /// Store the current scale as previous, then switch to `value`.
    pub fn set(&mut self, value: f32) {
        self.previous = self.current;
        self.current = value;
    }

    /// Swap current and previous.
    pub fn revert(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }

    pub(crate) fn apply(&mut self, directive: TimeScaleDirective) {
        match directive {
            TimeScaleDirective::None => {}
            TimeScaleDirective::Set(value) => self.set(value),
            TimeScaleDirective::Revert => self.revert(),
        }
    }
}

/// Mirrors the engine's time scale onto virtual time.
pub(crate) fn sync_time_scale(
    engine: Res<StateEngine>,
    settings: Res<StateEngineSettings>,
    mut time: ResMut<Time<Virtual>>,
) {
    if !settings.apply_time_scale {
        return;
    }
    let scale = engine.time_scale().current();
    if !scale.is_finite() {
        warn!("Ignoring non-finite time scale {scale}");
        return;
    }
    let target = scale.max(0.0);
    if (time.relative_speed() - target).abs() > f32::EPSILON {
        debug!("Time scale -> {target}");
        time.set_relative_speed(target);
    }
}
