//! Engine-wide constants and the runtime settings resource.

use bevy::prelude::*;

/// Upper bound on catalog size. The override scan is O(N) per activation, so
/// catalogs are expected to stay in the tens of states.
pub const MAX_STATES: usize = 1024;

/// Time scale the engine starts with (and the value `previous` holds before
/// the first `set`).
pub const DEFAULT_TIME_SCALE: f32 = 1.0;

/// Catalog shipped with the demo binary, relative to the working directory.
pub const DEFAULT_CATALOG_PATH: &str = "assets/states.json";

/// Environment variable that overrides [`DEFAULT_CATALOG_PATH`].
pub const CATALOG_PATH_ENV: &str = "STATECRAFT_CATALOG";

/// How many passes `control_substates` makes after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadeMode {
    /// One pass per notification. A grandchild substate may stay active
    /// until the next change settles it.
    SinglePass,
    /// Repeat passes until no substate is deactivated.
    #[default]
    FixedPoint,
}

/// Runtime knobs for [`StateEnginePlugin`](crate::StateEnginePlugin).
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct StateEngineSettings {
    pub cascade: CascadeMode,
    /// Mirror the engine's cursor policy onto the primary window.
    pub apply_cursor: bool,
    /// Mirror the engine's time scale onto `Time<Virtual>`.
    pub apply_time_scale: bool,
}

impl Default for StateEngineSettings {
    fn default() -> Self {
        Self {
            cascade: CascadeMode::FixedPoint,
            apply_cursor: true,
            apply_time_scale: true,
        }
    }
}
