//! Application-state engine for Bevy apps.
//!
//! States are declared once in a catalog ([`StateDefinition`]s, usually read
//! from JSON through [`StateCatalog`]) and built into a [`StateRegistry`].
//! Any number of them can be active at once. [`StateEngine`] owns the active
//! set and applies the override, blocking and substate rules on every change;
//! [`TransitionSequencer`] runs phased transitions with scene loads; and
//! [`StateEnginePlugin`] drives it all from the `Update` schedule.

pub mod activity;
mod active_set;
pub mod blend;
pub mod catalog;
pub mod catalog_error;
pub mod config;
pub mod cursor;
pub mod definition;
pub mod engine;
pub mod notifications;
pub mod registry;
pub mod scene_loading;
pub mod state_engine_plugin;
pub mod time_scale;
pub mod transition;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

#[cfg(test)]
mod integration_tests;

pub use activity::{ActivityToggled, StateBasedActivity, StateMatch};
pub use blend::{BlendStatus, BlendTask, StateBlends};
pub use catalog::StateCatalog;
pub use catalog_error::{CatalogError, CatalogLoadError, UnknownState};
pub use config::{CascadeMode, StateEngineSettings};
pub use cursor::CursorMode;
pub use definition::{StateDefinition, StateId, TimeScaleDirective};
pub use engine::{StateChangeOutcome, StateEngine};
pub use notifications::{
    ChangeCause, ListenerId, SceneChanged, SetStateRequest, StateChange, StateChangeListener,
    StateChanged, TransitionFinished,
};
pub use registry::{RegisteredState, StateRegistry};
pub use scene_loading::{
    InstantSceneLoader, SceneLoadError, SceneLoadMode, SceneLoadStatus, SceneLoadTicket,
    SceneLoader, SceneLoaderResource, SceneRef,
};
pub use state_engine_plugin::{DefaultState, StateEnginePlugin, StateEngineSet};
pub use time_scale::TimeScaleController;
pub use transition::{
    work_fn, BlendMode, StartTransition, TransitionError, TransitionPhase, TransitionSequencer,
    TransitionStatus, TransitionWork, WaitFor, WaitFrames, WorkContext, WorkStatus,
};
