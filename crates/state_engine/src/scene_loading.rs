//! Scene-loading seam used by transition sequencers.
//!
//! The engine does not load scenes itself. A host installs a [`SceneLoader`]
//! in [`SceneLoaderResource`]; sequencers start loads through it and poll
//! them once per frame until they finish.

use std::fmt;

use bevy::prelude::*;

/// A scene addressed by build index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for SceneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneRef::Index(i) => write!(f, "scene index {i}"),
            SceneRef::Name(name) => write!(f, "scene \"{name}\""),
        }
    }
}

impl From<usize> for SceneRef {
    fn from(index: usize) -> Self {
        SceneRef::Index(index)
    }
}

impl From<&str> for SceneRef {
    fn from(name: &str) -> Self {
        SceneRef::Name(name.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneLoadMode {
    /// Replace every loaded scene.
    Single,
    /// Load alongside the scenes already present.
    Additive,
}

/// Opaque handle for one in-flight load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneLoadTicket(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum SceneLoadStatus {
    Loading,
    Loaded,
    Failed(SceneLoadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneLoadError {
    /// No scene matches the reference.
    NotFound(SceneRef),
    /// The ticket does not belong to an in-flight load.
    UnknownTicket(SceneLoadTicket),
    /// The loader reported a failure while loading.
    Failed { scene: SceneRef, reason: String },
}

impl fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneLoadError::NotFound(scene) => write!(f, "No such scene: {scene}"),
            SceneLoadError::UnknownTicket(ticket) => {
                write!(f, "Unknown scene load ticket {}", ticket.0)
            }
            SceneLoadError::Failed { scene, reason } => {
                write!(f, "Loading {scene} failed: {reason}")
            }
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// Starts and polls scene loads.
pub trait SceneLoader: Send + Sync {
    fn begin_load(
        &mut self,
        scene: &SceneRef,
        mode: SceneLoadMode,
    ) -> Result<SceneLoadTicket, SceneLoadError>;

    fn poll_load(&mut self, ticket: SceneLoadTicket) -> SceneLoadStatus;
}

/// Loads kept by [`InstantSceneLoader::history`].
const HISTORY_LEN: usize = 32;

/// Loader that reports every load as finished on its first poll.
///
/// Useful for apps whose "scenes" are just ECS setup done in state hooks,
/// and as the default until a real loader is installed.
#[derive(Debug, Default)]
pub struct InstantSceneLoader {
    next_ticket: u64,
    loaded: Vec<(SceneRef, SceneLoadMode)>,
}

impl InstantSceneLoader {
    /// The most recent loads started, oldest first.
    pub fn history(&self) -> &[(SceneRef, SceneLoadMode)] {
        &self.loaded
    }
}

impl SceneLoader for InstantSceneLoader {
    fn begin_load(
        &mut self,
        scene: &SceneRef,
        mode: SceneLoadMode,
    ) -> Result<SceneLoadTicket, SceneLoadError> {
        info!("Loading {scene} ({mode:?})");
        if self.loaded.len() == HISTORY_LEN {
            self.loaded.remove(0);
        }
        self.loaded.push((scene.clone(), mode));
        let ticket = SceneLoadTicket(self.next_ticket);
        self.next_ticket += 1;
        Ok(ticket)
    }

    fn poll_load(&mut self, ticket: SceneLoadTicket) -> SceneLoadStatus {
        if ticket.0 < self.next_ticket {
            SceneLoadStatus::Loaded
        } else {
            SceneLoadStatus::Failed(SceneLoadError::UnknownTicket(ticket))
        }
    }
}

/// The app's scene loader.
#[derive(Resource)]
pub struct SceneLoaderResource(pub Box<dyn SceneLoader>);

impl Default for SceneLoaderResource {
    fn default() -> Self {
        Self(Box::new(InstantSceneLoader::default()))
    }
}
