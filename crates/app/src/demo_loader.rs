//! Scene loader for the demo: scenes are names, and loading one just takes a
//! fixed number of frames.

use std::collections::HashMap;

use bevy::prelude::*;

use state_engine::{
    SceneLoadError, SceneLoadMode, SceneLoadStatus, SceneLoadTicket, SceneLoader, SceneRef,
};

pub struct FrameCountSceneLoader {
    scenes: Vec<String>,
    frames_per_scene: u32,
    in_flight: HashMap<SceneLoadTicket, (SceneRef, u32)>,
    next_ticket: u64,
}

impl FrameCountSceneLoader {
    pub fn new<I, S>(scenes: I, frames_per_scene: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scenes: scenes.into_iter().map(Into::into).collect(),
            frames_per_scene,
            in_flight: HashMap::new(),
            next_ticket: 0,
        }
    }

    fn exists(&self, scene: &SceneRef) -> bool {
        match scene {
            SceneRef::Index(i) => *i < self.scenes.len(),
            SceneRef::Name(name) => self.scenes.iter().any(|s| s == name),
        }
    }
}

impl SceneLoader for FrameCountSceneLoader {
    fn begin_load(
        &mut self,
        scene: &SceneRef,
        mode: SceneLoadMode,
    ) -> Result<SceneLoadTicket, SceneLoadError> {
        if !self.exists(scene) {
            return Err(SceneLoadError::NotFound(scene.clone()));
        }
        let ticket = SceneLoadTicket(self.next_ticket);
        self.next_ticket += 1;
        info!("Loading {scene} ({mode:?}), {} frames", self.frames_per_scene);
        self.in_flight
            .insert(ticket, (scene.clone(), self.frames_per_scene));
        Ok(ticket)
    }

    fn poll_load(&mut self, ticket: SceneLoadTicket) -> SceneLoadStatus {
        let Some((_, remaining)) = self.in_flight.get_mut(&ticket) else {
            return SceneLoadStatus::Failed(SceneLoadError::UnknownTicket(ticket));
        };
        if *remaining > 0 {
            *remaining -= 1;
            return SceneLoadStatus::Loading;
        }
        self.in_flight.remove(&ticket);
        SceneLoadStatus::Loaded
    }
}
