use std::path::PathBuf;

use bevy::prelude::*;
use bevy::window::PresentMode;
use bevy_egui::EguiPlugin;

use state_engine::config::{CATALOG_PATH_ENV, DEFAULT_CATALOG_PATH};
use state_engine::{SceneLoaderResource, StateCatalog, StateEnginePlugin};

mod demo_loader;
mod demo_scene;
mod demo_ui;
mod sequencers;

use demo_loader::FrameCountSceneLoader;

/// Frames each demo scene takes to "load".
const SCENE_LOAD_FRAMES: u32 = 45;

fn main() {
    // Catalog path: $STATECRAFT_CATALOG, or the catalog bundled with this crate.
    let path = std::env::var(CATALOG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CATALOG_PATH));

    let plugin = match StateCatalog::from_json_file(&path).and_then(StateEnginePlugin::from_catalog) {
        Ok(plugin) => plugin,
        Err(e) => {
            eprintln!("Failed to load state catalog {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Statecraft".to_string(),
                resolution: (1280.0, 720.0).into(),
                present_mode: PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin)
        .add_plugins(plugin)
        .insert_resource(SceneLoaderResource(Box::new(FrameCountSceneLoader::new(
            ["MainMenu", "Level1", "Level2", "Ui"],
            SCENE_LOAD_FRAMES,
        ))))
        .add_plugins((
            demo_scene::DemoScenePlugin,
            sequencers::DemoSequencersPlugin,
            demo_ui::DemoUiPlugin,
        ))
        .run();
}
