//! Showroom scene: a mirror floor lit by three coloured area lights and a
//! shadow-casting sun, two glTF models, orbit controls and bloom.

pub mod camera;
pub mod debug;
pub mod environment;
pub mod error;
pub mod lighting;
pub mod mirror;
pub mod models;
pub mod settings;
pub mod surface;

use bevy::prelude::*;

pub use error::SceneError;
pub use models::ScenePhase;
pub use settings::SceneSettings;

pub const LOG_SCENE: &str = "showroom/scene";
pub const LOG_ASSETS: &str = "showroom/assets";

/// Composes the whole scene from a validated [`SceneSettings`].
pub struct ShowroomPlugin {
    settings: SceneSettings,
}

impl ShowroomPlugin {
    pub fn new(settings: SceneSettings) -> Self {
        Self { settings }
    }
}

impl Plugin for ShowroomPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings.clone()).add_plugins((
            surface::SurfacePlugin,
            camera::CameraPlugin,
            lighting::LightingPlugin,
            models::ModelsPlugin,
            mirror::MirrorPlugin,
            environment::EnvironmentPlugin,
            debug::DebugHelpersPlugin,
        ));
    }
}
