//! Render surface bookkeeping and the resize handler.
//!
//! The surface size, the post-processing buffers, the camera aspect and the
//! mirror's offscreen texture are all derived from the window size. They are
//! updated together in [`sync_surface_size`] so no frame composites buffers
//! of different resolutions.

use crate::LOG_SCENE;
use crate::camera::MainCamera;
use crate::mirror::{MirrorTarget, reflection_extent};
use crate::settings::SceneSettings;
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowResized};

pub struct SurfacePlugin;

impl Plugin for SurfacePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, init_surface)
            .add_systems(Update, sync_surface_size);
    }
}

/// Size of the window surface the main camera renders to.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct RenderSurface {
    /// Logical window size.
    pub logical_size: Vec2,
    /// Device scale factor reported by the window.
    pub scale_factor: f32,
    pub max_pixel_ratio: f32,
}

impl Default for RenderSurface {
    fn default() -> Self {
        Self {
            logical_size: Vec2::new(1280.0, 720.0),
            scale_factor: 1.0,
            max_pixel_ratio: 2.0,
        }
    }
}

impl RenderSurface {
    /// Device pixel ratio, capped at `max_pixel_ratio`.
    pub fn pixel_ratio(&self) -> f32 {
        self.scale_factor.min(self.max_pixel_ratio)
    }

    pub fn physical_size(&self) -> UVec2 {
        (self.logical_size * self.pixel_ratio())
            .round()
            .as_uvec2()
            .max(UVec2::ONE)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.logical_size.x / self.logical_size.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessPass {
    /// Primary scene render.
    Scene,
    Bloom,
}

/// Full-screen passes applied after the primary render, and their buffer size.
///
/// The main camera gets its bloom pass from `passes`. The engine allocates the
/// bloom textures from the camera viewport, so `buffer_size` records the size
/// they are rendered at rather than driving it.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct PostProcessChain {
    pub passes: Vec<PostProcessPass>,
    /// Physical pixels, always equal to [`RenderSurface::physical_size`].
    pub buffer_size: UVec2,
}

impl PostProcessChain {
    pub fn from_settings(settings: &SceneSettings, buffer_size: UVec2) -> Self {
        let mut passes = vec![PostProcessPass::Scene];
        if settings.bloom.enabled {
            passes.push(PostProcessPass::Bloom);
        }
        Self {
            passes,
            buffer_size,
        }
    }

    pub fn contains(&self, pass: PostProcessPass) -> bool {
        self.passes.contains(&pass)
    }
}

fn init_surface(
    mut commands: Commands,
    settings: Res<SceneSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let mut surface = RenderSurface {
        max_pixel_ratio: settings.renderer.max_pixel_ratio,
        ..default()
    };
    if let Ok(window) = windows.single() {
        surface.logical_size = window.size();
        surface.scale_factor = window.scale_factor();
    }

    info!(
        target: LOG_SCENE,
        "render surface {}x{} @{}x",
        surface.logical_size.x,
        surface.logical_size.y,
        surface.pixel_ratio()
    );

    commands.insert_resource(PostProcessChain::from_settings(
        &settings,
        surface.physical_size(),
    ));
    commands.insert_resource(surface);
}

/// Applies the most recent window resize to every size-dependent piece of state.
///
/// Resizes to a zero-sized surface (minimized windows) are ignored.
pub fn sync_surface_size(
    mut resized: MessageReader<WindowResized>,
    windows: Query<&Window>,
    mut surface: ResMut<RenderSurface>,
    mut chain: ResMut<PostProcessChain>,
    mut cameras: Query<&mut Projection, With<MainCamera>>,
    mirror: Option<Res<MirrorTarget>>,
    images: Option<ResMut<Assets<Image>>>,
) {
    let Some(event) = resized.read().last() else {
        return;
    };
    if event.width <= 0.0 || event.height <= 0.0 {
        debug!(target: LOG_SCENE, "ignoring resize to {}x{}", event.width, event.height);
        return;
    }

    surface.logical_size = Vec2::new(event.width, event.height);
    if let Ok(window) = windows.get(event.window) {
        surface.scale_factor = window.scale_factor();
    }
    let physical = surface.physical_size();

    for mut projection in &mut cameras {
        if let Projection::Perspective(perspective) = projection.as_mut() {
            perspective.aspect_ratio = surface.aspect_ratio();
        }
    }

    chain.buffer_size = physical;

    if let (Some(mirror), Some(mut images)) = (mirror, images) {
        if let Some(image) = images.get_mut(&mirror.image) {
            image.resize(reflection_extent(physical, mirror.resolution_scale));
        }
    }

    debug!(
        target: LOG_SCENE,
        "surface resized to {}x{} ({}x{} physical)",
        event.width, event.height, physical.x, physical.y
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_ratio_is_capped() {
        let surface = RenderSurface {
            logical_size: Vec2::new(800.0, 600.0),
            scale_factor: 3.0,
            max_pixel_ratio: 2.0,
        };
        assert_eq!(surface.pixel_ratio(), 2.0);
        assert_eq!(surface.physical_size(), UVec2::new(1600, 1200));
    }

    #[test]
    fn test_physical_size_never_zero() {
        let surface = RenderSurface {
            logical_size: Vec2::new(0.2, 0.2),
            ..default()
        };
        assert_eq!(surface.physical_size(), UVec2::ONE);
    }

    #[test]
    fn test_chain_omits_disabled_bloom() {
        let mut settings = SceneSettings::default();
        let chain = PostProcessChain::from_settings(&settings, UVec2::new(10, 10));
        assert!(chain.contains(PostProcessPass::Bloom));

        settings.bloom.enabled = false;
        let chain = PostProcessChain::from_settings(&settings, UVec2::new(10, 10));
        assert_eq!(chain.passes, vec![PostProcessPass::Scene]);
    }
}
