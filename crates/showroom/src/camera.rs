use crate::mirror::{MIRROR_LAYER, SCENE_LAYER};
use crate::settings::{
    BloomSettings, CameraSettings, OrbitSettings, SceneSettings, ShadowFiltering, ToneMapping,
    hex_color,
};
use crate::surface::{PostProcessChain, PostProcessPass, RenderSurface};
use bevy::camera::visibility::RenderLayers;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::light::ShadowFilteringMethod;
use bevy::post_process::bloom::{Bloom, BloomCompositeMode, BloomPrefilter};
use bevy::prelude::*;
use bevy::render::view::Hdr;
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};

/// Plugin for the main viewing camera and its orbit controls
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PanOrbitCameraPlugin)
            .add_systems(Startup, spawn_main_camera);
    }
}

/// Marker component for the camera the window shows
#[derive(Component)]
pub struct MainCamera;

fn spawn_main_camera(
    mut commands: Commands,
    settings: Res<SceneSettings>,
    surface: Res<RenderSurface>,
    chain: Res<PostProcessChain>,
) {
    let camera = &settings.camera;
    let focus = Vec3::from_array(camera.look_at);
    let renderer = &settings.renderer;

    let mut entity = commands.spawn((
        Camera3d::default(),
        Camera {
            clear_color: ClearColorConfig::Custom(hex_color(renderer.clear_color)),
            ..default()
        },
        perspective(camera, surface.aspect_ratio()),
        Transform::from_translation(Vec3::from_array(camera.position)).looking_at(focus, Vec3::Y),
        tonemapping(renderer.tone_mapping),
        msaa(renderer.msaa_samples),
        shadow_filtering(renderer.shadow_filtering),
        // Spiegel nur in der Hauptansicht, nicht in seiner eigenen Reflexion
        RenderLayers::from_layers(&[SCENE_LAYER, MIRROR_LAYER]),
        orbit_camera(&settings.orbit, focus),
        MainCamera,
        Name::new("Main Camera"),
    ));

    if chain.contains(PostProcessPass::Bloom) {
        entity.insert((bloom(&settings.bloom), Hdr));
    }
}

pub fn perspective(camera: &CameraSettings, aspect_ratio: f32) -> Projection {
    Projection::Perspective(PerspectiveProjection {
        fov: camera.fov_degrees.to_radians(),
        aspect_ratio,
        near: camera.near,
        far: camera.far,
        ..default()
    })
}

/// Orbit controls around `focus`. Yaw, pitch and radius are derived from the
/// camera transform on the first frame.
pub fn orbit_camera(orbit: &OrbitSettings, focus: Vec3) -> PanOrbitCamera {
    let (orbit_smoothness, pan_smoothness, zoom_smoothness) = if orbit.damping {
        (
            orbit.orbit_smoothness,
            orbit.pan_smoothness,
            orbit.zoom_smoothness,
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    PanOrbitCamera {
        focus,
        target_focus: focus,
        orbit_smoothness,
        pan_smoothness,
        zoom_smoothness,
        orbit_sensitivity: orbit.orbit_sensitivity,
        pan_sensitivity: orbit.pan_sensitivity,
        zoom_sensitivity: orbit.zoom_sensitivity,
        ..default()
    }
}

/// Maps the bloom settings onto an additive, thresholded bloom.
///
/// `radius` in [0, 1] selects how many of the blur mips contribute: 0 keeps
/// only the upper half of the chain, 1 uses all of them.
pub fn bloom(settings: &BloomSettings) -> Bloom {
    Bloom {
        intensity: settings.strength,
        high_pass_frequency: 0.5 + 0.5 * settings.radius.clamp(0.0, 1.0),
        prefilter: BloomPrefilter {
            threshold: settings.threshold,
            threshold_softness: 0.2,
        },
        composite_mode: BloomCompositeMode::Additive,
        ..Bloom::NATURAL
    }
}

pub fn tonemapping(mode: ToneMapping) -> Tonemapping {
    match mode {
        ToneMapping::None => Tonemapping::None,
        ToneMapping::Reinhard => Tonemapping::Reinhard,
        ToneMapping::AcesFitted => Tonemapping::AcesFitted,
        ToneMapping::AgX => Tonemapping::AgX,
        ToneMapping::TonyMcMapface => Tonemapping::TonyMcMapface,
    }
}

/// Sample counts other than 2, 4 and 8 disable multisampling.
pub fn msaa(samples: u32) -> Msaa {
    match samples {
        2 => Msaa::Sample2,
        4 => Msaa::Sample4,
        8 => Msaa::Sample8,
        _ => Msaa::Off,
    }
}

pub fn shadow_filtering(filtering: ShadowFiltering) -> ShadowFilteringMethod {
    match filtering {
        ShadowFiltering::Hard => ShadowFilteringMethod::Hardware2x2,
        ShadowFiltering::Soft => ShadowFilteringMethod::Gaussian,
        ShadowFiltering::Temporal => ShadowFilteringMethod::Temporal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perspective_uses_radians() {
        let Projection::Perspective(projection) = perspective(&CameraSettings::default(), 1.5)
        else {
            panic!("expected perspective projection");
        };
        assert!((projection.fov - 55f32.to_radians()).abs() < 1e-6);
        assert_eq!(projection.aspect_ratio, 1.5);
        assert_eq!(projection.near, 0.1);
        assert_eq!(projection.far, 1000.0);
    }

    #[test]
    fn test_bloom_mapping() {
        let bloom = bloom(&BloomSettings::default());
        assert_eq!(bloom.intensity, 0.3);
        assert_eq!(bloom.prefilter.threshold, 0.35);
        assert!((bloom.high_pass_frequency - 0.55).abs() < 1e-6);
        assert_eq!(bloom.composite_mode, BloomCompositeMode::Additive);
    }

    #[test]
    fn test_bloom_radius_is_clamped() {
        let wide = bloom(&BloomSettings {
            radius: 4.0,
            ..default()
        });
        assert_eq!(wide.high_pass_frequency, 1.0);
    }

    #[test]
    fn test_damping_off_zeroes_smoothness() {
        let orbit = OrbitSettings {
            damping: false,
            ..default()
        };
        let camera = orbit_camera(&orbit, Vec3::ZERO);
        assert_eq!(camera.orbit_smoothness, 0.0);
        assert_eq!(camera.pan_smoothness, 0.0);
        assert_eq!(camera.zoom_smoothness, 0.0);

        let damped = orbit_camera(&OrbitSettings::default(), Vec3::Y);
        assert_eq!(damped.orbit_smoothness, 0.1);
        assert_eq!(damped.target_focus, Vec3::Y);
    }

    fn spawn_with_bloom(enabled: bool) -> App {
        let mut settings = SceneSettings::default();
        settings.bloom.enabled = enabled;
        let surface = RenderSurface::default();

        let mut app = App::new();
        app.insert_resource(PostProcessChain::from_settings(
            &settings,
            surface.physical_size(),
        ))
        .insert_resource(surface)
        .insert_resource(settings)
        .add_systems(Startup, spawn_main_camera);
        app.update();
        app
    }

    #[test]
    fn test_bloom_follows_post_process_chain() {
        let mut app = spawn_with_bloom(true);
        let world = app.world_mut();
        let mut blooms = world.query_filtered::<&Bloom, With<MainCamera>>();
        let intensity = blooms.single(world).unwrap().intensity;
        assert_eq!(intensity, 0.3);

        let mut app = spawn_with_bloom(false);
        let world = app.world_mut();
        assert_eq!(
            world
                .query_filtered::<&Bloom, With<MainCamera>>()
                .iter(world)
                .count(),
            0
        );
        assert_eq!(
            world
                .query_filtered::<&Camera, With<MainCamera>>()
                .iter(world)
                .count(),
            1
        );
    }

    #[test]
    fn test_msaa_fallback() {
        assert_eq!(msaa(4), Msaa::Sample4);
        assert_eq!(msaa(1), Msaa::Off);
    }
}
