use crate::LOG_SCENE;
use crate::settings::{
    AreaLightSettings, DirectionalLightSettings, SceneSettings, ShadowFrustum, hex_color,
};
use bevy::light::{CascadeShadowConfigBuilder, DirectionalLightShadowMap, NotShadowCaster};
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

/// Largest shadow map most GPUs accept.
pub const MAX_SHADOW_MAP_SIZE: usize = 8192;

const MIN_CASCADE_DEPTH: f32 = 0.01;

/// Plugin for managing scene lighting
pub struct LightingPlugin;

impl Plugin for LightingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (spawn_area_lights, spawn_key_light));
    }
}

/// Rectangular emitter. Lit as a soft spot light facing its local -Z axis,
/// shown as an emissive panel of the same size.
#[derive(Component, Debug, Clone)]
pub struct AreaLight {
    pub color: Color,
    pub intensity: f32,
    pub size: Vec2,
}

/// Marker for the visible panel of an [`AreaLight`].
#[derive(Component)]
pub struct AreaLightPanel;

/// The shadow-casting directional light and the volume its shadow map covers.
#[derive(Component, Debug, Clone)]
pub struct KeyLight {
    pub frustum: ShadowFrustum,
}

/// Transform at `position` whose -Z axis points at `target`.
pub fn aimed_at(position: Vec3, target: Vec3) -> Transform {
    let direction = target - position;
    let up = if direction.normalize_or_zero().abs().y > 0.999 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    Transform::from_translation(position).looking_at(target, up)
}

fn spawn_area_lights(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<SceneSettings>,
) {
    for light in &settings.area_lights {
        let color = hex_color(light.color);
        let panel = meshes.add(Rectangle::new(light.width, light.height));
        let material = materials.add(panel_material(light, color));

        commands
            .spawn((
                AreaLight {
                    color,
                    intensity: light.intensity,
                    size: Vec2::new(light.width, light.height),
                },
                SpotLight {
                    color,
                    intensity: light.intensity,
                    range: light.range,
                    radius: 0.5 * light.width.min(light.height),
                    shadows_enabled: false,
                    inner_angle: FRAC_PI_2 * 0.5,
                    outer_angle: FRAC_PI_2 * 0.95,
                    ..default()
                },
                aimed_at(
                    Vec3::from_array(light.position),
                    Vec3::from_array(light.look_at),
                ),
                Name::new(light.name.clone()),
            ))
            .with_children(|parent| {
                parent.spawn((
                    Mesh3d(panel),
                    MeshMaterial3d(material),
                    Transform::default(),
                    NotShadowCaster,
                    AreaLightPanel,
                ));
            });

        info!(
            target: LOG_SCENE,
            "spawned area light '{}' at {:?}", light.name, light.position
        );
    }
}

fn panel_material(light: &AreaLightSettings, color: Color) -> StandardMaterial {
    StandardMaterial {
        base_color: Color::BLACK,
        emissive: color.to_linear() * light.panel_luminance,
        cull_mode: None,
        double_sided: true,
        ..default()
    }
}

fn spawn_key_light(mut commands: Commands, settings: Res<SceneSettings>) {
    let light = &settings.directional;
    if !light.enabled {
        return;
    }

    let transform = aimed_at(
        Vec3::from_array(light.position),
        Vec3::from_array(light.look_at),
    );

    let frustum = light.shadow_frustum;
    if settings.mirror.enabled && !frustum.encloses(&transform, settings.mirror.corners()) {
        warn!(
            target: LOG_SCENE,
            "shadow frustum {:?} does not enclose the mirror plane; shadows will clip",
            frustum
        );
    }

    let shadow_map_size = clamp_shadow_map_size(light.shadow_map_size);
    if shadow_map_size != light.shadow_map_size {
        warn!(
            target: LOG_SCENE,
            "shadow map size {} clamped to {}", light.shadow_map_size, shadow_map_size
        );
    }
    commands.insert_resource(DirectionalLightShadowMap {
        size: shadow_map_size,
    });

    commands.spawn((
        DirectionalLight {
            color: hex_color(light.color),
            illuminance: light.illuminance,
            shadows_enabled: light.shadows,
            shadow_depth_bias: light.shadow_depth_bias,
            shadow_normal_bias: light.shadow_normal_bias,
            ..default()
        },
        cascades(light),
        transform,
        KeyLight { frustum },
        Name::new("Key Directional Light"),
    ));
}

/// A single cascade spanning the near and far planes of the shadow frustum.
fn cascades(light: &DirectionalLightSettings) -> bevy::light::CascadeShadowConfig {
    let near = light.shadow_frustum.near.max(0.0);
    // The builder asserts a non-empty depth range
    let far = light.shadow_frustum.far.max(near + MIN_CASCADE_DEPTH);
    CascadeShadowConfigBuilder {
        num_cascades: 1,
        minimum_distance: near,
        maximum_distance: far,
        first_cascade_far_bound: far,
        ..default()
    }
    .build()
}

/// Largest power of two in `1..=MAX_SHADOW_MAP_SIZE` not above `size`.
pub fn clamp_shadow_map_size(size: usize) -> usize {
    let size = size.clamp(1, MAX_SHADOW_MAP_SIZE);
    if size.is_power_of_two() {
        size
    } else {
        size.next_power_of_two() / 2
    }
}
