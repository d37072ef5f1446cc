use crate::LOG_SCENE;
use crate::settings::{SceneSettings, SkySettings};
use bevy::light::NotShadowCaster;
use bevy::prelude::*;

/// Plugin for the optional sky sphere
pub struct EnvironmentPlugin;

impl Plugin for EnvironmentPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_sky);
    }
}

#[derive(Component)]
pub struct Sky;

fn spawn_sky(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
    settings: Res<SceneSettings>,
) {
    let sky = &settings.sky;
    if !sky.enabled {
        return;
    }

    let texture = asset_server.load(sky.texture.clone());
    commands.spawn((
        Mesh3d(meshes.add(sky_mesh(sky))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color_texture: Some(texture),
            unlit: true,
            cull_mode: None,
            ..default()
        })),
        // Innenseite der Kugel sichtbar machen
        Transform::from_scale(Vec3::new(-1.0, 1.0, 1.0)),
        NotShadowCaster,
        Sky,
        Name::new("Sky"),
    ));

    info!(target: LOG_SCENE, "sky sphere textured with {}", sky.texture);
}

fn sky_mesh(sky: &SkySettings) -> Mesh {
    Sphere::new(sky.radius)
        .mesh()
        .uv(sky.segments.max(3), sky.segments.max(2))
}
