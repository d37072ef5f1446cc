//! Planar mirror.
//!
//! A second camera renders the scene reflected across the mirror plane into an
//! offscreen texture. The mirror surface samples that texture in screen space,
//! flipped horizontally, and multiplies it by a tint. The mirror mesh lives on
//! its own render layer so the reflection camera never sees it.

use crate::LOG_SCENE;
use crate::camera::MainCamera;
use crate::settings::{SceneSettings, hex_color};
use crate::surface::RenderSurface;
use bevy::asset::RenderAssetUsages;
use bevy::camera::RenderTarget;
use bevy::camera::visibility::RenderLayers;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::light::NotShadowCaster;
use bevy::pbr::{Material, MaterialPlugin};
use bevy::prelude::*;
use bevy::render::render_resource::{
    AsBindGroup, Extent3d, TextureDimension, TextureFormat, TextureUsages,
};
use bevy::render::view::Hdr;
use bevy::shader::ShaderRef;
use bevy::transform::TransformSystems;
use bevy_panorbit_camera::PanOrbitCameraSystemSet;

/// Layer of everything the reflection shows.
pub const SCENE_LAYER: usize = 0;
/// Layer of the mirror surface itself.
pub const MIRROR_LAYER: usize = 1;

const MIRROR_SHADER: &str = "shaders/mirror.wgsl";

pub struct MirrorPlugin;

impl Plugin for MirrorPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(MaterialPlugin::<MirrorMaterial>::default())
            .add_systems(Startup, spawn_mirror)
            .add_systems(
                PostUpdate,
                follow_main_camera
                    .after(PanOrbitCameraSystemSet)
                    .before(TransformSystems::Propagate),
            );
    }
}

#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub struct MirrorMaterial {
    #[uniform(0)]
    pub tint: LinearRgba,
    #[texture(1)]
    #[sampler(2)]
    pub reflection: Handle<Image>,
}

impl Material for MirrorMaterial {
    fn fragment_shader() -> ShaderRef {
        MIRROR_SHADER.into()
    }
}

/// The offscreen texture the reflection camera renders into.
#[derive(Resource, Debug, Clone)]
pub struct MirrorTarget {
    pub image: Handle<Image>,
    pub resolution_scale: f32,
}

/// A reflecting plane; its normal is the entity's local +Y axis.
#[derive(Component)]
pub struct Mirror;

#[derive(Component)]
pub struct MirrorCamera;

/// Reflection texture size for a surface of `physical` pixels, never below 1x1.
pub fn reflection_extent(physical: UVec2, resolution_scale: f32) -> Extent3d {
    let size = (physical.as_vec2() * resolution_scale)
        .floor()
        .as_uvec2()
        .max(UVec2::ONE);
    Extent3d {
        width: size.x,
        height: size.y,
        depth_or_array_layers: 1,
    }
}

/// Mirrors `transform` across the plane through `origin` with normal `normal`.
///
/// The result views the world the way the reflection appears, but with the
/// image flipped horizontally; the mirror shader undoes the flip.
pub fn reflect_across_plane(transform: &Transform, origin: Vec3, normal: Vec3) -> Transform {
    let normal = normal.normalize();
    let reflect_direction = |direction: Vec3| direction - 2.0 * direction.dot(normal) * normal;

    let offset = transform.translation - origin;
    let eye = transform.translation - 2.0 * offset.dot(normal) * normal;
    let forward = reflect_direction(*transform.forward());
    let up = reflect_direction(*transform.up());

    Transform::from_translation(eye).looking_to(forward, up)
}

fn reflection_image(size: Extent3d) -> Image {
    let mut image = Image::new_fill(
        size,
        TextureDimension::D2,
        &[0; 8],
        TextureFormat::Rgba16Float,
        RenderAssetUsages::default(),
    );
    image.texture_descriptor.usage = TextureUsages::TEXTURE_BINDING
        | TextureUsages::COPY_DST
        | TextureUsages::RENDER_ATTACHMENT;
    image
}

fn spawn_mirror(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<MirrorMaterial>>,
    settings: Res<SceneSettings>,
    surface: Res<RenderSurface>,
) {
    let mirror = &settings.mirror;
    if !mirror.enabled {
        return;
    }

    let extent = reflection_extent(surface.physical_size(), mirror.resolution_scale);
    let image = images.add(reflection_image(extent));

    // Rendert vor der Hauptkamera in die Textur
    commands.spawn((
        Camera3d::default(),
        Camera {
            order: -1,
            target: RenderTarget::Image(image.clone().into()),
            clear_color: ClearColorConfig::Custom(hex_color(settings.renderer.clear_color)),
            ..default()
        },
        Hdr,
        Tonemapping::None,
        crate::camera::perspective(&settings.camera, surface.aspect_ratio()),
        Transform::default(),
        RenderLayers::layer(SCENE_LAYER),
        MirrorCamera,
        Name::new("Mirror Camera"),
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(mirror.width, mirror.depth))),
        MeshMaterial3d(materials.add(MirrorMaterial {
            tint: hex_color(mirror.tint).to_linear(),
            reflection: image.clone(),
        })),
        Transform::from_translation(Vec3::from_array(mirror.translation)),
        RenderLayers::layer(MIRROR_LAYER),
        NotShadowCaster,
        Mirror,
        Name::new("Mirror"),
    ));

    info!(
        target: LOG_SCENE,
        "mirror {}x{} reflecting at {}x{}",
        mirror.width, mirror.depth, extent.width, extent.height
    );

    commands.insert_resource(MirrorTarget {
        image,
        resolution_scale: mirror.resolution_scale,
    });
}

/// Keeps the reflection camera mirrored to the main camera after the orbit
/// controls moved it.
pub fn follow_main_camera(
    main: Query<(&Transform, &Projection), (With<MainCamera>, Without<MirrorCamera>)>,
    mirrors: Query<&GlobalTransform, With<Mirror>>,
    mut reflections: Query<
        (&mut Transform, &mut Projection),
        (With<MirrorCamera>, Without<MainCamera>),
    >,
) {
    let Ok((camera, projection)) = main.single() else {
        return;
    };
    let Ok(mirror) = mirrors.single() else {
        return;
    };

    let reflected = reflect_across_plane(camera, mirror.translation(), *mirror.up());
    for (mut transform, mut reflection_projection) in &mut reflections {
        *transform = reflected;
        *reflection_projection = projection.clone();
    }
}
