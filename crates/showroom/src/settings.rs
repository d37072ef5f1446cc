//! Scene configuration.
//!
//! Every tunable literal of the showroom lives here. The file format is RON;
//! missing sections and fields fall back to [`Default`], so a settings file
//! only needs to contain what it overrides. Colors are written as hex
//! integers (`0xffff00`).

use crate::LOG_SCENE;
use crate::error::SceneError;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Converts a `0xRRGGBB` integer into an sRGB color.
pub fn hex_color(rgb: u32) -> Color {
    Color::srgb_u8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub renderer: RendererSettings,
    pub camera: CameraSettings,
    pub orbit: OrbitSettings,
    pub bloom: BloomSettings,
    pub area_lights: Vec<AreaLightSettings>,
    pub directional: DirectionalLightSettings,
    pub models: Vec<ModelSpec>,
    pub mirror: MirrorSettings,
    pub sky: SkySettings,
    pub debug: DebugSettings,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            renderer: RendererSettings::default(),
            camera: CameraSettings::default(),
            orbit: OrbitSettings::default(),
            bloom: BloomSettings::default(),
            area_lights: vec![
                AreaLightSettings::new("Area Light Yellow", 0xffff00, [-5.0, 5.5, 5.0]),
                AreaLightSettings::new("Area Light Cyan", 0x00ffff, [0.0, 5.5, -5.0]),
                AreaLightSettings::new("Area Light Magenta", 0xff00ff, [5.0, 5.5, 5.0]),
            ],
            directional: DirectionalLightSettings::default(),
            models: vec![
                // Wird nur vorgeladen, nicht in die Szene gehängt
                ModelSpec {
                    name: "chess".to_string(),
                    path: "models/gltf/chess.glb".to_string(),
                    translation: [0.0, 0.0, 0.0],
                    scale: 1.0,
                    spawn: false,
                },
                ModelSpec {
                    name: "maclaren".to_string(),
                    path: "models/gltf/maclaren8.glb".to_string(),
                    translation: [0.0, 0.0, 0.0],
                    scale: 2.0,
                    spawn: true,
                },
            ],
            mirror: MirrorSettings::default(),
            sky: SkySettings::default(),
            debug: DebugSettings::default(),
        }
    }
}

impl SceneSettings {
    /// Loads settings from `path`.
    ///
    /// A missing file yields the defaults. Unreadable or malformed files and
    /// values that fail [`SceneSettings::validate`] are errors.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    target: LOG_SCENE,
                    "no settings file at {}, using defaults",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SceneError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let settings = Self::from_ron(&text).map_err(|source| SceneError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;

        info!(target: LOG_SCENE, "loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Checks value ranges the engine would otherwise reject or render wrongly.
    pub fn validate(&self) -> Result<(), SceneError> {
        let mut problems = Vec::new();

        let renderer = &self.renderer;
        if !(renderer.max_pixel_ratio > 0.0) {
            problems.push(format!(
                "renderer.max_pixel_ratio must be positive, got {}",
                renderer.max_pixel_ratio
            ));
        }
        if !matches!(renderer.msaa_samples, 1 | 2 | 4 | 8) {
            problems.push(format!(
                "renderer.msaa_samples must be 1, 2, 4 or 8, got {}",
                renderer.msaa_samples
            ));
        }

        let camera = &self.camera;
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            problems.push(format!(
                "camera.fov_degrees must be in (0, 180), got {}",
                camera.fov_degrees
            ));
        }
        if !(camera.near > 0.0 && camera.near < camera.far) {
            problems.push(format!(
                "camera planes must satisfy 0 < near < far, got near={} far={}",
                camera.near, camera.far
            ));
        }

        for light in &self.area_lights {
            if !(light.width > 0.0 && light.height > 0.0) {
                problems.push(format!(
                    "area light '{}' needs a positive extent, got {}x{}",
                    light.name, light.width, light.height
                ));
            }
        }

        if self.directional.shadow_frustum.is_degenerate() {
            problems.push(format!(
                "directional.shadow_frustum is degenerate: {:?}",
                self.directional.shadow_frustum
            ));
        }

        for model in &self.models {
            if !(model.scale > 0.0) {
                problems.push(format!(
                    "model '{}' needs a positive scale, got {}",
                    model.name, model.scale
                ));
            }
        }

        let scale = self.mirror.resolution_scale;
        if !(scale > 0.0 && scale <= 1.0) {
            problems.push(format!(
                "mirror.resolution_scale must be in (0, 1], got {scale}"
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SceneError::InvalidSettings(problems.join("; ")))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToneMapping {
    None,
    Reinhard,
    AcesFitted,
    AgX,
    TonyMcMapface,
}

/// Shadow map filtering; `Soft` is a wide gaussian PCF kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowFiltering {
    Hard,
    Soft,
    Temporal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Upper bound for the device pixel ratio used for offscreen buffers.
    pub max_pixel_ratio: f32,
    pub tone_mapping: ToneMapping,
    pub msaa_samples: u32,
    pub shadow_filtering: ShadowFiltering,
    pub clear_color: u32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            max_pixel_ratio: 2.0,
            tone_mapping: ToneMapping::AcesFitted,
            msaa_samples: 4,
            shadow_filtering: ShadowFiltering::Soft,
            clear_color: 0x000000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Vertical field of view.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub look_at: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 55.0,
            near: 0.1,
            far: 1000.0,
            position: [5.0, 5.0, 5.0],
            look_at: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    /// With damping off the camera snaps to its target every frame.
    pub damping: bool,
    pub orbit_smoothness: f32,
    pub pan_smoothness: f32,
    pub zoom_smoothness: f32,
    pub orbit_sensitivity: f32,
    pub pan_sensitivity: f32,
    pub zoom_sensitivity: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            damping: true,
            orbit_smoothness: 0.1,
            pan_smoothness: 0.02,
            zoom_smoothness: 0.1,
            orbit_sensitivity: 1.0,
            pan_sensitivity: 1.0,
            zoom_sensitivity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    pub enabled: bool,
    pub strength: f32,
    /// 0.0 keeps the glow tight around bright pixels, 1.0 spreads it over all mips.
    pub radius: f32,
    /// Luminance below which pixels do not bloom.
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strength: 0.3,
            radius: 0.1,
            threshold: 0.35,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaLightSettings {
    pub name: String,
    pub color: u32,
    /// Luminous power in lumens.
    pub intensity: f32,
    pub width: f32,
    pub height: f32,
    pub range: f32,
    /// Emissive strength of the visible light panel.
    pub panel_luminance: f32,
    pub position: [f32; 3],
    pub look_at: [f32; 3],
}

impl AreaLightSettings {
    fn new(name: &str, color: u32, position: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            color,
            position,
            ..default()
        }
    }
}

impl Default for AreaLightSettings {
    fn default() -> Self {
        Self {
            name: "Area Light".to_string(),
            color: 0xffffff,
            intensity: 400_000.0,
            width: 4.0,
            height: 10.0,
            range: 40.0,
            panel_luminance: 6.0,
            position: [0.0, 5.5, 0.0],
            look_at: [0.0, 0.0, 0.0],
        }
    }
}

/// Orthographic volume, in light space, that the directional shadow map covers.
///
/// The light looks down its local -Z axis; `near`/`far` are distances along
/// that axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowFrustum {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowFrustum {
    fn default() -> Self {
        Self {
            left: -100.0,
            right: 100.0,
            top: 100.0,
            bottom: -100.0,
            near: 0.0,
            far: 300.0,
        }
    }
}

impl ShadowFrustum {
    pub fn is_degenerate(&self) -> bool {
        !(self.left < self.right && self.bottom < self.top && self.near < self.far)
            || self.near < 0.0
    }

    /// True when every point lies inside the volume of a light placed at `light`.
    pub fn encloses(&self, light: &Transform, points: impl IntoIterator<Item = Vec3>) -> bool {
        let world_to_light = light.compute_affine().inverse();
        points.into_iter().all(|point| {
            let local = world_to_light.transform_point3(point);
            let depth = -local.z;
            (self.left..=self.right).contains(&local.x)
                && (self.bottom..=self.top).contains(&local.y)
                && (self.near..=self.far).contains(&depth)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLightSettings {
    pub enabled: bool,
    pub color: u32,
    /// Illuminance in lux.
    pub illuminance: f32,
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    pub shadows: bool,
    pub shadow_frustum: ShadowFrustum,
    pub shadow_depth_bias: f32,
    /// In shadow map texels.
    pub shadow_normal_bias: f32,
    pub shadow_map_size: usize,
}

impl Default for DirectionalLightSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            color: 0xffffff,
            illuminance: 4_500.0,
            position: [50.0, 200.0, 75.0],
            look_at: [0.0, 0.0, 0.0],
            shadows: true,
            shadow_frustum: ShadowFrustum::default(),
            shadow_depth_bias: 0.01,
            shadow_normal_bias: 0.05,
            shadow_map_size: 10_096,
        }
    }
}

/// A glTF model requested at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    /// Path relative to the asset root.
    pub path: String,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: f32,
    /// `false` loads the model without placing it in the scene.
    #[serde(default = "enabled")]
    pub spawn: bool,
}

fn unit_scale() -> f32 {
    1.0
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorSettings {
    pub enabled: bool,
    pub width: f32,
    pub depth: f32,
    pub translation: [f32; 3],
    pub tint: u32,
    /// Reflection texture size relative to the physical surface size.
    pub resolution_scale: f32,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 100.0,
            depth: 100.0,
            translation: [0.0, 0.0, 0.0],
            tint: 0x727272,
            resolution_scale: 0.5,
        }
    }
}

impl MirrorSettings {
    /// Corners of the horizontal mirror plane in world space.
    pub fn corners(&self) -> [Vec3; 4] {
        let center = Vec3::from_array(self.translation);
        let half_x = self.width * 0.5;
        let half_z = self.depth * 0.5;
        [
            center + Vec3::new(-half_x, 0.0, -half_z),
            center + Vec3::new(half_x, 0.0, -half_z),
            center + Vec3::new(half_x, 0.0, half_z),
            center + Vec3::new(-half_x, 0.0, half_z),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkySettings {
    pub enabled: bool,
    pub radius: f32,
    pub segments: u32,
    /// Equirectangular image, relative to the asset root.
    pub texture: String,
}

impl Default for SkySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 500.0,
            segments: 32,
            texture: "textures/buildings.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub axes: bool,
    pub axes_length: f32,
    pub grid: bool,
    pub grid_size: f32,
    pub grid_divisions: u32,
    pub lights: bool,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            axes: false,
            axes_length: 50.0,
            grid: false,
            grid_size: 100.0,
            grid_divisions: 10,
            lights: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        SceneSettings::default().validate().unwrap();
    }

    #[test]
    fn test_defaults_match_demo_layout() {
        let settings = SceneSettings::default();
        assert_eq!(settings.camera.fov_degrees, 55.0);
        assert_eq!(settings.camera.position, [5.0, 5.0, 5.0]);
        assert_eq!(settings.area_lights.len(), 3);
        assert_eq!(settings.models.len(), 2);
        assert!(!settings.models[0].spawn);
        assert!(settings.models[1].spawn);
        assert_eq!(settings.models[1].scale, 2.0);
        assert!(!settings.sky.enabled);
    }

    #[test]
    fn test_key_light_defaults() {
        let light = DirectionalLightSettings::default();
        assert!(!light.enabled);
        assert!(light.shadows);
        assert_eq!(light.position, [50.0, 200.0, 75.0]);
        assert_eq!(light.shadow_depth_bias, 0.01);
        assert_eq!(light.shadow_normal_bias, 0.05);
        assert_eq!(light.shadow_map_size, 10_096);
        assert_eq!(light.shadow_frustum.near, 0.0);
        assert_eq!(light.shadow_frustum.far, 300.0);
    }

    #[test]
    fn test_hex_color() {
        let magenta = hex_color(0xff00ff).to_srgba();
        assert_eq!(magenta.red, 1.0);
        assert_eq!(magenta.green, 0.0);
        assert_eq!(magenta.blue, 1.0);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let settings = SceneSettings::from_ron(
            r#"(
                camera: (fov_degrees: 70.0),
                bloom: (strength: 0.8),
                area_lights: [
                    (name: "Key", color: 0x38f5b6, intensity: 50.0, width: 5.0, height: 5.0, position: (10.0, 10.0, 10.0)),
                ],
                models: [(name: "car", path: "models/car.glb")],
            )"#,
        )
        .unwrap();

        assert_eq!(settings.camera.fov_degrees, 70.0);
        assert_eq!(settings.camera.near, 0.1);
        assert_eq!(settings.bloom.strength, 0.8);
        assert_eq!(settings.bloom.threshold, 0.35);
        assert_eq!(settings.area_lights.len(), 1);
        assert_eq!(settings.area_lights[0].color, 0x38f5b6);
        assert_eq!(settings.area_lights[0].range, 40.0);
        assert_eq!(settings.models[0].scale, 1.0);
        assert!(settings.models[0].spawn);
    }

    #[test]
    fn test_validate_collects_all_problems() {
        let mut settings = SceneSettings::default();
        settings.camera.near = 0.0;
        settings.mirror.resolution_scale = 0.0;
        settings.renderer.msaa_samples = 3;

        let Err(SceneError::InvalidSettings(message)) = settings.validate() else {
            panic!("expected invalid settings");
        };
        assert!(message.contains("near"));
        assert!(message.contains("resolution_scale"));
        assert!(message.contains("msaa_samples"));
    }

    #[test]
    fn test_degenerate_shadow_frustum() {
        let mut frustum = ShadowFrustum::default();
        assert!(!frustum.is_degenerate());
        frustum.left = frustum.right;
        assert!(frustum.is_degenerate());
    }

    #[test]
    fn test_shadow_frustum_encloses_mirror_plane() {
        let settings = SceneSettings::default();
        let light = Transform::from_translation(Vec3::from_array(settings.directional.position))
            .looking_at(Vec3::ZERO, Vec3::Y);

        assert!(
            settings
                .directional
                .shadow_frustum
                .encloses(&light, settings.mirror.corners())
        );
    }

    #[test]
    fn test_shadow_frustum_rejects_far_receivers() {
        let frustum = ShadowFrustum {
            left: -10.0,
            right: 10.0,
            top: 10.0,
            bottom: -10.0,
            near: 0.0,
            far: 50.0,
        };
        let light = Transform::from_xyz(0.0, 20.0, 0.0).looking_at(Vec3::ZERO, Vec3::Z);

        assert!(frustum.encloses(&light, [Vec3::ZERO, Vec3::new(9.0, 0.0, -9.0)]));
        // outside the side planes
        assert!(!frustum.encloses(&light, [Vec3::new(11.0, 0.0, 0.0)]));
        // beyond the far plane
        assert!(!frustum.encloses(&light, [Vec3::new(0.0, -40.0, 0.0)]));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SceneSettings::load(&dir.path().join("absent.settings.ron")).unwrap();
        assert_eq!(settings, SceneSettings::default());
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.settings.ron");
        std::fs::write(&path, "(camera: (fov_degrees: ))").unwrap();

        let err = SceneSettings::load(&path).unwrap_err();
        assert!(matches!(err, SceneError::Parse { .. }));
        assert!(err.to_string().contains("broken.settings.ron"));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.settings.ron");
        std::fs::write(&path, "(camera: (fov_degrees: 190.0))").unwrap();

        assert!(matches!(
            SceneSettings::load(&path),
            Err(SceneError::InvalidSettings(_))
        ));
    }
}
