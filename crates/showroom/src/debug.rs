use crate::lighting::{AreaLight, KeyLight};
use crate::settings::SceneSettings;
use bevy::color::palettes::css::{GRAY, YELLOW};
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

/// Plugin for gizmo helpers: world axes, a floor grid and light outlines.
pub struct DebugHelpersPlugin;

impl Plugin for DebugHelpersPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugHelpers>()
            .add_systems(Startup, init_debug_helpers)
            .add_systems(Update, (toggle_debug_helpers, draw_debug_helpers).chain());
    }
}

#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DebugHelpers {
    pub axes: bool,
    pub grid: bool,
    pub lights: bool,
}

impl DebugHelpers {
    pub fn any(&self) -> bool {
        self.axes || self.grid || self.lights
    }

    /// Hides everything if anything is shown, otherwise shows everything.
    pub fn toggle(&mut self) {
        let show = !self.any();
        *self = Self {
            axes: show,
            grid: show,
            lights: show,
        };
    }
}

fn init_debug_helpers(mut helpers: ResMut<DebugHelpers>, settings: Res<SceneSettings>) {
    *helpers = DebugHelpers {
        axes: settings.debug.axes,
        grid: settings.debug.grid,
        lights: settings.debug.lights,
    };
}

fn toggle_debug_helpers(keys: Res<ButtonInput<KeyCode>>, mut helpers: ResMut<DebugHelpers>) {
    if keys.just_pressed(KeyCode::F3) {
        helpers.toggle();
    }
}

fn draw_debug_helpers(
    mut gizmos: Gizmos,
    helpers: Res<DebugHelpers>,
    settings: Res<SceneSettings>,
    area_lights: Query<(&GlobalTransform, &AreaLight)>,
    key_lights: Query<&GlobalTransform, With<KeyLight>>,
) {
    let debug = &settings.debug;

    if helpers.axes {
        gizmos.axes(Transform::IDENTITY, debug.axes_length);
    }

    if helpers.grid {
        let divisions = debug.grid_divisions.max(1);
        gizmos.grid(
            Isometry3d::from_rotation(Quat::from_rotation_x(FRAC_PI_2)),
            UVec2::splat(divisions),
            Vec2::splat(debug.grid_size / divisions as f32),
            GRAY,
        );
    }

    if helpers.lights {
        for (transform, light) in &area_lights {
            let (_, rotation, translation) = transform.to_scale_rotation_translation();
            gizmos.rect(Isometry3d::new(translation, rotation), light.size, light.color);
        }
        for transform in &key_lights {
            let start = transform.translation();
            gizmos.arrow(start, start + *transform.forward() * 20.0, YELLOW);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_shows_all_when_hidden() {
        let mut helpers = DebugHelpers::default();
        helpers.toggle();
        assert_eq!(
            helpers,
            DebugHelpers {
                axes: true,
                grid: true,
                lights: true
            }
        );
    }

    #[test]
    fn test_toggle_hides_all_when_any_shown() {
        let mut helpers = DebugHelpers {
            grid: true,
            ..default()
        };
        helpers.toggle();
        assert!(!helpers.any());
    }
}
