//! Asynchronous model loading.
//!
//! Every configured model is requested at startup. A model's scene is only
//! attached to the world once its load has completed; loads finish in any
//! order and independently of each other, and the frame loop never waits on
//! them.

use crate::LOG_ASSETS;
use crate::error::SceneError;
use crate::settings::{ModelSpec, SceneSettings};
use bevy::asset::{DependencyLoadState, LoadState, RecursiveDependencyLoadState};
use bevy::prelude::*;
use std::collections::HashMap;

pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<ScenePhase>()
            .init_resource::<PendingModels>()
            .init_resource::<PreloadedModels>()
            .add_systems(Startup, request_models)
            .add_systems(Update, splice_loaded_models);
    }
}

/// Whether model loads are still outstanding. Rendering runs in both phases.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScenePhase {
    #[default]
    Loading,
    Steady,
}

#[derive(Debug, Clone)]
pub struct PendingModel {
    pub spec: ModelSpec,
    pub handle: Handle<Scene>,
}

/// Models requested but not yet attached to the scene.
#[derive(Resource, Debug, Default)]
pub struct PendingModels(Vec<PendingModel>);

impl PendingModels {
    pub fn push(&mut self, model: PendingModel) {
        self.0.push(model);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Loaded models kept in the asset cache without being placed in the scene.
#[derive(Resource, Debug, Default)]
pub struct PreloadedModels(HashMap<String, Handle<Scene>>);

impl PreloadedModels {
    pub fn get(&self, name: &str) -> Option<&Handle<Scene>> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Root of a model's scene once it is part of the world.
#[derive(Component, Debug)]
pub struct LoadedModel {
    pub name: String,
}

#[derive(Debug, PartialEq)]
enum Readiness {
    Pending,
    Ready,
    Failed(String),
}

type LoadStates = (LoadState, DependencyLoadState, RecursiveDependencyLoadState);

/// `states` is `None` for handles the asset server does not track.
fn readiness(states: Option<LoadStates>, in_assets: bool) -> Readiness {
    match states {
        Some((LoadState::Failed(err), _, _)) => Readiness::Failed(err.to_string()),
        Some((_, _, RecursiveDependencyLoadState::Failed(err))) => {
            Readiness::Failed(format!("dependency failed: {err}"))
        }
        Some((LoadState::Loaded, _, RecursiveDependencyLoadState::Loaded)) => Readiness::Ready,
        Some(_) => Readiness::Pending,
        // Assets inserted directly, without going through the server
        None if in_assets => Readiness::Ready,
        None => Readiness::Pending,
    }
}

fn request_models(
    mut pending: ResMut<PendingModels>,
    asset_server: Res<AssetServer>,
    settings: Res<SceneSettings>,
) {
    for spec in &settings.models {
        let handle = asset_server.load(GltfAssetLabel::Scene(0).from_asset(spec.path.clone()));
        info!(
            target: LOG_ASSETS,
            "requested model '{}' from {}", spec.name, spec.path
        );
        pending.push(PendingModel {
            spec: spec.clone(),
            handle,
        });
    }
}

/// Attaches every model whose load completed since the last frame and drops
/// the ones that failed.
pub fn splice_loaded_models(
    mut commands: Commands,
    mut pending: ResMut<PendingModels>,
    mut preloaded: ResMut<PreloadedModels>,
    scenes: Res<Assets<Scene>>,
    asset_server: Option<Res<AssetServer>>,
    phase: Res<State<ScenePhase>>,
    mut next_phase: ResMut<NextState<ScenePhase>>,
) {
    let asset_server = asset_server.as_deref();

    pending.0.retain(|model| {
        let states = asset_server.and_then(|server| server.get_load_states(&model.handle));
        match readiness(states, scenes.contains(&model.handle)) {
            Readiness::Pending => true,
            Readiness::Ready => {
                attach(&mut commands, &mut preloaded, model);
                false
            }
            Readiness::Failed(reason) => {
                let err = SceneError::AssetLoad {
                    path: model.spec.path.clone(),
                    reason,
                };
                error!(target: LOG_ASSETS, "model '{}': {err}", model.spec.name);
                false
            }
        }
    });

    if pending.is_empty() && *phase.get() == ScenePhase::Loading {
        info!(target: LOG_ASSETS, "all model loads settled");
        next_phase.set(ScenePhase::Steady);
    }
}

fn attach(commands: &mut Commands, preloaded: &mut PreloadedModels, model: &PendingModel) {
    let spec = &model.spec;
    if !spec.spawn {
        info!(target: LOG_ASSETS, "model '{}' loaded (not spawned)", spec.name);
        preloaded.0.insert(spec.name.clone(), model.handle.clone());
        return;
    }

    commands.spawn((
        SceneRoot(model.handle.clone()),
        Transform::from_translation(Vec3::from_array(spec.translation))
            .with_scale(Vec3::splat(spec.scale)),
        LoadedModel {
            name: spec.name.clone(),
        },
        Name::new(spec.name.clone()),
    ));
    info!(target: LOG_ASSETS, "model '{}' added to the scene", spec.name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::asset::AssetLoadError;
    use bevy::asset::io::AssetReaderError;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn not_found(path: &str) -> Arc<AssetLoadError> {
        Arc::new(AssetReaderError::NotFound(PathBuf::from(path)).into())
    }

    #[test]
    fn test_untracked_assets_are_ready_once_inserted() {
        assert_eq!(readiness(None, false), Readiness::Pending);
        assert_eq!(readiness(None, true), Readiness::Ready);
    }

    #[test]
    fn test_ready_needs_dependencies_loaded() {
        let loading = (
            LoadState::Loaded,
            DependencyLoadState::Loading,
            RecursiveDependencyLoadState::Loading,
        );
        assert_eq!(readiness(Some(loading), true), Readiness::Pending);

        let loaded = (
            LoadState::Loaded,
            DependencyLoadState::Loaded,
            RecursiveDependencyLoadState::Loaded,
        );
        assert_eq!(readiness(Some(loaded), true), Readiness::Ready);
    }

    #[test]
    fn test_failed_texture_fails_the_model() {
        let states = (
            LoadState::Loaded,
            DependencyLoadState::Failed(not_found("textures/paint.png")),
            RecursiveDependencyLoadState::Failed(not_found("textures/paint.png")),
        );
        let Readiness::Failed(reason) = readiness(Some(states), true) else {
            panic!("expected failure");
        };
        assert!(reason.contains("paint.png"));
    }

    #[test]
    fn test_failed_root_fails_the_model() {
        let states = (
            LoadState::Failed(not_found("models/gltf/car.glb")),
            DependencyLoadState::NotLoaded,
            RecursiveDependencyLoadState::NotLoaded,
        );
        assert!(matches!(
            readiness(Some(states), false),
            Readiness::Failed(_)
        ));
    }

    #[test]
    fn test_pending_models_len() {
        let mut pending = PendingModels::default();
        assert!(pending.is_empty());
        pending.push(PendingModel {
            spec: SceneSettings::default().models[0].clone(),
            handle: Handle::default(),
        });
        assert_eq!(pending.len(), 1);
    }
}
