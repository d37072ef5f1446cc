use paths::PathContext;
use std::marker::PhantomData;
#[cfg(debug_assertions)]
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{
    Layer, filter::LevelFilter, filter::filter_fn, fmt, layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Targets that flood the console at INFO; only their warnings and errors pass.
const NOISY_TARGETS: &[&str] = &["wgpu", "naga", "gilrs", "cosmic_text"];

/// Application infrastructure context.
///
/// Contains path management, version info, and logging infrastructure.
pub struct AppContext {
    pub path_context: PathContext,
    pub version: &'static str,
    /// The log guard must be kept alive for the duration of the application
    /// to ensure log messages are properly flushed.
    _log_guard: tracing_appender::non_blocking::WorkerGuard,
}

impl AppContext {
    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn path_context(&self) -> &PathContext {
        &self.path_context
    }
}

/// Application metadata trait.
///
/// Define your application's identity by implementing this trait.
pub trait Application: Sized + 'static {
    const APP_ID: &'static str;
    const STUDIO: &'static str = "scenes";
    const PROJECT_ID: &'static str = "showroom";
}

/// Builder for creating applications with proper initialization.
pub struct AppBuilder<A: Application> {
    context: AppContext,
    _marker: PhantomData<A>,
}

impl<A: Application> AppBuilder<A> {
    /// Create a new application builder.
    ///
    /// This performs all the common initialization:
    /// - Sets up path context (platform-specific directories)
    /// - Ensures all directories exist
    /// - Initializes logging (file + console)
    pub fn new(version: &'static str) -> Result<Self, BoxError> {
        #[cfg(debug_assertions)]
        let path_context = PathContext::with_base_path(
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("..")
                .join("..")
                .join(".out"),
            A::STUDIO,
            A::PROJECT_ID,
            A::APP_ID,
        );
        #[cfg(not(debug_assertions))]
        let path_context = PathContext::new(A::STUDIO, A::PROJECT_ID, A::APP_ID);

        path_context.ensure_directories()?;

        let log_file_path = path_context.log_file_now();
        let log_dir = log_file_path
            .parent()
            .ok_or("log file path has no parent directory")?;
        let log_filename = log_file_path
            .file_name()
            .ok_or("log file path has no file name")?;

        let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        #[cfg(debug_assertions)]
        let level = LevelFilter::INFO;

        #[cfg(not(debug_assertions))]
        let level = LevelFilter::WARN;

        // Separate layer: file (non-blocking) + console (stdout)
        let file_layer = fmt::Layer::default()
            .with_target(true)
            .with_ansi(false)
            .with_writer(non_blocking)
            .with_filter(filter_fn(move |metadata| {
                passes(metadata.target(), metadata.level(), level)
            }));

        let console_layer = fmt::Layer::default()
            .with_target(true)
            .with_filter(filter_fn(move |metadata| {
                passes(metadata.target(), metadata.level(), level)
            }));

        tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer)
            .try_init()?;

        tracing::info!(
            app = A::APP_ID,
            version,
            log = %log_file_path.display(),
            "logging initialized"
        );

        Ok(Self {
            context: AppContext {
                path_context,
                version,
                _log_guard: guard,
            },
            _marker: PhantomData,
        })
    }

    /// Build a Bevy-based application.
    ///
    /// The `configure` callback receives the Bevy `App` by value and the `AppContext`,
    /// and must return the configured App. Fallible configuration (settings files)
    /// is propagated to the caller.
    pub fn build_with_bevy(
        self,
        configure: impl FnOnce(bevy::prelude::App, &AppContext) -> Result<bevy::prelude::App, BoxError>,
    ) -> Result<BevyApp<A>, BoxError> {
        let bevy_app = bevy::prelude::App::new();
        let configured_app = configure(bevy_app, &self.context)?;

        Ok(BevyApp {
            context: self.context,
            app: configured_app,
            _marker: PhantomData,
        })
    }
}

fn passes(target: &str, level: &Level, max: LevelFilter) -> bool {
    let noisy = NOISY_TARGETS.iter().any(|noisy| target.starts_with(noisy));
    if noisy {
        *level <= Level::WARN
    } else {
        *level <= max
    }
}

/// Bevy-based application wrapper.
///
/// Contains both the infrastructure context and the Bevy App.
/// The context is kept alive to ensure logging continues working.
pub struct BevyApp<A: Application> {
    pub context: AppContext,
    pub app: bevy::prelude::App,
    _marker: PhantomData<A>,
}

impl<A: Application> BevyApp<A> {
    /// Run the Bevy application until the window closes.
    pub fn run(&mut self) -> bevy::app::AppExit {
        self.app.run()
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noisy_targets_are_capped_at_warn() {
        assert!(!passes("wgpu_core::device", &Level::INFO, LevelFilter::INFO));
        assert!(passes("wgpu_core::device", &Level::WARN, LevelFilter::INFO));
        assert!(passes("showroom/scene", &Level::INFO, LevelFilter::INFO));
    }

    #[test]
    fn test_level_filter_applies_to_own_targets() {
        assert!(!passes("showroom/scene", &Level::INFO, LevelFilter::WARN));
        assert!(passes("showroom/scene", &Level::ERROR, LevelFilter::WARN));
    }

    struct Viewer;

    impl Application for Viewer {
        const APP_ID: &'static str = "viewer";
    }

    #[test]
    fn test_default_identity_places_files_under_showroom() {
        let ctx = PathContext::with_base_path(
            PathBuf::from("/base"),
            Viewer::STUDIO,
            Viewer::PROJECT_ID,
            Viewer::APP_ID,
        );
        assert_eq!(
            ctx.settings_file(),
            PathBuf::from("/base/scenes/showroom/viewer.settings.ron")
        );
    }
}
