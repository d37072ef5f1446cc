use app::{AppBuilder, Application, BoxError};
use bevy::{log::LogPlugin, prelude::*};
use showroom::{LOG_SCENE, SceneSettings, ShowroomPlugin};

/// Showroom client application.
struct ShowroomApp;

impl Application for ShowroomApp {
    const APP_ID: &'static str = "showroom";
}

fn main() -> Result<(), BoxError> {
    let mut showroom = AppBuilder::<ShowroomApp>::new(env!("CARGO_PKG_VERSION"))?
        .build_with_bevy(|mut app, ctx| {
            let settings = SceneSettings::load(&ctx.path_context().settings_file())?;

            // Logging läuft über den tracing-Subscriber aus dem AppBuilder
            app.add_plugins(
                DefaultPlugins
                    .build()
                    .disable::<LogPlugin>()
                    .set(WindowPlugin {
                        primary_window: Some(Window {
                            title: "Showroom".to_string(),
                            ..default()
                        }),
                        ..default()
                    }),
            )
            .add_plugins(ShowroomPlugin::new(settings));

            Ok(app)
        })?;

    info!(target: LOG_SCENE, "starting showroom {}", showroom.context().version());
    match showroom.run() {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => Err(format!("showroom exited with code {code}").into()),
    }
}
