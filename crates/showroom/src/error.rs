use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("io error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("failed to load asset {path}: {reason}")]
    AssetLoad { path: String, reason: String },
}
