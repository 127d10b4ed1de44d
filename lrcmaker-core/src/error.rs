use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created with default settings.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Session errors
    #[error("Lyric source {path} has no usable lines")]
    EmptySource { path: PathBuf },

    #[error("Malformed timestamp {input:?}, expected MM:SS.CC")]
    MalformedTimestamp { input: String },

    #[error("Row {index} is out of range for a session of {len} lines")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Nothing to export, the session has no lines")]
    EmptySession,

    // Playback errors
    #[error("No playback target is loaded")]
    NoPlaybackTarget,

    #[error("Playback could not be opened: {reason}")]
    PlaybackUnavailable { reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
