pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod lrc;
pub mod paths;
pub mod playback;
pub mod scanner;
pub mod session;
pub mod time;

pub use config::{LoggingConfig, LrcMakerConfig, ScannerConfig, TimingConfig};
pub use controller::{ControllerState, TimingController};
pub use engine::{Engine, EngineCommand, EngineEvent, EngineHandle};
pub use error::{CoreError, Result};
pub use paths::log_file_path;
pub use playback::{EndOfTrackNotifier, Playback, PlaybackOpener, PlaybackSample};
pub use scanner::{CandidatePair, FolderScanner};
pub use session::{LyricLine, LyricSession};
pub use time::{format_timestamp, parse_timestamp, DurationExt, UNSET_TIMESTAMP};
