//! The playback collaborator contract.
//!
//! Audio decoding and output live outside this crate. The engine talks to
//! whatever plays the song through [`Playback`], and obtains one per loaded
//! song through a [`PlaybackOpener`].

use crate::engine::EngineCommand;
use crate::error::Result;
use crate::time::{format_length, format_timestamp};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::debug;

const LOG_TARGET: &str = "lrcmaker::playback";

/// A point-in-time reading of the playback collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackSample {
    pub position_ms: u64,
    /// Track length, `0` when not yet known
    pub length_ms: u64,
    pub is_playing: bool,
}

impl PlaybackSample {
    /// Position display text, `MM:SS.CC / MM:SS`, or just the position when
    /// the length is unknown
    #[must_use]
    pub fn display(&self) -> String {
        let position = format_timestamp(self.position_ms);
        if self.length_ms > 0 {
            format!("{position} / {}", format_length(self.length_ms))
        } else {
            position
        }
    }
}

/// Controls for the song being timed.
///
/// Every call is a fire-and-forget request; none may block.
pub trait Playback: Send {
    fn play(&mut self);

    fn pause(&mut self);

    /// Stop playback; the position is left wherever the implementation puts it
    fn stop(&mut self);

    fn is_playing(&self) -> bool;

    fn position_ms(&self) -> u64;

    /// Track length in milliseconds, `0` if unknown
    fn length_ms(&self) -> u64;

    fn seek(&mut self, position_ms: u64);

    /// Sample position, length and play state together
    fn sample(&self) -> PlaybackSample {
        PlaybackSample {
            position_ms: self.position_ms(),
            length_ms: self.length_ms(),
            is_playing: self.is_playing(),
        }
    }
}

/// Opens a [`Playback`] for an audio file.
pub trait PlaybackOpener: Send {
    /// Open `audio_path`. The returned playback must report the end of the
    /// track through `on_end`, from whatever thread it detects it on.
    ///
    /// # Errors
    ///
    /// Returns an error if the audio cannot be opened.
    fn open(&self, audio_path: &Path, on_end: EndOfTrackNotifier) -> Result<Box<dyn Playback>>;
}

/// Handle a playback uses to report that its track ended.
///
/// The notification is queued for the engine rather than acted on in place,
/// so session state is only ever touched from the engine's own context.
/// Each notifier is tied to the song it was created for; the engine ignores
/// reports from a song that has since been replaced.
#[derive(Debug, Clone)]
pub struct EndOfTrackNotifier {
    commands: mpsc::UnboundedSender<EngineCommand>,
    generation: u64,
}

impl EndOfTrackNotifier {
    pub(crate) fn new(commands: mpsc::UnboundedSender<EngineCommand>, generation: u64) -> Self {
        Self {
            commands,
            generation,
        }
    }

    /// Report that the end of the track was reached. Safe to call from any
    /// thread; returns `false` if the engine has shut down.
    pub fn notify(&self) -> bool {
        debug!(
            target: LOG_TARGET,
            "End of track reported for playback #{}", self.generation
        );
        self.commands
            .send(EngineCommand::TrackFinished {
                generation: self.generation,
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_display_with_length() {
        let sample = PlaybackSample {
            position_ms: 65_432,
            length_ms: 215_990,
            is_playing: true,
        };
        assert_eq!(sample.display(), "01:05.43 / 03:35");
    }

    #[test]
    fn test_sample_display_unknown_length() {
        let sample = PlaybackSample {
            position_ms: 1_000,
            length_ms: 0,
            is_playing: false,
        };
        assert_eq!(sample.display(), "00:01.00");
    }

    #[test]
    fn test_notifier_queues_command() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = EndOfTrackNotifier::new(tx, 7);

        let sender = notifier.clone();
        std::thread::spawn(move || sender.notify()).join().unwrap();

        assert!(matches!(
            rx.try_recv(),
            Ok(EngineCommand::TrackFinished { generation: 7 })
        ));
    }

    #[test]
    fn test_notifier_after_shutdown() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        assert!(!EndOfTrackNotifier::new(tx, 1).notify());
    }
}
