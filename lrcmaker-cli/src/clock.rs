//! Wall-clock stand-in for an audio player.
//!
//! Tracks a play position against the tokio clock without decoding any
//! audio, for timing along with a song playing in another application. The
//! end of the track is detected by a timer task, which reports it through the
//! engine's [`EndOfTrackNotifier`].

use lrcmaker_core::{CoreError, DurationExt, EndOfTrackNotifier, Playback, PlaybackOpener, Result};
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

const LOG_TARGET: &str = "lrcmaker::clock";

/// Opens a [`ClockPlayback`] of a fixed length for any existing audio file
pub struct ClockOpener {
    length_ms: u64,
}

impl ClockOpener {
    /// `length_ms` of `0` means the track length is unknown
    #[must_use]
    pub const fn new(length_ms: u64) -> Self {
        Self { length_ms }
    }
}

impl PlaybackOpener for ClockOpener {
    fn open(&self, audio_path: &Path, on_end: EndOfTrackNotifier) -> Result<Box<dyn Playback>> {
        if !audio_path.is_file() {
            return Err(CoreError::PlaybackUnavailable {
                reason: format!("{} is not a file", audio_path.display()),
            });
        }
        Ok(Box::new(ClockPlayback::new(self.length_ms, on_end)))
    }
}

pub struct ClockPlayback {
    length_ms: u64,
    /// Position at the moment playback last started or was seeked
    anchor_ms: u64,
    /// Set while playing
    started_at: Option<Instant>,
    end_timer: Option<JoinHandle<()>>,
    on_end: EndOfTrackNotifier,
}

impl ClockPlayback {
    #[must_use]
    pub const fn new(length_ms: u64, on_end: EndOfTrackNotifier) -> Self {
        Self {
            length_ms,
            anchor_ms: 0,
            started_at: None,
            end_timer: None,
            on_end,
        }
    }

    fn clamp(&self, position_ms: u64) -> u64 {
        if self.length_ms > 0 {
            position_ms.min(self.length_ms)
        } else {
            position_ms
        }
    }

    fn cancel_end_timer(&mut self) {
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }

    /// Schedule the end-of-track report for the remaining play time
    fn arm_end_timer(&mut self) {
        self.cancel_end_timer();
        if self.length_ms == 0 {
            return;
        }
        let remaining = Duration::from_millis(self.length_ms.saturating_sub(self.anchor_ms));
        let on_end = self.on_end.clone();
        self.end_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            on_end.notify();
        }));
    }

    /// Fold elapsed play time into the anchor
    fn settle(&mut self) {
        self.anchor_ms = self.position_ms();
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }
}

impl Playback for ClockPlayback {
    fn play(&mut self) {
        if self.started_at.is_some() {
            return;
        }
        self.started_at = Some(Instant::now());
        self.arm_end_timer();
        debug!(target: LOG_TARGET, "Playing from {}ms", self.anchor_ms);
    }

    fn pause(&mut self) {
        self.settle();
        self.started_at = None;
        self.cancel_end_timer();
    }

    fn stop(&mut self) {
        self.pause();
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some()
    }

    fn position_ms(&self) -> u64 {
        let elapsed = self
            .started_at
            .map_or(0, |started| started.elapsed().as_millis_u64());
        self.clamp(self.anchor_ms.saturating_add(elapsed))
    }

    fn length_ms(&self) -> u64 {
        self.length_ms
    }

    fn seek(&mut self, position_ms: u64) {
        self.settle();
        self.anchor_ms = self.clamp(position_ms);
        if self.is_playing() {
            self.arm_end_timer();
        }
    }
}

impl Drop for ClockPlayback {
    fn drop(&mut self) {
        self.cancel_end_timer();
    }
}
