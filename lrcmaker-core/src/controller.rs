//! Timing commands applied to a [`LyricSession`].
//!
//! The controller keeps no session state of its own. Each command takes the
//! session (and playback, where it needs one) by reference and runs to
//! completion; the caller decides when commands happen.

use crate::config::TimingConfig;
use crate::error::Result;
use crate::playback::Playback;
use crate::session::LyricSession;
use tracing::{debug, info};

const LOG_TARGET: &str = "lrcmaker::controller";

/// Where a timing session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No session loaded
    Idle,
    /// Session loaded, playback paused
    Ready,
    /// Playback running
    Armed,
    /// End of track observed
    Completed,
}

impl ControllerState {
    /// Derive the state from the session and playback currently held.
    #[must_use]
    pub fn observe(session: Option<&LyricSession>, playback: Option<&dyn Playback>) -> Self {
        let Some(session) = session else {
            return Self::Idle;
        };
        if session.track_finished() {
            Self::Completed
        } else if playback.is_some_and(|p| p.is_playing()) {
            Self::Armed
        } else {
            Self::Ready
        }
    }
}

/// Applies row stamping and playback navigation commands.
#[derive(Debug, Clone, Copy)]
pub struct TimingController {
    rewind_offset_ms: u64,
}

impl Default for TimingController {
    fn default() -> Self {
        Self::new(&TimingConfig::default())
    }
}

impl TimingController {
    #[must_use]
    pub const fn new(config: &TimingConfig) -> Self {
        Self {
            rewind_offset_ms: config.rewind_offset_ms,
        }
    }

    /// Stamp the current row with `sample_ms` and move to the next one.
    ///
    /// Returns the stamped row. Once every row is stamped this is a no-op
    /// returning `None`; rapid repeated taps land here.
    pub fn advance_row(&self, session: &mut LyricSession, sample_ms: u64) -> Option<usize> {
        let stamped = session.stamp_current(sample_ms);
        match stamped {
            Some(index) => debug!(target: LOG_TARGET, "Stamped row {} at {}ms", index, sample_ms),
            None => debug!(target: LOG_TARGET, "Advance ignored, all rows stamped"),
        }
        stamped
    }

    /// Step back one row and clear its timestamp so it can be captured again.
    ///
    /// Returns the cleared row, or `None` when already at the first row.
    pub fn retime_previous_row(&self, session: &mut LyricSession) -> Option<usize> {
        let cleared = session.unstamp_previous();
        if let Some(index) = cleared {
            debug!(target: LOG_TARGET, "Cleared row {} for retiming", index);
        }
        cleared
    }

    /// Seek playback to the start of the most recently stamped row.
    ///
    /// Returns the seek target, or `None` when there is no previous row or it
    /// has no timestamp. The session is not modified.
    pub fn replay_line(&self, session: &LyricSession, playback: &mut dyn Playback) -> Option<u64> {
        let target = session.previous_timestamp()?;
        playback.seek(target);
        debug!(target: LOG_TARGET, "Replaying previous row from {}ms", target);
        Some(target)
    }

    /// Seek back by the configured rewind offset, stopping at zero.
    pub fn rewind(&self, playback: &mut dyn Playback) -> u64 {
        self.rewind_by(playback, self.rewind_offset_ms)
    }

    /// Seek back by `offset_ms`, stopping at zero. Returns the seek target.
    pub fn rewind_by(&self, playback: &mut dyn Playback, offset_ms: u64) -> u64 {
        let target = playback.position_ms().saturating_sub(offset_ms);
        playback.seek(target);
        debug!(target: LOG_TARGET, "Rewound {}ms to {}ms", offset_ms, target);
        target
    }

    /// Seek to an absolute position, clamped to the track length when known.
    pub fn seek(&self, playback: &mut dyn Playback, position_ms: u64) -> u64 {
        let length = playback.length_ms();
        let target = if length > 0 {
            position_ms.min(length)
        } else {
            position_ms
        };
        playback.seek(target);
        target
    }

    /// Flip whether a final timestamp line is appended when the track ends.
    pub fn toggle_end_marker(&self, session: &mut LyricSession) -> bool {
        let enabled = session.toggle_append_final_timestamp();
        info!(
            target: LOG_TARGET,
            "Final timestamp {}",
            if enabled { "on" } else { "off" }
        );
        enabled
    }

    /// Make `index` the next row to stamp. Timestamps are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfRange`](crate::CoreError::IndexOutOfRange)
    /// unless `index` is between 0 and the number of rows inclusive.
    pub fn select_row(&self, session: &mut LyricSession, index: usize) -> Result<()> {
        session.set_current_index(index)?;
        debug!(target: LOG_TARGET, "Selected row {}", index);
        Ok(())
    }

    /// Pause when playing, play otherwise. Returns whether playback is now
    /// running. Starting playback leaves the completed state.
    pub fn toggle_play(&self, session: &mut LyricSession, playback: &mut dyn Playback) -> bool {
        if playback.is_playing() {
            playback.pause();
            false
        } else {
            session.set_track_finished(false);
            playback.play();
            true
        }
    }

    /// Handle the end of the track.
    ///
    /// With the final timestamp enabled and a known length, an empty row
    /// stamped at `length_ms` is appended, unless the last row already has
    /// exactly that timestamp. Returns whether a row was appended.
    pub fn on_track_finished(&self, session: &mut LyricSession, length_ms: u64) -> bool {
        session.set_track_finished(true);

        if !session.append_final_timestamp() || length_ms == 0 {
            info!(target: LOG_TARGET, "Track finished");
            return false;
        }

        let appended = session.push_end_marker(length_ms);
        info!(
            target: LOG_TARGET,
            "Track finished at {}ms, final timestamp {}",
            length_ms,
            if appended { "appended" } else { "already present" }
        );
        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::path::Path;

    #[derive(Default)]
    struct FakePlayback {
        playing: bool,
        position: u64,
        length: u64,
        seeks: Vec<u64>,
    }

    impl Playback for FakePlayback {
        fn play(&mut self) {
            self.playing = true;
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn stop(&mut self) {
            self.playing = false;
        }
        fn is_playing(&self) -> bool {
            self.playing
        }
        fn position_ms(&self) -> u64 {
            self.position
        }
        fn length_ms(&self) -> u64 {
            self.length
        }
        fn seek(&mut self, position_ms: u64) {
            self.position = position_ms;
            self.seeks.push(position_ms);
        }
    }

    fn session(text: &str) -> LyricSession {
        LyricSession::from_text(text, Path::new("/music/song.txt"), true).unwrap()
    }

    #[test]
    fn test_advance_through_all_rows() {
        let controller = TimingController::default();
        let mut s = session("a\nb\nc");

        for (i, t) in [100, 200, 300].into_iter().enumerate() {
            assert_eq!(controller.advance_row(&mut s, t), Some(i));
        }
        assert_eq!(s.current_index(), 3);

        assert_eq!(controller.advance_row(&mut s, 400), None);
        assert_eq!(s.current_index(), 3);
        assert_eq!(s.lines()[2].timestamp, Some(300));
    }

    #[test]
    fn test_advance_then_retime_restores_row() {
        let controller = TimingController::default();
        let mut s = session("a\nb");
        controller.advance_row(&mut s, 100);

        controller.advance_row(&mut s, 250);
        assert_eq!(controller.retime_previous_row(&mut s), Some(1));
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.lines()[1].timestamp, None);
        assert_eq!(s.lines()[0].timestamp, Some(100));
    }

    #[test]
    fn test_retime_at_first_row_is_noop() {
        let controller = TimingController::default();
        let mut s = session("a");
        assert_eq!(controller.retime_previous_row(&mut s), None);
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn test_replay_line_seeks_to_previous_stamp() {
        let controller = TimingController::default();
        let mut s = session("a\nb");
        let mut playback = FakePlayback::default();

        assert_eq!(controller.replay_line(&s, &mut playback), None);

        controller.advance_row(&mut s, 4_560);
        assert_eq!(controller.replay_line(&s, &mut playback), Some(4_560));
        assert_eq!(playback.seeks, vec![4_560]);
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn test_replay_line_skips_unstamped_previous_row() {
        let controller = TimingController::default();
        let mut s = session("a\nb");
        controller.select_row(&mut s, 1).unwrap();

        let mut playback = FakePlayback::default();
        assert_eq!(controller.replay_line(&s, &mut playback), None);
        assert!(playback.seeks.is_empty());
    }

    #[test]
    fn test_rewind_clamps_at_zero() {
        let controller = TimingController::default();
        let mut playback = FakePlayback {
            position: 12_000,
            ..Default::default()
        };

        assert_eq!(controller.rewind(&mut playback), 7_000);
        assert_eq!(controller.rewind_by(&mut playback, 3_000), 4_000);
        assert_eq!(controller.rewind(&mut playback), 0);
    }

    #[test]
    fn test_seek_clamps_to_known_length() {
        let controller = TimingController::default();
        let mut playback = FakePlayback {
            length: 10_000,
            ..Default::default()
        };
        assert_eq!(controller.seek(&mut playback, 25_000), 10_000);

        let mut unknown = FakePlayback::default();
        assert_eq!(controller.seek(&mut unknown, 25_000), 25_000);
    }

    #[test]
    fn test_select_row_bounds() {
        let controller = TimingController::default();
        let mut s = session("a\nb");
        controller.select_row(&mut s, 2).unwrap();
        assert_eq!(s.current_index(), 2);

        let err = controller.select_row(&mut s, 5).unwrap_err();
        assert!(matches!(err, CoreError::IndexOutOfRange { index: 5, len: 2 }));
        assert_eq!(s.current_index(), 2);
    }

    #[test]
    fn test_track_finished_appends_once() {
        let controller = TimingController::default();
        let mut s = session("a");
        controller.advance_row(&mut s, 100);

        assert!(controller.on_track_finished(&mut s, 180_000));
        assert!(!controller.on_track_finished(&mut s, 180_000));
        assert_eq!(s.len(), 2);
        assert_eq!(s.lines()[1].text, "");
        assert_eq!(s.lines()[1].timestamp, Some(180_000));
    }

    #[test]
    fn test_track_finished_unknown_length() {
        let controller = TimingController::default();
        let mut s = session("a");
        assert!(!controller.on_track_finished(&mut s, 0));
        assert_eq!(s.len(), 1);
        assert!(s.track_finished());
    }

    #[test]
    fn test_track_finished_with_marker_disabled() {
        let controller = TimingController::default();
        let mut s = session("a");
        assert!(!controller.toggle_end_marker(&mut s));
        assert!(!controller.on_track_finished(&mut s, 180_000));
        assert_eq!(s.len(), 1);
        assert!(controller.toggle_end_marker(&mut s));
    }

    #[test]
    fn test_state_transitions() {
        let controller = TimingController::default();
        assert_eq!(ControllerState::observe(None, None), ControllerState::Idle);

        let mut s = session("a");
        let mut playback = FakePlayback::default();
        assert_eq!(
            ControllerState::observe(Some(&s), Some(&playback)),
            ControllerState::Ready
        );

        assert!(controller.toggle_play(&mut s, &mut playback));
        assert_eq!(
            ControllerState::observe(Some(&s), Some(&playback)),
            ControllerState::Armed
        );

        controller.on_track_finished(&mut s, 1_000);
        playback.stop();
        assert_eq!(
            ControllerState::observe(Some(&s), Some(&playback)),
            ControllerState::Completed
        );

        assert!(controller.toggle_play(&mut s, &mut playback));
        assert_eq!(
            ControllerState::observe(Some(&s), Some(&playback)),
            ControllerState::Armed
        );

        assert!(!controller.toggle_play(&mut s, &mut playback));
        assert_eq!(
            ControllerState::observe(Some(&s), Some(&playback)),
            ControllerState::Ready
        );
    }
}
