//! Single-context command dispatch.
//!
//! The [`Engine`] owns the session and the playback for the loaded song.
//! Every change to either arrives as an [`EngineCommand`] over one channel
//! and is applied to completion before the next command is read, whether it
//! came from the user, the host's tick timer, or a playback thread reporting
//! the end of the track. Outcomes are broadcast as [`EngineEvent`]s.

use crate::config::TimingConfig;
use crate::controller::{ControllerState, TimingController};
use crate::error::{CoreError, Result};
use crate::lrc;
use crate::playback::{EndOfTrackNotifier, Playback, PlaybackOpener, PlaybackSample};
use crate::session::{LyricLine, LyricSession};
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lrcmaker::engine";

/// Requests the engine applies one at a time
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Replace the session with a lyric file and open its audio
    Load {
        lyric_path: PathBuf,
        audio_path: PathBuf,
    },
    /// Stamp the current row with the playback position
    Advance,
    /// Clear the previous row's timestamp and step back to it
    RetimePrevious,
    /// Seek to the previous row's timestamp
    ReplayLine,
    /// Seek back by the configured offset
    Rewind,
    TogglePlay,
    Seek {
        position_ms: u64,
    },
    SelectRow {
        index: usize,
    },
    EditLine {
        index: usize,
        text: String,
    },
    ToggleEndMarker,
    /// End of track reported by the playback opened as `generation`
    TrackFinished {
        generation: u64,
    },
    /// Sample playback for the position display
    Tick,
    /// Write the session as LRC, to the default path when `path` is `None`
    Export {
        path: Option<PathBuf>,
    },
    /// Publish a [`EngineEvent::Snapshot`] of every row
    Describe,
}

/// Events emitted by the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    SessionLoaded {
        source_name: String,
        line_count: usize,
        audio_path: PathBuf,
    },
    RowStamped {
        index: usize,
        timestamp_ms: u64,
    },
    RowReset {
        index: usize,
    },
    RowSelected {
        index: usize,
    },
    LineEdited {
        index: usize,
    },
    EndMarkerToggled {
        enabled: bool,
    },
    PlaybackToggled {
        playing: bool,
    },
    Seeked {
        position_ms: u64,
    },
    TrackFinished {
        appended_final_timestamp: bool,
    },
    /// Regular position sample
    PositionSync {
        sample: PlaybackSample,
    },
    Exported {
        path: PathBuf,
        line_count: usize,
    },
    /// Every row, for hosts that display the session
    Snapshot {
        lines: Vec<LyricLine>,
        current_index: usize,
        state: ControllerState,
        append_final_timestamp: bool,
    },
    /// A command failed and changed nothing
    CommandRejected {
        message: String,
    },
}

/// Cloneable sender for engine commands, usable from any thread
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    /// Queue a command. Returns `false` if the engine has shut down.
    pub fn send(&self, command: EngineCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

/// Owner of the timing session and its playback
pub struct Engine {
    session: Option<LyricSession>,
    playback: Option<Box<dyn Playback>>,
    opener: Box<dyn PlaybackOpener>,
    controller: TimingController,
    /// Final timestamp toggle carried into the next loaded session
    append_final_timestamp: bool,
    /// Bumped per opened playback so stale end-of-track reports are dropped
    generation: u64,
    command_tx: mpsc::UnboundedSender<EngineCommand>,
    command_rx: mpsc::UnboundedReceiver<EngineCommand>,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl Engine {
    /// Create an engine with no session loaded
    #[must_use]
    pub fn new(config: &TimingConfig, opener: Box<dyn PlaybackOpener>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(256);

        Self {
            session: None,
            playback: None,
            opener,
            controller: TimingController::new(config),
            append_final_timestamp: config.append_final_timestamp,
            generation: 0,
            command_tx,
            command_rx,
            event_tx,
        }
    }

    /// Get a handle for sending commands
    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            commands: self.command_tx.clone(),
        }
    }

    /// Subscribe to engine events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub const fn session(&self) -> Option<&LyricSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        ControllerState::observe(self.session.as_ref(), self.playback.as_deref())
    }

    /// Apply queued commands until cancelled
    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!(target: LOG_TARGET, "Engine started");

        loop {
            let command = tokio::select! {
                () = cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "Engine shutting down");
                    break;
                }
                command = self.command_rx.recv() => command,
            };

            let Some(command) = command else {
                break;
            };
            self.dispatch(command);
        }

        if let Some(playback) = self.playback.as_mut() {
            playback.stop();
        }
    }

    /// Apply one command, reporting failure as a [`EngineEvent::CommandRejected`]
    pub fn dispatch(&mut self, command: EngineCommand) {
        if let Err(e) = self.apply(command) {
            warn!(target: LOG_TARGET, "Command rejected: {}", e);
            self.emit(EngineEvent::CommandRejected {
                message: e.to_string(),
            });
        }
    }

    /// Apply one command. On error nothing has changed.
    ///
    /// # Errors
    ///
    /// Returns the [`CoreError`] describing why the command was rejected.
    pub fn apply(&mut self, command: EngineCommand) -> Result<()> {
        let controller = self.controller;
        match command {
            EngineCommand::Load {
                lyric_path,
                audio_path,
            } => self.load(lyric_path, audio_path),
            EngineCommand::Advance => {
                let (session, playback) = self.timing_target()?;
                let sample_ms = playback.position_ms();
                if let Some(index) = controller.advance_row(session, sample_ms) {
                    self.emit(EngineEvent::RowStamped {
                        index,
                        timestamp_ms: sample_ms,
                    });
                }
                Ok(())
            }
            EngineCommand::RetimePrevious => {
                let session = self.session.as_mut().ok_or(CoreError::NoPlaybackTarget)?;
                if let Some(index) = controller.retime_previous_row(session) {
                    self.emit(EngineEvent::RowReset { index });
                }
                Ok(())
            }
            EngineCommand::ReplayLine => {
                let (session, playback) = self.timing_target()?;
                if let Some(position_ms) = controller.replay_line(session, playback) {
                    self.emit(EngineEvent::Seeked { position_ms });
                }
                Ok(())
            }
            EngineCommand::Rewind => {
                let (_, playback) = self.timing_target()?;
                let position_ms = controller.rewind(playback);
                self.emit(EngineEvent::Seeked { position_ms });
                Ok(())
            }
            EngineCommand::TogglePlay => {
                let (session, playback) = self.timing_target()?;
                let playing = controller.toggle_play(session, playback);
                self.emit(EngineEvent::PlaybackToggled { playing });
                Ok(())
            }
            EngineCommand::Seek { position_ms } => {
                let (_, playback) = self.timing_target()?;
                let position_ms = controller.seek(playback, position_ms);
                self.emit(EngineEvent::Seeked { position_ms });
                Ok(())
            }
            EngineCommand::SelectRow { index } => {
                let session = self
                    .session
                    .as_mut()
                    .ok_or(CoreError::IndexOutOfRange { index, len: 0 })?;
                controller.select_row(session, index)?;
                self.emit(EngineEvent::RowSelected { index });
                Ok(())
            }
            EngineCommand::EditLine { index, text } => {
                let session = self
                    .session
                    .as_mut()
                    .ok_or(CoreError::IndexOutOfRange { index, len: 0 })?;
                session.edit_text(index, text)?;
                self.emit(EngineEvent::LineEdited { index });
                Ok(())
            }
            EngineCommand::ToggleEndMarker => {
                let enabled = match self.session.as_mut() {
                    Some(session) => controller.toggle_end_marker(session),
                    None => !self.append_final_timestamp,
                };
                self.append_final_timestamp = enabled;
                self.emit(EngineEvent::EndMarkerToggled { enabled });
                Ok(())
            }
            EngineCommand::TrackFinished { generation } => {
                self.track_finished(generation);
                Ok(())
            }
            EngineCommand::Tick => {
                if let Some(playback) = self.playback.as_deref() {
                    let sample = playback.sample();
                    self.emit(EngineEvent::PositionSync { sample });
                }
                Ok(())
            }
            EngineCommand::Export { path } => {
                let session = self.session.as_ref().ok_or(CoreError::EmptySession)?;
                let path = lrc::write_lrc_or_default(session, path.as_deref())?;
                let line_count = session.len();
                self.emit(EngineEvent::Exported { path, line_count });
                Ok(())
            }
            EngineCommand::Describe => {
                let event = EngineEvent::Snapshot {
                    lines: self
                        .session
                        .as_ref()
                        .map(|s| s.lines().to_vec())
                        .unwrap_or_default(),
                    current_index: self.session.as_ref().map_or(0, LyricSession::current_index),
                    state: self.state(),
                    append_final_timestamp: self
                        .session
                        .as_ref()
                        .map_or(self.append_final_timestamp, LyricSession::append_final_timestamp),
                };
                self.emit(event);
                Ok(())
            }
        }
    }

    fn load(&mut self, lyric_path: PathBuf, audio_path: PathBuf) -> Result<()> {
        let session = LyricSession::open(&lyric_path, self.append_final_timestamp)?;

        let generation = self.generation + 1;
        let notifier = EndOfTrackNotifier::new(self.command_tx.clone(), generation);
        let mut playback = self.opener.open(&audio_path, notifier)?;

        if let Some(mut previous) = self.playback.take() {
            previous.stop();
        }

        // Start then pause immediately so the track is loaded and sits at zero
        playback.play();
        playback.pause();

        info!(
            target: LOG_TARGET,
            "Loaded {} ({} lines) with {}",
            lyric_path.display(),
            session.len(),
            audio_path.display()
        );

        self.emit(EngineEvent::SessionLoaded {
            source_name: session.source_name().to_string(),
            line_count: session.len(),
            audio_path,
        });

        self.generation = generation;
        self.session = Some(session);
        self.playback = Some(playback);
        Ok(())
    }

    fn track_finished(&mut self, generation: u64) {
        if generation != self.generation {
            debug!(
                target: LOG_TARGET,
                "Ignoring end of track from replaced playback #{}", generation
            );
            return;
        }
        let (Some(session), Some(playback)) = (self.session.as_mut(), self.playback.as_mut())
        else {
            return;
        };

        let appended = self
            .controller
            .on_track_finished(session, playback.length_ms());
        playback.stop();
        playback.seek(0);

        self.emit(EngineEvent::TrackFinished {
            appended_final_timestamp: appended,
        });
    }

    /// Session and playback for commands that act on the playing song
    fn timing_target(&mut self) -> Result<(&mut LyricSession, &mut (dyn Playback + 'static))> {
        match (self.session.as_mut(), self.playback.as_deref_mut()) {
            (Some(session), Some(playback)) => Ok((session, playback)),
            _ => Err(CoreError::NoPlaybackTarget),
        }
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}
