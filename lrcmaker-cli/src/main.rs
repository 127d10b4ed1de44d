mod clock;
mod prompt;

use crate::clock::ClockOpener;
use crate::prompt::{parse_prompt, PromptCommand, HELP};
use clap::{Parser, Subcommand};
use lrcmaker_core::{
    format_timestamp, CandidatePair, CoreError, Engine, EngineCommand, EngineEvent, EngineHandle,
    FolderScanner, LrcMakerConfig, LyricLine,
};
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "lrcmaker", version, about = "Time lyric lines against a song and write .lrc files")]
struct Cli {
    /// Read config from this file instead of ~/.config/lrcmaker/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List lyric and audio files in a folder that belong together
    Scan {
        dir: PathBuf,
        /// Print the pairs as JSON
        #[arg(long)]
        json: bool,
    },
    /// Time a lyric file line by line
    Time {
        dir: PathBuf,
        /// Pair number from `scan` to use without asking
        #[arg(long)]
        pick: Option<usize>,
        /// Track length as MM:SS.CC or whole seconds
        #[arg(long)]
        length: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("No lyric/audio pairs found in {}", dir.display())]
    NoCandidates { dir: PathBuf },

    #[error("Pair {pick} does not exist, choose 1 to {count}")]
    PickOutOfRange { pick: usize, count: usize },

    #[error("No pair chosen")]
    NoPick,

    #[error("Invalid track length: {0}")]
    InvalidLength(String),

    #[error("Failed to encode scan results: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    let cli = Cli::parse();

    let file_logging_enabled = check_file_logging_enabled(cli.config.as_deref());
    init_tracing(file_logging_enabled);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Wrote a config template to {}, using defaults",
                path.display()
            );
            LrcMakerConfig::default()
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Scan { dir, json } => run_scan(&config, &dir, json),
        Commands::Time { dir, pick, length } => run_time(&config, &dir, pick, length.as_deref()),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<LrcMakerConfig, CoreError> {
    match path {
        Some(path) => LrcMakerConfig::load_from(path),
        None => LrcMakerConfig::load_or_create(),
    }
}

fn run_scan(config: &LrcMakerConfig, dir: &Path, json: bool) -> Result<(), CliError> {
    let pairs = FolderScanner::new(&config.scanner).scan(dir);

    if json {
        println!("{}", serde_json::to_string_pretty(&pairs)?);
        return Ok(());
    }

    if pairs.is_empty() {
        return Err(CliError::NoCandidates {
            dir: dir.to_path_buf(),
        });
    }
    print_pairs(&pairs);
    Ok(())
}

fn run_time(
    config: &LrcMakerConfig,
    dir: &Path,
    pick: Option<usize>,
    length: Option<&str>,
) -> Result<(), CliError> {
    let length_ms = length
        .map(prompt::parse_position)
        .transpose()
        .map_err(CliError::InvalidLength)?
        .unwrap_or(0);

    let pairs = FolderScanner::new(&config.scanner).scan(dir);
    if pairs.is_empty() {
        return Err(CliError::NoCandidates {
            dir: dir.to_path_buf(),
        });
    }
    let pair = match pick {
        Some(pick) => select_pair(&pairs, pick)?,
        None if pairs.len() == 1 => &pairs[0],
        None => ask_for_pair(&pairs)?,
    }
    .clone();

    let runtime = tokio::runtime::Runtime::new()?;

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let engine = Engine::new(&config.timing, Box::new(ClockOpener::new(length_ms)));
    let handle = engine.handle();
    let events = engine.subscribe();

    let engine_task = runtime.spawn(engine.run(cancel_token.clone()));
    runtime.spawn(print_events(events, cancel_token.clone()));
    runtime.spawn(drive_ticks(
        handle.clone(),
        Duration::from_millis(config.timing.tick_interval_ms),
        cancel_token.clone(),
    ));

    // Stdin blocks, so it gets its own thread
    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    handle.send(EngineCommand::Load {
        lyric_path: pair.lyric_path,
        audio_path: pair.audio_path,
    });
    handle.send(EngineCommand::Describe);
    println!("{HELP}");

    runtime.block_on(async {
        loop {
            let line = tokio::select! {
                () = cancel_token.cancelled() => break,
                line = line_rx.recv() => line,
            };
            let Some(line) = line else { break };

            match parse_prompt(&line) {
                Ok(PromptCommand::Engine(command)) => {
                    if !handle.send(command) {
                        break;
                    }
                }
                Ok(PromptCommand::Help) => println!("{HELP}"),
                Ok(PromptCommand::Quit) => break,
                Err(message) => println!("{message}"),
            }
        }

        cancel_token.cancel();
        if let Err(e) = engine_task.await {
            error!("Engine task failed: {e}");
        }
    });

    Ok(())
}

/// 1-based pick into the scanned pairs
fn select_pair(pairs: &[CandidatePair], pick: usize) -> Result<&CandidatePair, CliError> {
    pick.checked_sub(1)
        .and_then(|index| pairs.get(index))
        .ok_or(CliError::PickOutOfRange {
            pick,
            count: pairs.len(),
        })
}

fn ask_for_pair(pairs: &[CandidatePair]) -> Result<&CandidatePair, CliError> {
    print_pairs(pairs);
    let stdin = std::io::stdin();
    loop {
        print!("Pair to time: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            return Err(CliError::NoPick);
        }
        match input.trim().parse::<usize>() {
            Ok(pick) => match select_pair(pairs, pick) {
                Ok(pair) => return Ok(pair),
                Err(e) => println!("{e}"),
            },
            Err(_) => println!("Enter a number from 1 to {}", pairs.len()),
        }
    }
}

fn print_pairs(pairs: &[CandidatePair]) {
    for (number, pair) in pairs.iter().enumerate() {
        println!("{}", format_pair(number + 1, pair));
    }
}

fn format_pair(number: usize, pair: &CandidatePair) -> String {
    format!(
        "{number:>3}. {}  <->  {}",
        pair.lyric_file_name(),
        pair.audio_file_name()
    )
}

fn format_row(index: usize, line: &LyricLine, current_index: usize) -> String {
    let marker = if index == current_index { '>' } else { ' ' };
    let timestamp = line
        .timestamp
        .map_or_else(|| "--:--.--".to_string(), format_timestamp);
    format!("{marker}{:>4} [{timestamp}] {}", index + 1, line.text)
}

/// Text to show for an event, if any. Position samples are handled by the
/// caller.
fn describe_event(event: &EngineEvent) -> Option<String> {
    match event {
        EngineEvent::SessionLoaded {
            source_name,
            line_count,
            audio_path,
        } => Some(format!(
            "Loaded {source_name} ({line_count} lines) with {}",
            audio_path.display()
        )),
        EngineEvent::RowStamped {
            index,
            timestamp_ms,
        } => Some(format!(
            "{:>5} [{}]",
            index + 1,
            format_timestamp(*timestamp_ms)
        )),
        EngineEvent::RowReset { index } => Some(format!("{:>5} cleared", index + 1)),
        EngineEvent::RowSelected { index } => Some(format!("Next line is {}", index + 1)),
        EngineEvent::LineEdited { index } => Some(format!("Line {} edited", index + 1)),
        EngineEvent::EndMarkerToggled { enabled } => Some(format!(
            "Final timestamp at end of track {}",
            if *enabled { "on" } else { "off" }
        )),
        EngineEvent::PlaybackToggled { playing } => {
            Some(if *playing { "Playing" } else { "Paused" }.to_string())
        }
        EngineEvent::Seeked { position_ms } => {
            Some(format!("At {}", format_timestamp(*position_ms)))
        }
        EngineEvent::TrackFinished {
            appended_final_timestamp,
        } => Some(if *appended_final_timestamp {
            "Track finished, final timestamp added".to_string()
        } else {
            "Track finished".to_string()
        }),
        EngineEvent::Exported { path, line_count } => {
            Some(format!("Wrote {line_count} lines to {}", path.display()))
        }
        EngineEvent::Snapshot {
            lines,
            current_index,
            state,
            append_final_timestamp,
        } => {
            let mut text = format!(
                "{state:?}, final timestamp {}",
                if *append_final_timestamp { "on" } else { "off" }
            );
            for (index, line) in lines.iter().enumerate() {
                text.push('\n');
                text.push_str(&format_row(index, line, *current_index));
            }
            Some(text)
        }
        EngineEvent::CommandRejected { message } => Some(format!("! {message}")),
        EngineEvent::PositionSync { .. } => None,
    }
}

async fn print_events(mut events: broadcast::Receiver<EngineEvent>, cancel_token: CancellationToken) {
    // Position is printed at most once per second of playback
    let mut last_second = None;

    loop {
        let event = tokio::select! {
            () = cancel_token.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(EngineEvent::PositionSync { sample }) => {
                let second = sample.position_ms / 1000;
                if sample.is_playing && last_second != Some(second) {
                    last_second = Some(second);
                    println!("  {}", sample.display());
                }
            }
            Ok(event) => {
                debug!("Engine event: {:?}", event);
                if let Some(text) = describe_event(&event) {
                    println!("{text}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event printer lagged by {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Send a position sample request every `period` until cancelled
async fn drive_ticks(handle: EngineHandle, period: Duration, cancel_token: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            _ = interval.tick() => {
                if !handle.send(EngineCommand::Tick) {
                    break;
                }
            }
        }
    }
}

fn check_file_logging_enabled(config_path: Option<&Path>) -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let config_path = config_path.map_or_else(LrcMakerConfig::config_path, Path::to_path_buf);
    let Ok(content) = std::fs::read_to_string(&config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with stderr output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,lrcmaker=info"));

    // Stdout belongs to the prompt
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = lrcmaker_core::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
