//! Lyric/audio pairing for a song folder.
//!
//! A lyric file and an audio file are paired when one lower-cased,
//! extension-stripped base name contains the other. Every match is reported;
//! when a lyric file fits several audio files the caller picks one.

use crate::config::ScannerConfig;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LOG_TARGET: &str = "lrcmaker::scanner";

/// A lyric text file and an audio file proposed as belonging together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidatePair {
    pub lyric_path: PathBuf,
    pub audio_path: PathBuf,
}

impl CandidatePair {
    /// File name of the lyric file, used when listing pairs to the user.
    #[must_use]
    pub fn lyric_file_name(&self) -> String {
        file_name_lossy(&self.lyric_path)
    }

    /// File name of the audio file.
    #[must_use]
    pub fn audio_file_name(&self) -> String {
        file_name_lossy(&self.audio_path)
    }
}

/// Proposes lyric/audio pairings within a single directory.
#[derive(Debug, Clone)]
pub struct FolderScanner {
    lyric_extension: String,
    audio_extensions: Vec<String>,
}

impl Default for FolderScanner {
    fn default() -> Self {
        Self::new(&ScannerConfig::default())
    }
}

impl FolderScanner {
    /// Create a scanner from the configured extensions.
    #[must_use]
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            lyric_extension: normalize_extension(&config.lyric_extension),
            audio_extensions: config
                .audio_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
        }
    }

    /// Scan `dir` for lyric/audio pairs.
    ///
    /// An unreadable directory or a folder without matches yields an empty
    /// list. Pairs are ordered by lyric file name, then audio file name.
    #[must_use]
    pub fn scan(&self, dir: &Path) -> Vec<CandidatePair> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(target: LOG_TARGET, "Cannot read {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut lyrics = Vec::new();
        let mut audio = Vec::new();

        for entry in entries.flatten() {
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if ext.eq_ignore_ascii_case(&self.lyric_extension) {
                lyrics.push(path);
            } else if self
                .audio_extensions
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            {
                audio.push(path);
            }
        }

        lyrics.sort();
        audio.sort();

        let pairs = pair_by_name(&lyrics, &audio);
        debug!(
            target: LOG_TARGET,
            "Scanned {}: {} lyric file(s), {} audio file(s), {} pair(s)",
            dir.display(),
            lyrics.len(),
            audio.len(),
            pairs.len()
        );
        pairs
    }
}

/// Pair every lyric path with every audio path whose base names match.
#[must_use]
pub fn pair_by_name(lyrics: &[PathBuf], audio: &[PathBuf]) -> Vec<CandidatePair> {
    let audio_bases: Vec<String> = audio.iter().map(|p| base_name(p)).collect();
    let mut pairs = Vec::new();

    for lyric_path in lyrics {
        let lyric_base = base_name(lyric_path);
        for (audio_path, audio_base) in audio.iter().zip(&audio_bases) {
            if names_match(&lyric_base, audio_base) {
                pairs.push(CandidatePair {
                    lyric_path: lyric_path.clone(),
                    audio_path: audio_path.clone(),
                });
            }
        }
    }

    pairs
}

/// Containment in either direction, equality included.
#[must_use]
pub fn names_match(lyric_base: &str, audio_base: &str) -> bool {
    audio_base.contains(lyric_base) || lyric_base.contains(audio_base)
}

fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_string()
}
