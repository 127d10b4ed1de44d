use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LrcMakerConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which files the folder scanner treats as lyrics and as audio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_lyric_extension")]
    pub lyric_extension: String,
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,
}

fn default_lyric_extension() -> String {
    "txt".to_string()
}

fn default_audio_extensions() -> Vec<String> {
    vec!["mp3".to_string(), "wav".to_string(), "flac".to_string()]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            lyric_extension: default_lyric_extension(),
            audio_extensions: default_audio_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// How far the rewind command jumps back
    #[serde(default = "default_rewind_offset")]
    pub rewind_offset_ms: u64,
    /// Host sampling cadence for the position display
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Initial state of the final timestamp toggle for new sessions
    #[serde(default = "default_true")]
    pub append_final_timestamp: bool,
}

const fn default_rewind_offset() -> u64 {
    5000
}

const fn default_tick_interval() -> u64 {
    50
}

const fn default_true() -> bool {
    true
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rewind_offset_ms: default_rewind_offset(),
            tick_interval_ms: default_tick_interval(),
            append_final_timestamp: default_true(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `~/.config/lrcmaker/lrcmaker.log`
    #[serde(default)]
    pub enabled: bool,
}

impl LrcMakerConfig {
    /// Get the config file path (~/.config/lrcmaker/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path or create a template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        Self::load_from(&config_path)
    }

    /// Load and validate config from an explicit path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails validation.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate config from TOML text
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigParseError`] for TOML errors and
    /// [`CoreError::ConfigInvalid`] for values that cannot work.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.scanner.lyric_extension.trim().trim_start_matches('.').is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "scanner.lyric_extension must not be empty".to_string(),
            });
        }
        if self.scanner.audio_extensions.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "scanner.audio_extensions must list at least one extension".to_string(),
            });
        }
        if self.timing.tick_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "timing.tick_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Template written on first run
pub const CONFIG_TEMPLATE: &str = r#"# lrcmaker configuration
# ~/.config/lrcmaker/config.toml

[scanner]
# Extension of lyric text files (one lyric line per text line)
lyric_extension = "txt"
# Audio files considered when pairing lyrics with songs
audio_extensions = ["mp3", "wav", "flac"]

[timing]
# How far the rewind command jumps back, in milliseconds
rewind_offset_ms = 5000
# How often the position display is refreshed, in milliseconds
tick_interval_ms = 50
# Append an empty line stamped at the track length when the track ends
append_final_timestamp = true

[logging]
# Also write logs to ~/.config/lrcmaker/lrcmaker.log
enabled = false
"#;
