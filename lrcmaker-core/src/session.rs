//! The ordered lyric lines being timed and the pointer to the next row.

use crate::error::{CoreError, Result};
use crate::paths::LRC_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};

/// A single lyric line and the moment it starts, once stamped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub text: String,
    /// Start time in milliseconds; `None` until the row is stamped
    pub timestamp: Option<u64>,
}

impl LyricLine {
    /// Create an unstamped line
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: None,
        }
    }

    /// Create a line with a timestamp already set
    #[must_use]
    pub fn stamped(text: impl Into<String>, timestamp: u64) -> Self {
        Self {
            text: text.into(),
            timestamp: Some(timestamp),
        }
    }
}

/// Lyric lines in playback order plus the index of the next row awaiting a
/// timestamp.
///
/// `current_index` always lies in `0..=lines.len()`, where `lines.len()`
/// means every row has been stamped. A session is never empty.
#[derive(Debug, Clone)]
pub struct LyricSession {
    lines: Vec<LyricLine>,
    current_index: usize,
    source_name: String,
    source_folder: PathBuf,
    append_final_timestamp: bool,
    track_finished: bool,
}

impl LyricSession {
    /// Build a session from lyric text, one line per non-blank text line.
    ///
    /// `source_path` is the lyric file the text came from; its base name and
    /// folder decide the default export path.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptySource`] if the text has no non-blank lines.
    pub fn from_text(text: &str, source_path: &Path, append_final_timestamp: bool) -> Result<Self> {
        let lines = parse_lyric_lines(text, source_path)?;

        let source_name = source_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source_folder = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            lines,
            current_index: 0,
            source_name,
            source_folder,
            append_final_timestamp,
            track_finished: false,
        })
    }

    /// Read a lyric text file and build a session from it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the file cannot be read as UTF-8 text and
    /// [`CoreError::EmptySource`] if it has no usable lines.
    pub fn open(path: &Path, append_final_timestamp: bool) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_text(&text, path, append_final_timestamp)
    }

    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the next row awaiting a timestamp
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// Whether every row up to the end has been stamped
    #[must_use]
    pub fn is_fully_stamped(&self) -> bool {
        self.current_index == self.lines.len()
    }

    /// Base name of the lyric source file, without extension
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Folder the lyric source file lives in
    #[must_use]
    pub fn source_folder(&self) -> &Path {
        &self.source_folder
    }

    #[must_use]
    pub const fn append_final_timestamp(&self) -> bool {
        self.append_final_timestamp
    }

    /// Whether the end of the track has been observed since playback last started
    #[must_use]
    pub const fn track_finished(&self) -> bool {
        self.track_finished
    }

    /// `<source folder>/<source base name>.lrc`
    #[must_use]
    pub fn default_export_path(&self) -> PathBuf {
        self.source_folder
            .join(format!("{}.{LRC_EXTENSION}", self.source_name))
    }

    /// Replace the text of one row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfRange`] if no row exists at `index`.
    pub fn edit_text(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        let len = self.lines.len();
        let line = self
            .lines
            .get_mut(index)
            .ok_or(CoreError::IndexOutOfRange { index, len })?;
        line.text = text.into();
        Ok(())
    }

    /// Stamp the current row and move past it. Returns the stamped index, or
    /// `None` when every row is already stamped.
    pub(crate) fn stamp_current(&mut self, timestamp: u64) -> Option<usize> {
        let index = self.current_index;
        let line = self.lines.get_mut(index)?;
        line.timestamp = Some(timestamp);
        self.current_index += 1;
        Some(index)
    }

    /// Step back one row and clear its timestamp. Returns the cleared index,
    /// or `None` when already at the first row.
    pub(crate) fn unstamp_previous(&mut self) -> Option<usize> {
        let index = self.current_index.checked_sub(1)?;
        self.current_index = index;
        if let Some(line) = self.lines.get_mut(index) {
            line.timestamp = None;
        }
        Some(index)
    }

    /// Move the pointer to `index` without touching any timestamp.
    pub(crate) fn set_current_index(&mut self, index: usize) -> Result<()> {
        let len = self.lines.len();
        if index > len {
            return Err(CoreError::IndexOutOfRange { index, len });
        }
        self.current_index = index;
        Ok(())
    }

    /// Timestamp of the row just before the pointer, if it has one
    #[must_use]
    pub fn previous_timestamp(&self) -> Option<u64> {
        let index = self.current_index.checked_sub(1)?;
        self.lines.get(index).and_then(|line| line.timestamp)
    }

    pub(crate) fn toggle_append_final_timestamp(&mut self) -> bool {
        self.append_final_timestamp = !self.append_final_timestamp;
        self.append_final_timestamp
    }

    /// Append an empty line stamped at `length_ms` unless the last row already
    /// carries exactly that timestamp. Returns whether a line was appended.
    ///
    /// When every row was already stamped the pointer moves past the new line
    /// so the next advance cannot overwrite it.
    pub(crate) fn push_end_marker(&mut self, length_ms: u64) -> bool {
        if self
            .lines
            .last()
            .is_some_and(|last| last.timestamp == Some(length_ms))
        {
            return false;
        }

        let was_fully_stamped = self.is_fully_stamped();
        self.lines.push(LyricLine::stamped("", length_ms));
        if was_fully_stamped {
            self.current_index = self.lines.len();
        }
        true
    }

    pub(crate) fn set_track_finished(&mut self, finished: bool) {
        self.track_finished = finished;
    }
}

/// Split text into trimmed, non-blank lyric lines. `\n`, `\r\n` and a lone
/// `\r` all end a line.
fn parse_lyric_lines(text: &str, source_path: &Path) -> Result<Vec<LyricLine>> {
    let lines: Vec<LyricLine> = text
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(LyricLine::new)
        .collect();

    if lines.is_empty() {
        return Err(CoreError::EmptySource {
            path: source_path.to_path_buf(),
        });
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(text: &str) -> LyricSession {
        LyricSession::from_text(text, Path::new("/music/Song - Artist.txt"), true).unwrap()
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let s = session("first\n\n   \nsecond\r\n\tthird  \n");
        let texts: Vec<_> = s.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(s.lines().iter().all(|l| l.timestamp.is_none()));
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn test_load_keeps_duplicate_text() {
        let s = session("la\nla\nla");
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_load_rejects_blank_source() {
        let result = LyricSession::from_text(" \n\n\t\n", Path::new("/music/empty.txt"), true);
        assert!(matches!(result, Err(CoreError::EmptySource { .. })));
    }

    #[test]
    fn test_provenance_and_export_path() {
        let s = session("line");
        assert_eq!(s.source_name(), "Song - Artist");
        assert_eq!(s.source_folder(), Path::new("/music"));
        assert_eq!(
            s.default_export_path(),
            PathBuf::from("/music/Song - Artist.lrc")
        );
    }

    #[test]
    fn test_load_splits_cr_only_endings() {
        let s = session("first\rsecond\r\rthird\r\nfourth\n");
        let texts: Vec<_> = s.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third", "fourth"]);
    }

    #[test]
    fn test_empty_source_error_names_the_file() {
        let err =
            LyricSession::from_text("\r\r", Path::new("/music/Song.txt"), true).unwrap_err();
        assert!(matches!(
            &err,
            CoreError::EmptySource { path } if path == Path::new("/music/Song.txt")
        ));
    }

    #[test]
    fn test_edit_text() {
        let mut s = session("one\ntwo");
        s.edit_text(1, "TWO").unwrap();
        assert_eq!(s.lines()[1].text, "TWO");

        let err = s.edit_text(2, "three").unwrap_err();
        assert!(matches!(err, CoreError::IndexOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn test_stamp_and_unstamp() {
        let mut s = session("one\ntwo");
        assert_eq!(s.stamp_current(100), Some(0));
        assert_eq!(s.stamp_current(200), Some(1));
        assert_eq!(s.stamp_current(300), None);
        assert!(s.is_fully_stamped());

        assert_eq!(s.unstamp_previous(), Some(1));
        assert_eq!(s.lines()[1].timestamp, None);
        assert_eq!(s.unstamp_previous(), Some(0));
        assert_eq!(s.unstamp_previous(), None);
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn test_set_current_index_bounds() {
        let mut s = session("one\ntwo");
        s.set_current_index(2).unwrap();
        assert!(s.is_fully_stamped());
        assert!(s.set_current_index(3).is_err());
        assert_eq!(s.current_index(), 2);
    }

    #[test]
    fn test_end_marker_guard() {
        let mut s = session("one");
        s.stamp_current(100);
        assert!(s.push_end_marker(180_000));
        assert!(!s.push_end_marker(180_000));
        assert_eq!(s.len(), 2);
        assert_eq!(s.lines()[1], LyricLine::stamped("", 180_000));
        assert_eq!(s.current_index(), 2);
    }

    #[test]
    fn test_end_marker_keeps_pointer_when_rows_remain() {
        let mut s = session("one\ntwo");
        s.stamp_current(100);
        assert!(s.push_end_marker(180_000));
        assert_eq!(s.current_index(), 1);
    }
}
