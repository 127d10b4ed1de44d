//! Line-oriented key bindings for the interactive timing prompt.

use lrcmaker_core::{parse_timestamp, EngineCommand};
use std::path::PathBuf;

pub const HELP: &str = "\
  <enter>       stamp the current line and advance
  b             clear the previous line and step back to it
  ,             rewind a few seconds
  .             replay from the previous line's timestamp
  p             play / pause
  g N           select line N as the next to stamp
  s TIME        seek to TIME (MM:SS.CC or whole seconds)
  e N TEXT      replace the text of line N
  f             toggle the final timestamp at end of track
  w [PATH]      write the .lrc file (next to the lyrics by default)
  l             list all lines
  h             show this help
  q             quit";

#[derive(Debug)]
pub enum PromptCommand {
    Engine(EngineCommand),
    Help,
    Quit,
}

/// Parse one line of prompt input. Line numbers are 1-based.
///
/// # Errors
///
/// Returns a message for the user when the input is not a known command.
pub fn parse_prompt(input: &str) -> Result<PromptCommand, String> {
    let input = input.trim();
    let (key, rest) = input
        .split_once(char::is_whitespace)
        .map_or((input, ""), |(key, rest)| (key, rest.trim()));

    let command = match key {
        "" => EngineCommand::Advance,
        "b" => EngineCommand::RetimePrevious,
        "," => EngineCommand::Rewind,
        "." => EngineCommand::ReplayLine,
        "p" => EngineCommand::TogglePlay,
        "f" => EngineCommand::ToggleEndMarker,
        "l" => EngineCommand::Describe,
        "g" => EngineCommand::SelectRow {
            index: parse_line_number(rest)?,
        },
        "s" => EngineCommand::Seek {
            position_ms: parse_position(rest)?,
        },
        "e" => {
            let (number, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let text = text.trim();
            if text.is_empty() {
                return Err("usage: e N TEXT".to_string());
            }
            EngineCommand::EditLine {
                index: parse_line_number(number)?,
                text: text.to_string(),
            }
        }
        "w" => EngineCommand::Export {
            path: (!rest.is_empty()).then(|| PathBuf::from(rest)),
        },
        "h" | "?" => return Ok(PromptCommand::Help),
        "q" => return Ok(PromptCommand::Quit),
        other => return Err(format!("unknown command '{other}', h for help")),
    };
    Ok(PromptCommand::Engine(command))
}

/// 1-based line number to row index
fn parse_line_number(input: &str) -> Result<usize, String> {
    match input.parse::<usize>() {
        Ok(number) if number > 0 => Ok(number - 1),
        _ => Err(format!("expected a line number, got '{input}'")),
    }
}

/// `MM:SS.CC` or whole seconds, in milliseconds
pub fn parse_position(input: &str) -> Result<u64, String> {
    if input.contains(':') {
        return parse_timestamp(input).map_err(|e| e.to_string());
    }
    input
        .parse::<u64>()
        .ok()
        .and_then(|seconds| seconds.checked_mul(1000))
        .ok_or_else(|| format!("expected MM:SS.CC or seconds, got '{input}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_command(input: &str) -> EngineCommand {
        match parse_prompt(input) {
            Ok(PromptCommand::Engine(command)) => command,
            other => panic!("unexpected parse of {input:?}: {other:?}"),
        }
    }

    #[test]
    fn test_single_keys() {
        assert!(matches!(engine_command(""), EngineCommand::Advance));
        assert!(matches!(engine_command("   "), EngineCommand::Advance));
        assert!(matches!(engine_command("b"), EngineCommand::RetimePrevious));
        assert!(matches!(engine_command(","), EngineCommand::Rewind));
        assert!(matches!(engine_command("."), EngineCommand::ReplayLine));
        assert!(matches!(engine_command("p"), EngineCommand::TogglePlay));
        assert!(matches!(engine_command("f"), EngineCommand::ToggleEndMarker));
        assert!(matches!(engine_command("l"), EngineCommand::Describe));
        assert!(matches!(parse_prompt("q"), Ok(PromptCommand::Quit)));
        assert!(matches!(parse_prompt("h"), Ok(PromptCommand::Help)));
    }

    #[test]
    fn test_select_is_one_based() {
        assert!(matches!(
            engine_command("g 3"),
            EngineCommand::SelectRow { index: 2 }
        ));
        assert!(parse_prompt("g 0").is_err());
        assert!(parse_prompt("g").is_err());
        assert!(parse_prompt("g x").is_err());
    }

    #[test]
    fn test_seek_formats() {
        assert!(matches!(
            engine_command("s 01:05.50"),
            EngineCommand::Seek {
                position_ms: 65_500
            }
        ));
        assert!(matches!(
            engine_command("s 90"),
            EngineCommand::Seek {
                position_ms: 90_000
            }
        ));
        assert!(parse_prompt("s 1:5").is_err());
        assert!(parse_prompt("s -3").is_err());
    }

    #[test]
    fn test_edit_keeps_inner_spacing() {
        match engine_command("e 2   hello   world ") {
            EngineCommand::EditLine { index, text } => {
                assert_eq!(index, 1);
                assert_eq!(text, "hello   world");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(parse_prompt("e 2").is_err());
    }

    #[test]
    fn test_write_path() {
        assert!(matches!(
            engine_command("w"),
            EngineCommand::Export { path: None }
        ));
        match engine_command("w /tmp/out file.lrc") {
            EngineCommand::Export { path } => {
                assert_eq!(path, Some(PathBuf::from("/tmp/out file.lrc")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_key() {
        let err = parse_prompt("zz").unwrap_err();
        assert!(err.contains("zz"));
    }
}
