// Leaderkey Event Script
// Line-based description of key activity for replay

use std::fmt;

use crate::{KeyPosition, Timestamp};

/// Errors from parsing an event script
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: expected {expected}")]
    MissingArgument { line: usize, expected: &'static str },

    #[error("line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },

    #[error("line {line}: unexpected trailing input '{rest}'")]
    TrailingInput { line: usize, rest: String },
}

/// One replay step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptCommand {
    /// Key-down at a position
    Press(KeyPosition, Timestamp),
    /// Key-up at a position
    Release(KeyPosition, Timestamp),
    /// Key-down followed by key-up one millisecond later
    Tap(KeyPosition, Timestamp),
    /// Start a gesture directly, without a leader key event
    Activate(KeyPosition, Timestamp),
    /// End the current gesture
    Deactivate,
    LayerOn(u8),
    LayerOff(u8),
    /// Let time pass so a pending timeout can fire
    Tick(Timestamp),
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptCommand::Press(p, t) => write!(f, "press {} {}", p, t),
            ScriptCommand::Release(p, t) => write!(f, "release {} {}", p, t),
            ScriptCommand::Tap(p, t) => write!(f, "tap {} {}", p, t),
            ScriptCommand::Activate(p, t) => write!(f, "activate {} {}", p, t),
            ScriptCommand::Deactivate => write!(f, "deactivate"),
            ScriptCommand::LayerOn(l) => write!(f, "layer on {}", l),
            ScriptCommand::LayerOff(l) => write!(f, "layer off {}", l),
            ScriptCommand::Tick(t) => write!(f, "tick {}", t),
        }
    }
}

/// Parse a whole script. Blank lines and `#` comments are ignored.
pub fn parse_script(content: &str) -> Result<Vec<ScriptCommand>, ScriptError> {
    let mut commands = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let text = raw.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        commands.push(parse_line(index + 1, text)?);
    }
    Ok(commands)
}

fn parse_line(line: usize, text: &str) -> Result<ScriptCommand, ScriptError> {
    let mut words = text.split_whitespace();
    let mut args = Args { line, words: &mut words };

    let command = match args.words.next().unwrap_or("") {
        "press" => ScriptCommand::Press(args.position()?, args.timestamp()?),
        "release" => ScriptCommand::Release(args.position()?, args.timestamp()?),
        "tap" => ScriptCommand::Tap(args.position()?, args.timestamp()?),
        "activate" => ScriptCommand::Activate(args.position()?, args.timestamp()?),
        "deactivate" => ScriptCommand::Deactivate,
        "tick" => ScriptCommand::Tick(args.timestamp()?),
        "layer" => match args.words.next() {
            Some("on") => ScriptCommand::LayerOn(args.number("layer")?),
            Some("off") => ScriptCommand::LayerOff(args.number("layer")?),
            _ => {
                return Err(ScriptError::MissingArgument {
                    line,
                    expected: "'on' or 'off'",
                })
            }
        },
        other => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: other.to_string(),
            })
        }
    };

    let rest: Vec<&str> = args.words.collect();
    if !rest.is_empty() {
        return Err(ScriptError::TrailingInput {
            line,
            rest: rest.join(" "),
        });
    }
    Ok(command)
}

struct Args<'a, 'b> {
    line: usize,
    words: &'b mut std::str::SplitWhitespace<'a>,
}

impl Args<'_, '_> {
    fn number<T: std::str::FromStr>(&mut self, expected: &'static str) -> Result<T, ScriptError> {
        let word = self.words.next().ok_or(ScriptError::MissingArgument {
            line: self.line,
            expected,
        })?;
        word.parse().map_err(|_| ScriptError::InvalidNumber {
            line: self.line,
            value: word.to_string(),
        })
    }

    fn position(&mut self) -> Result<KeyPosition, ScriptError> {
        self.number("key position").map(KeyPosition)
    }

    fn timestamp(&mut self) -> Result<Timestamp, ScriptError> {
        self.number("timestamp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = r#"
            # leader then a two key sequence
            press 40 0
            release 40 5
            tap 5 10     # first key
            press 6 20
            release 6 30
            layer on 2
            layer off 2
            tick 500
            activate 40 600
            deactivate
        "#;
        let commands = parse_script(script).unwrap();
        assert_eq!(
            commands,
            vec![
                ScriptCommand::Press(KeyPosition(40), 0),
                ScriptCommand::Release(KeyPosition(40), 5),
                ScriptCommand::Tap(KeyPosition(5), 10),
                ScriptCommand::Press(KeyPosition(6), 20),
                ScriptCommand::Release(KeyPosition(6), 30),
                ScriptCommand::LayerOn(2),
                ScriptCommand::LayerOff(2),
                ScriptCommand::Tick(500),
                ScriptCommand::Activate(KeyPosition(40), 600),
                ScriptCommand::Deactivate,
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        assert_eq!(
            parse_script("press 1 0\nhold 3 4"),
            Err(ScriptError::UnknownCommand {
                line: 2,
                command: "hold".to_string()
            })
        );
        assert_eq!(
            parse_script("press 1"),
            Err(ScriptError::MissingArgument {
                line: 1,
                expected: "timestamp"
            })
        );
        assert_eq!(
            parse_script("\n\nrelease x 4"),
            Err(ScriptError::InvalidNumber {
                line: 3,
                value: "x".to_string()
            })
        );
        assert_eq!(
            parse_script("deactivate now"),
            Err(ScriptError::TrailingInput {
                line: 1,
                rest: "now".to_string()
            })
        );
        assert!(matches!(
            parse_script("layer up 2"),
            Err(ScriptError::MissingArgument { line: 1, .. })
        ));
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let command = ScriptCommand::Tap(KeyPosition(7), 15);
        assert_eq!(parse_script(&command.to_string()).unwrap(), vec![command]);
    }
}
