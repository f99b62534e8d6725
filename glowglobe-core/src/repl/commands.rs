//! Maps parsed console commands onto session inputs.
//!
//! Front-ends feed every line through [`grammar::parse`](super::grammar::parse)
//! and then [`interpret`]; session-affecting commands become a
//! [`SessionInput`] for the runtime queue, the rest are handled locally.

use core::fmt;

use super::catalog::{self, CommandSpec, COMMANDS};
use super::grammar::ConsoleCommand;
use crate::runtime::SessionInput;
use crate::telemetry::{AsyncFrameKind, TelemetryFrame};

/// What a front-end should do with a console command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReplAction<'a> {
    /// Enqueue the input for the session runtime.
    Session(SessionInput),
    Status,
    Help(Option<&'a str>),
    /// Tear the session down and end the console.
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// Collision frames carry a payload; use `collide` instead.
    PayloadRequired(u8),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::PayloadRequired(code) => write!(
                f,
                "frame 0x{code:02x} needs a payload; use `collide accel=<x>,<y> power=<x>,<y>`"
            ),
        }
    }
}

/// Turns a parsed command into the action a front-end performs.
pub fn interpret(command: ConsoleCommand<'_>) -> Result<ReplAction<'_>, CommandError> {
    Ok(match command {
        ConsoleCommand::Toggle => ReplAction::Session(SessionInput::Toggle),
        ConsoleCommand::Start => ReplAction::Session(SessionInput::Start),
        ConsoleCommand::Stop => ReplAction::Session(SessionInput::Stop),
        ConsoleCommand::Collide {
            acceleration,
            power,
        } => ReplAction::Session(SessionInput::Telemetry(TelemetryFrame::collision(
            acceleration,
            power,
        ))),
        ConsoleCommand::Frame(code) => {
            let frame =
                TelemetryFrame::without_payload(code).ok_or(CommandError::PayloadRequired(code))?;
            ReplAction::Session(SessionInput::Telemetry(frame))
        }
        ConsoleCommand::Status => ReplAction::Status,
        ConsoleCommand::Help { topic } => ReplAction::Help(topic),
        ConsoleCommand::Exit => ReplAction::Exit,
    })
}

/// Writes the help text for `topic`, or the command overview when `None`.
///
/// Returns `Ok(false)` when the topic names no command.
pub fn write_help<W: fmt::Write>(writer: &mut W, topic: Option<&str>) -> Result<bool, fmt::Error> {
    match topic {
        None => {
            writer.write_str("commands:")?;
            for spec in COMMANDS {
                write!(writer, "\n  {:<38} {}", spec.usage, spec.summary)?;
            }
            Ok(true)
        }
        Some(word) if word.eq_ignore_ascii_case("frames") => {
            writer.write_str("async frame codes:")?;
            for code in [0x01, 0x02, 0x03, 0x07] {
                write!(writer, "\n  0x{code:02x} {}", AsyncFrameKind::from_raw(code))?;
            }
            Ok(true)
        }
        Some(word) => match catalog::find(word) {
            Some(spec) => {
                write_command_help(writer, spec)?;
                Ok(true)
            }
            None => Ok(false),
        },
    }
}

fn write_command_help<W: fmt::Write>(writer: &mut W, spec: &CommandSpec) -> fmt::Result {
    write!(writer, "{}\n  {}", spec.usage, spec.summary)?;
    if !spec.aliases.is_empty() {
        writer.write_str("\n  aliases:")?;
        for alias in spec.aliases {
            write!(writer, " {alias}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::grammar;
    use crate::telemetry::Axes;
    use heapless::String;

    fn action(line: &str) -> Result<ReplAction<'_>, CommandError> {
        interpret(grammar::parse(line).expect("line parses"))
    }

    #[test]
    fn session_commands_become_inputs() {
        assert_eq!(action("toggle"), Ok(ReplAction::Session(SessionInput::Toggle)));
        assert_eq!(action("start"), Ok(ReplAction::Session(SessionInput::Start)));
        assert_eq!(action("stop"), Ok(ReplAction::Session(SessionInput::Stop)));
        assert_eq!(
            action("collide accel=0,1 power=0,0"),
            Ok(ReplAction::Session(SessionInput::Telemetry(
                TelemetryFrame::collision(Axes::new(0.0, 1.0), Axes::ZERO)
            )))
        );
    }

    #[test]
    fn frame_codes_map_to_payloadless_frames() {
        assert_eq!(
            action("frame 1"),
            Ok(ReplAction::Session(SessionInput::Telemetry(
                TelemetryFrame::PowerNotification
            )))
        );
        assert_eq!(
            action("frame 0x42"),
            Ok(ReplAction::Session(SessionInput::Telemetry(
                TelemetryFrame::Unknown(0x42)
            )))
        );
        assert_eq!(action("frame 7"), Err(CommandError::PayloadRequired(7)));
    }

    #[test]
    fn local_commands_stay_local() {
        assert_eq!(action("status"), Ok(ReplAction::Status));
        assert_eq!(action("help stop"), Ok(ReplAction::Help(Some("stop"))));
        assert_eq!(action("quit"), Ok(ReplAction::Exit));
    }

    #[test]
    fn help_lists_every_command() {
        let mut text: String<1024> = String::new();
        assert_eq!(write_help(&mut text, None), Ok(true));
        for spec in COMMANDS {
            assert!(text.contains(spec.usage), "missing {}", spec.name);
        }
    }

    #[test]
    fn help_for_unknown_topic_reports_miss() {
        let mut text: String<256> = String::new();
        assert_eq!(write_help(&mut text, Some("collide")), Ok(true));
        assert!(text.contains("bump"));

        text.clear();
        assert_eq!(write_help(&mut text, Some("warp")), Ok(false));
        assert!(text.is_empty());
    }
}
