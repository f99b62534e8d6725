#![allow(clippy::module_name_repetitions)]

//! Line grammar for the operator console.
//!
//! Parsers are plain `winnow` functions over `&str`, so the grammar works in
//! `no_std` builds. Keywords are case-insensitive; numbers accept the usual
//! float syntax, and frame codes may be written in decimal or `0x` hex.

use core::fmt;

use winnow::ascii::{Caseless, dec_uint, float, hex_uint, space0, space1};
use winnow::combinator::{alt, fail, opt, preceded, separated_pair};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

use super::catalog::{self, CommandSpec, CommandTag};
use crate::telemetry::Axes;

/// Parsed console command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConsoleCommand<'a> {
    Toggle,
    Start,
    Stop,
    Collide { acceleration: Axes, power: Axes },
    Frame(u8),
    Status,
    Help { topic: Option<&'a str> },
    Exit,
}

/// Reasons a console line was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    /// The line held nothing but whitespace.
    Empty,
    UnknownCommand(&'a str),
    /// Known command with malformed arguments; `offset` points into the
    /// trimmed line.
    InvalidArguments {
        command: &'static str,
        usage: &'static str,
        offset: usize,
    },
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => f.write_str("empty command"),
            ParseError::UnknownCommand(word) => {
                write!(f, "unknown command `{word}` (try `help`)")
            }
            ParseError::InvalidArguments {
                command,
                usage,
                offset,
            } => write!(f, "invalid `{command}` at column {offset}; usage: {usage}"),
        }
    }
}

/// Parses one console line.
pub fn parse(line: &str) -> Result<ConsoleCommand<'_>, ParseError<'_>> {
    let line = line.trim();
    let word = line.split_whitespace().next().ok_or(ParseError::Empty)?;
    let spec = catalog::find(word).ok_or(ParseError::UnknownCommand(word))?;

    command
        .parse(line)
        .map_err(|err| ParseError::InvalidArguments {
            command: spec.name,
            usage: spec.usage,
            offset: err.offset(),
        })
}

fn command<'i>(input: &mut &'i str) -> ModalResult<ConsoleCommand<'i>> {
    let word = take_while(1.., |c: char| !c.is_whitespace()).parse_next(input)?;
    let Some(spec) = catalog::find(word) else {
        return fail.parse_next(input);
    };

    let command = arguments(spec, input)?;
    space0.parse_next(input)?;
    Ok(command)
}

fn arguments<'i>(spec: &CommandSpec, input: &mut &'i str) -> ModalResult<ConsoleCommand<'i>> {
    Ok(match spec.tag {
        CommandTag::Toggle => ConsoleCommand::Toggle,
        CommandTag::Start => ConsoleCommand::Start,
        CommandTag::Stop => ConsoleCommand::Stop,
        CommandTag::Status => ConsoleCommand::Status,
        CommandTag::Exit => ConsoleCommand::Exit,
        CommandTag::Collide => collide.parse_next(input)?,
        CommandTag::Frame => preceded(space1, frame_code)
            .map(ConsoleCommand::Frame)
            .parse_next(input)?,
        CommandTag::Help => opt(preceded(space1, topic))
            .map(|topic| ConsoleCommand::Help { topic })
            .parse_next(input)?,
    })
}

fn collide<'i>(input: &mut &'i str) -> ModalResult<ConsoleCommand<'i>> {
    let acceleration = assignment("accel", input)?;
    let power = assignment("power", input)?;
    Ok(ConsoleCommand::Collide {
        acceleration,
        power,
    })
}

fn assignment(key: &'static str, input: &mut &str) -> ModalResult<Axes> {
    preceded((space1, literal(Caseless(key)), '='), axes).parse_next(input)
}

fn axes(input: &mut &str) -> ModalResult<Axes> {
    separated_pair(float, ',', float)
        .map(|(x, y): (f32, f32)| Axes::new(x, y))
        .parse_next(input)
}

fn frame_code(input: &mut &str) -> ModalResult<u8> {
    alt((preceded(literal(Caseless("0x")), hex_uint), dec_uint)).parse_next(input)
}

fn topic<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '?')
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_keywords_case_insensitively() {
        assert_eq!(parse("toggle"), Ok(ConsoleCommand::Toggle));
        assert_eq!(parse("  START "), Ok(ConsoleCommand::Start));
        assert_eq!(parse("Stop"), Ok(ConsoleCommand::Stop));
        assert_eq!(parse("status"), Ok(ConsoleCommand::Status));
        assert_eq!(parse("exit"), Ok(ConsoleCommand::Exit));
        assert_eq!(parse("QUIT"), Ok(ConsoleCommand::Exit));
    }

    #[test]
    fn parses_collision_with_signed_floats() {
        assert_eq!(
            parse("collide accel=0,1 power=-25.5,26"),
            Ok(ConsoleCommand::Collide {
                acceleration: Axes::new(0.0, 1.0),
                power: Axes::new(-25.5, 26.0),
            })
        );
        assert_eq!(
            parse("bump ACCEL=1.0,0.0 Power=60,0"),
            Ok(ConsoleCommand::Collide {
                acceleration: Axes::new(1.0, 0.0),
                power: Axes::new(60.0, 0.0),
            })
        );
    }

    #[test]
    fn parses_frame_codes_in_decimal_and_hex() {
        assert_eq!(parse("frame 3"), Ok(ConsoleCommand::Frame(3)));
        assert_eq!(parse("frame 0x2A"), Ok(ConsoleCommand::Frame(0x2a)));
    }

    #[test]
    fn parses_help_with_optional_topic() {
        assert_eq!(parse("help"), Ok(ConsoleCommand::Help { topic: None }));
        assert_eq!(
            parse("help collide"),
            Ok(ConsoleCommand::Help {
                topic: Some("collide")
            })
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("reboot now"), Err(ParseError::UnknownCommand("reboot")));
        assert!(matches!(
            parse("collide accel=1 power=2,3"),
            Err(ParseError::InvalidArguments {
                command: "collide",
                ..
            })
        ));
        assert!(matches!(
            parse("frame 300"),
            Err(ParseError::InvalidArguments { command: "frame", .. })
        ));
        assert!(matches!(
            parse("toggle now"),
            Err(ParseError::InvalidArguments {
                command: "toggle",
                ..
            })
        ));
    }
}
