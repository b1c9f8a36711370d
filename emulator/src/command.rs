//! Operator console grammar.
//!
//! ```text
//! press <button> [passes]   hold a button for N passes, then release
//! hold <button>             keep a button down across ticks
//! release                   let go of every held button
//! tick [count]              advance both contexts by N periods
//! line <bits>|auto          inject a sensor frame, or return to the track model
//! lift | place              take the robot off the track / put it back
//! status [parameter]        tuning values and live readout
//! screen                    the two display rows
//! help                      command summary
//! ```

use std::fmt;

use follower_core::buttons::Button;
use follower_core::sensors::{SENSOR_COUNT, SensorFrame};
use follower_core::tuning::Parameter;
use winnow::ascii::{dec_uint, space0, space1};
use winnow::combinator::{delimited, separated};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

/// Longest press or tick run accepted from one command.
pub const MAX_REPEAT: u32 = 10_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameSource {
    Track,
    Fixed(SensorFrame),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Press { button: Button, passes: u32 },
    Hold(Button),
    Release,
    Tick(u32),
    Line(FrameSource),
    Lift,
    Place,
    Status(Option<Parameter>),
    Screen,
    Help,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CommandError {
    Syntax(String),
    UnknownButton(String),
    UnknownParameter(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Syntax(detail) => write!(f, "syntax {detail}"),
            CommandError::UnknownButton(tag) => {
                write!(f, "unknown button `{tag}` (select, dec, inc, run)")
            }
            CommandError::UnknownParameter(tag) => {
                write!(f, "unknown parameter `{tag}` (kp, ki, kd, min-speed, sensors)")
            }
        }
    }
}

impl std::error::Error for CommandError {}

fn word<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |ch: char| !ch.is_whitespace()).parse_next(input)
}

fn words<'s>(input: &mut &'s str) -> ModalResult<Vec<&'s str>> {
    delimited(space0, separated(1.., word, space1), space0).parse_next(input)
}

fn sensor_bits<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(usize::from(SENSOR_COUNT), ['0', '1']).parse_next(input)
}

fn count(token: &str, what: &str) -> Result<u32, CommandError> {
    let value = dec_uint::<_, u32, ContextError>.parse(token).map_err(|_| {
        CommandError::Syntax(format!("{what} must be a whole number, got `{token}`"))
    })?;
    if value == 0 || value > MAX_REPEAT {
        return Err(CommandError::Syntax(format!(
            "{what} must be between 1 and {MAX_REPEAT}"
        )));
    }
    Ok(value)
}

fn button(token: &str) -> Result<Button, CommandError> {
    Button::from_tag(token).ok_or_else(|| CommandError::UnknownButton(token.to_string()))
}

fn frame(token: &str) -> Result<FrameSource, CommandError> {
    if token.eq_ignore_ascii_case("auto") {
        return Ok(FrameSource::Track);
    }
    let bits = sensor_bits.parse(token).map_err(|_| {
        CommandError::Syntax(format!(
            "expected {SENSOR_COUNT} sensor bits (sensor 0 first) or `auto`, got `{token}`"
        ))
    })?;
    let mask = bits
        .chars()
        .enumerate()
        .filter(|(_, ch)| *ch == '1')
        .fold(0u8, |mask, (index, _)| mask | (1 << index));
    Ok(FrameSource::Fixed(SensorFrame::from_bits(mask)))
}

/// Parses one console line.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let tokens = words
        .parse(line)
        .map_err(|_| CommandError::Syntax("empty command".to_string()))?;
    let Some((verb, args)) = tokens.split_first() else {
        return Err(CommandError::Syntax("empty command".to_string()));
    };
    let verb = verb.to_ascii_lowercase();

    let command = match (verb.as_str(), args) {
        ("press", [tag]) => Command::Press {
            button: button(tag)?,
            passes: 1,
        },
        ("press", [tag, passes]) => Command::Press {
            button: button(tag)?,
            passes: count(passes, "passes")?,
        },
        ("hold", [tag]) => Command::Hold(button(tag)?),
        ("release", []) => Command::Release,
        ("tick", []) => Command::Tick(1),
        ("tick", [ticks]) => Command::Tick(count(ticks, "ticks")?),
        ("line", [source]) => Command::Line(frame(source)?),
        ("lift", []) => Command::Lift,
        ("place", []) => Command::Place,
        ("status", []) => Command::Status(None),
        ("status", [tag]) => Command::Status(Some(
            Parameter::from_tag(tag)
                .ok_or_else(|| CommandError::UnknownParameter((*tag).to_string()))?,
        )),
        ("screen", []) => Command::Screen,
        ("help", _) => Command::Help,
        (
            "press" | "hold" | "release" | "tick" | "line" | "lift" | "place" | "status"
            | "screen",
            _,
        ) => {
            return Err(CommandError::Syntax(format!(
                "wrong arguments for `{verb}`, see `help`"
            )));
        }
        _ => return Err(CommandError::Syntax(format!("unknown command `{verb}`"))),
    };
    Ok(command)
}
