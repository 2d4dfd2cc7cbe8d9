//! Controller command parsing.
//!
//! One command per stdin line:
//!
//! ```text
//! into | over | continue | pause | stack
//! bp add <kind> [x y z] | bp rm <id> | bp on <id> | bp off <id> | bp list
//! kinds | quit
//! ```

use stagetrace_types::{BlockPos, BreakpointId};

/// A parsed controller command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Step into the next stage.
    Into,
    /// Step over the stage the simulation is paused at.
    Over,
    /// Resume without stepping.
    Continue,
    /// Pause at the next stage.
    Pause,
    /// Print the paused stack.
    Stack,
    /// Add a breakpoint of a kind, optionally at a position.
    AddBreakpoint {
        /// Kind identifier.
        kind: String,
        /// Target position, if given.
        pos: Option<BlockPos>,
    },
    /// Remove a breakpoint.
    RemoveBreakpoint(BreakpointId),
    /// Enable or disable a breakpoint.
    ToggleBreakpoint(BreakpointId, bool),
    /// List breakpoints.
    ListBreakpoints,
    /// List breakpoint kinds.
    Kinds,
    /// Stop the host.
    Quit,
}

impl Command {
    /// Whether the command only makes sense while the simulation is paused.
    pub const fn needs_pause(&self) -> bool {
        matches!(self, Self::Into | Self::Over | Self::Continue)
    }
}

/// A line that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Blank line.
    #[error("empty command")]
    Empty,
    /// First word is not a command.
    #[error("unknown command `{0}`")]
    Unknown(String),
    /// Arguments are missing or malformed.
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one input line.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };
    let command = match head {
        "into" | "i" => Command::Into,
        "over" | "o" => Command::Over,
        "continue" | "c" => Command::Continue,
        "pause" | "p" => Command::Pause,
        "stack" | "s" => Command::Stack,
        "kinds" => Command::Kinds,
        "quit" | "q" => Command::Quit,
        "bp" => return parse_breakpoint(words),
        other => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(command)
}

fn parse_breakpoint<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<Command, CommandError> {
    match words.next() {
        Some("add") => {
            let kind = words
                .next()
                .ok_or(CommandError::Usage("bp add <kind> [x y z]"))?
                .to_owned();
            let coords: Vec<&str> = words.collect();
            let pos = match coords.as_slice() {
                [] => None,
                [x, y, z] => Some(BlockPos::new(coord(x)?, coord(y)?, coord(z)?)),
                _ => return Err(CommandError::Usage("bp add <kind> [x y z]")),
            };
            Ok(Command::AddBreakpoint { kind, pos })
        }
        Some("rm") => Ok(Command::RemoveBreakpoint(breakpoint_id(words.next())?)),
        Some("on") => Ok(Command::ToggleBreakpoint(breakpoint_id(words.next())?, true)),
        Some("off") => Ok(Command::ToggleBreakpoint(breakpoint_id(words.next())?, false)),
        Some("list") | None => Ok(Command::ListBreakpoints),
        Some(_) => Err(CommandError::Usage("bp add|rm|on|off|list")),
    }
}

fn coord(word: &str) -> Result<i32, CommandError> {
    word.parse()
        .ok()
        .ok_or(CommandError::Usage("coordinates are integers"))
}

fn breakpoint_id(word: Option<&str>) -> Result<BreakpointId, CommandError> {
    word.map(|w| w.trim_start_matches('#'))
        .and_then(|w| w.parse().ok())
        .map(BreakpointId)
        .ok_or(CommandError::Usage("bp rm|on|off <id>"))
}
