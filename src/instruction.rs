//! Pairs a [`Command`] with the optional string payload that accompanies
//! `Text`/`StrokeText`/`Font` commands in the textual format (spec.md §4.2,
//! §4.3). On the wire, a `DATA` entry ahead of the command carries this
//! payload (spec.md §3); at the `Command` level — the shape the formatter
//! and parser actually exchange — it travels alongside as a plain `String`
//! rather than a second decode pass over `DATA` continuations.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use crate::entry::Command;

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub command: Command,
    pub text: Option<String>,
}

impl Instruction {
    pub fn new(command: Command) -> Self {
        Instruction { command, text: None }
    }

    pub fn with_text(command: Command, text: impl Into<String>) -> Self {
        Instruction { command, text: Some(text.into()) }
    }
}

impl From<Command> for Instruction {
    fn from(command: Command) -> Self {
        Instruction::new(command)
    }
}
