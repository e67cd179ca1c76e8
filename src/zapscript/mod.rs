//! ZapScript data model and the thin text parser.
//!
//! The parser proper is an external collaborator; this module carries the
//! parsed shapes the dispatcher consumes plus a minimal conforming text
//! parser so the runtime is executable end to end.

pub mod parse;

use std::collections::HashMap;

pub use parse::parse_script;

/// One parsed instruction. Immutable after parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Canonical lower-case dotted name, e.g. `launch.title`.
    pub name: String,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Keyword (advanced) arguments.
    pub adv_args: HashMap<String, String>,
}

impl Command {
    pub fn new(name: &str, args: Vec<String>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            args,
            adv_args: HashMap::new(),
        }
    }
}

/// An ordered, finite sequence of commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub name: Option<String>,
    pub version: i64,
    pub commands: Vec<Command>,
}
