//! Deciding whether output goes to a live terminal.

use std::io::{self, IsTerminal};

use crate::output::Sink;

/// Standard stream a logger renders to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    #[default]
    Stderr,
}

impl Stream {
    pub fn is_terminal(self) -> bool {
        match self {
            Self::Stdout => io::stdout().is_terminal(),
            Self::Stderr => io::stderr().is_terminal(),
        }
    }

    pub fn sink(self) -> Sink {
        match self {
            Self::Stdout => Box::new(io::stdout()),
            Self::Stderr => Box::new(io::stderr()),
        }
    }
}

/// An explicit override wins; otherwise ask the OS.
pub fn detect(override_flag: Option<bool>, stream: Stream) -> bool {
    override_flag.unwrap_or_else(|| stream.is_terminal())
}

/// Parse a boolean-ish environment value.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
