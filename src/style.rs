//! Composition of spinner and completion lines.

use crossterm::style::{Color, Stylize};

use crate::consts::{MAX_PADDING, indent};

/// The terminal transition a spinner finished with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Stopped,
    Succeeded,
    Errored,
    Replaced,
}

impl CompletionKind {
    pub fn bullet(self) -> Option<&'static str> {
        match self {
            Self::Stopped => None,
            Self::Succeeded => Some("✓"),
            Self::Errored => Some("✗"),
            Self::Replaced => Some("ℹ"),
        }
    }

    pub fn color(self) -> Option<Color> {
        match self {
            Self::Stopped => None,
            Self::Succeeded => Some(Color::Green),
            Self::Errored => Some(Color::Red),
            Self::Replaced => Some(Color::Blue),
        }
    }
}

/// Final text rendered in place of a spinner.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub kind: CompletionKind,
    /// `None` keeps the spinner's current message.
    pub text: Option<String>,
    pub color: Option<Color>,
    pub bullet: Option<&'static str>,
}

impl Completion {
    fn new(kind: CompletionKind, text: Option<String>) -> Self {
        Self {
            kind,
            text,
            color: kind.color(),
            bullet: kind.bullet(),
        }
    }

    pub fn stop() -> Self {
        Self::new(CompletionKind::Stopped, None)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(CompletionKind::Succeeded, Some(text.into()))
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(CompletionKind::Errored, Some(text.into()))
    }

    pub fn replace(text: impl Into<String>) -> Self {
        Self::new(CompletionKind::Replaced, Some(text.into()))
    }
}

pub fn clamp_padding(padding: usize) -> usize {
    padding.min(MAX_PADDING)
}

/// Colorize `text`, but only when writing to a terminal.
pub fn paint(text: &str, color: Option<Color>, terminal: bool) -> String {
    match color {
        Some(color) if terminal => text.with(color).to_string(),
        _ => text.to_string(),
    }
}

fn compose(level: usize, marker: Option<String>, padding: usize, message: &str) -> String {
    let mut line = indent(level);
    if let Some(marker) = marker {
        line.push_str(&marker);
        if !message.is_empty() {
            line.push_str(&" ".repeat(clamp_padding(padding).max(1)));
        }
    }
    line.push_str(message);
    line
}

/// One animation frame: indentation, glyph, padding, message.
pub fn spinner_line(
    level: usize,
    glyph: &str,
    color: Color,
    padding: usize,
    message: &str,
    terminal: bool,
) -> String {
    compose(level, Some(paint(glyph, Some(color), terminal)), padding, message)
}

/// A completion, falling back to `current` when it carries no text.
pub fn completion_line(
    level: usize,
    padding: usize,
    completion: &Completion,
    current: &str,
    terminal: bool,
) -> String {
    let text = completion.text.as_deref().unwrap_or(current);
    let marker = completion
        .bullet
        .map(|bullet| paint(bullet, completion.color, terminal));
    compose(level, marker, padding, text)
}
