//! The facade a leveled logger builds on: indentation, plain lines and
//! spinner creation, all routed through one coordinator.

use std::time::Duration;

use crossterm::style::Color;

use crate::config::Config;
use crate::consts::{DEFAULT_PADDING, DEFAULT_TICK_INTERVAL, indent};
use crate::coordinator::{self, CoordinatorHandle, SpinnerSpec};
use crate::frames;
use crate::output::Sink;
use crate::spinner::{Spinner, SpinnerId};
use crate::terminal;

/// Writes plain lines and owns spinners. Must be created inside a tokio
/// runtime. Clones share the same coordinator.
#[derive(Debug, Clone)]
pub struct Logger {
    coordinator: CoordinatorHandle,
    indent: usize,
}

impl Logger {
    /// Render to the configured standard stream.
    pub fn new(config: Config) -> Self {
        let terminal = terminal::detect(config.terminal, config.stream);
        let sink = config.stream.sink();
        Self::spawn(config, sink, terminal)
    }

    /// [`Logger::new`] with [`Config::from_env`].
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    /// Render into an arbitrary sink. Without an explicit
    /// [`Config::terminal`] the sink is treated as plain output.
    pub fn with_sink(config: Config, sink: Sink) -> Self {
        let terminal = config.terminal.unwrap_or(false);
        Self::spawn(config, sink, terminal)
    }

    fn spawn(config: Config, sink: Sink, terminal: bool) -> Self {
        Self {
            coordinator: coordinator::spawn(config, sink, terminal),
            indent: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.coordinator.is_terminal()
    }

    pub fn indent_level(&self) -> usize {
        self.indent
    }

    /// A logger one level deeper sharing this one's output.
    pub fn indented(&self) -> Self {
        self.with_indent(self.indent + 1)
    }

    pub fn with_indent(&self, level: usize) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            indent: level,
        }
    }

    pub fn coordinator(&self) -> &CoordinatorHandle {
        &self.coordinator
    }

    /// Print a plain line. While spinners animate in a terminal the line
    /// goes below them and they keep animating above it.
    pub async fn println(&self, text: impl AsRef<str>) {
        let line = format!("{}{}", indent(self.indent), text.as_ref());
        self.coordinator.print(line).await;
    }

    /// Configure a spinner. Indentation is bound now, not at start.
    pub fn spinner(&self, message: impl Into<String>) -> SpinnerBuilder {
        SpinnerBuilder {
            coordinator: self.coordinator.clone(),
            indent: self.indent,
            message: message.into(),
            frames: frames::to_owned(frames::DOTS),
            color: Color::Cyan,
            interval: DEFAULT_TICK_INTERVAL,
            padding: DEFAULT_PADDING,
        }
    }

    /// Start a spinner in one call.
    pub async fn create_spinner(
        &self,
        message: impl Into<String>,
        frame_set: &[&str],
        color: Color,
        interval: Duration,
    ) -> Spinner {
        self.spinner(message)
            .frames(frame_set.iter().copied())
            .color(color)
            .interval(interval)
            .start()
            .await
    }

    /// Stop rendering. Spinners still running are left as they are.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }
}

/// Builder returned by [`Logger::spinner`].
#[derive(Debug)]
pub struct SpinnerBuilder {
    coordinator: CoordinatorHandle,
    indent: usize,
    message: String,
    frames: Vec<String>,
    color: Color,
    interval: Duration,
    padding: usize,
}

impl SpinnerBuilder {
    /// Empty sets fall back to a built-in two-glyph default.
    pub fn frames<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frames = frames.into_iter().map(Into::into).collect();
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spaces between glyph and message; large values are clamped.
    pub fn padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub async fn start(self) -> Spinner {
        let spec = SpinnerSpec {
            id: SpinnerId::next(),
            message: self.message,
            frames: frames::normalize(self.frames),
            color: self.color,
            padding: self.padding,
            indent: self.indent,
            interval: self.interval,
        };
        Spinner::start(self.coordinator, spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SharedBuffer;

    fn plain_logger() -> (Logger, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let logger = Logger::with_sink(Config::default(), buffer.sink());
        (logger, buffer)
    }

    #[tokio::test]
    async fn sink_without_override_is_plain() {
        let (logger, _) = plain_logger();
        assert!(!logger.is_terminal());
    }

    #[tokio::test]
    async fn println_applies_indentation() {
        let (logger, buffer) = plain_logger();
        logger.println("top").await;
        logger.indented().println("nested").await;
        assert_eq!(buffer.contents(), "top\n  nested\n");
    }

    #[tokio::test]
    async fn spinner_binds_indent_at_creation() {
        let (logger, buffer) = plain_logger();
        let child = logger.indented();
        let builder = child.spinner("child task");
        let spinner = builder.start().await;
        spinner.success("child done").await;
        assert!(buffer.contents().contains("  ✓ child done"));
    }

    #[tokio::test]
    async fn create_spinner_with_empty_frames_falls_back() {
        let (logger, buffer) = plain_logger();
        let spinner = logger
            .create_spinner("fallback", &[], Color::Green, Duration::from_millis(50))
            .await;
        spinner.stop().await;
        assert!(buffer.contents().starts_with("- fallback\n"));
    }

    #[tokio::test]
    async fn builder_padding_is_clamped() {
        let (logger, buffer) = plain_logger();
        let spinner = logger
            .spinner("wide")
            .frames(["*"])
            .padding(1_000)
            .start()
            .await;
        spinner.stop().await;
        let first = buffer.contents().lines().next().unwrap().to_string();
        assert_eq!(first, format!("*{}wide", " ".repeat(crate::consts::MAX_PADDING)));
    }

    #[tokio::test]
    async fn clones_share_output() {
        let (logger, buffer) = plain_logger();
        let other = logger.clone();
        logger.println("one").await;
        other.println("two").await;
        assert_eq!(buffer.contents(), "one\ntwo\n");
    }
}
