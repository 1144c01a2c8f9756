//! Runtime configuration for the coordinator and its writer.
//!
//! Everything is an explicit value handed to [`Logger`](crate::Logger) at
//! construction. Environment variables are read once, by
//! [`Config::from_env`], never consulted again afterwards.

use std::time::Duration;

use crate::consts::{
    DEBUG_ENV, DEFAULT_CLEANUP_INTERVAL, DEFAULT_PLAIN_REPRINT_INTERVAL, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_RESERVE_TIMEOUT, DEFAULT_TICK_INTERVAL, TERMINAL_ENV,
};
use crate::terminal::{Stream, parse_flag};

/// How much the diagnostic side channel reports. Never affects rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    #[default]
    Off,
    /// Lifecycle events: registrations, completions, mode changes.
    Basic,
    /// Also dropped updates, reclaims and raw cursor operations.
    Verbose,
}

impl Verbosity {
    /// Parse a verbosity setting. Unknown values mean [`Verbosity::Off`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "basic" => Self::Basic,
            "2" | "verbose" | "trace" | "all" => Self::Verbose,
            _ => Self::Off,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Animation tick shared by all spinners.
    pub tick_interval: Duration,
    /// Housekeeping tick that reclaims reserved lines.
    pub cleanup_interval: Duration,
    /// Minimum age of a reserved line before it can be reused.
    pub reserve_timeout: Duration,
    /// Plain-mode reprint period for running spinners. `None` prints once.
    pub plain_reprint_interval: Option<Duration>,
    /// Bound on queued coordinator and cursor requests.
    pub queue_capacity: usize,
    /// Terminal override. `None` asks the OS about [`Config::stream`].
    pub terminal: Option<bool>,
    /// Stream spinners render to.
    pub stream: Stream,
    pub verbosity: Verbosity,
    /// Panic on internal bookkeeping violations instead of logging them.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            reserve_timeout: DEFAULT_RESERVE_TIMEOUT,
            plain_reprint_interval: Some(DEFAULT_PLAIN_REPRINT_INTERVAL),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            terminal: None,
            stream: Stream::Stderr,
            verbosity: Verbosity::Off,
            strict: false,
        }
    }
}

impl Config {
    /// Defaults, overridden by `MULTISPIN_TERMINAL` and `MULTISPIN_DEBUG`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = lookup(TERMINAL_ENV) {
            config.terminal = parse_flag(&value);
        }
        if let Some(value) = lookup(DEBUG_ENV) {
            config.verbosity = Verbosity::parse(&value);
        }
        config
    }

    /// Normalize out-of-range values instead of rejecting them.
    pub(crate) fn sanitized(mut self) -> Self {
        let floor = Duration::from_millis(1);
        self.tick_interval = self.tick_interval.max(floor);
        self.cleanup_interval = self.cleanup_interval.max(floor);
        self.queue_capacity = self.queue_capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.tick_interval, Duration::from_millis(80));
        assert_eq!(config.cleanup_interval, Duration::from_secs(5));
        assert_eq!(config.reserve_timeout, Duration::from_secs(3));
        assert_eq!(config.terminal, None);
        assert_eq!(config.verbosity, Verbosity::Off);
        assert!(!config.strict);
    }

    #[test]
    fn verbosity_parse() {
        assert_eq!(Verbosity::parse("basic"), Verbosity::Basic);
        assert_eq!(Verbosity::parse("1"), Verbosity::Basic);
        assert_eq!(Verbosity::parse(" Verbose "), Verbosity::Verbose);
        assert_eq!(Verbosity::parse("2"), Verbosity::Verbose);
        assert_eq!(Verbosity::parse("off"), Verbosity::Off);
        assert_eq!(Verbosity::parse("garbage"), Verbosity::Off);
    }

    #[test]
    fn verbosity_is_ordered() {
        assert!(Verbosity::Off < Verbosity::Basic);
        assert!(Verbosity::Basic < Verbosity::Verbose);
    }

    #[test]
    fn lookup_without_vars_is_default() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.terminal, None);
        assert_eq!(config.verbosity, Verbosity::Off);
    }

    #[test]
    fn lookup_reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("MULTISPIN_TERMINAL", "false"),
            ("MULTISPIN_DEBUG", "verbose"),
        ]));
        assert_eq!(config.terminal, Some(false));
        assert_eq!(config.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn unparsable_terminal_flag_is_ignored() {
        let config = Config::from_lookup(lookup(&[("MULTISPIN_TERMINAL", "maybe")]));
        assert_eq!(config.terminal, None);
    }

    #[test]
    fn sanitized_clamps_zero_values() {
        let config = Config {
            tick_interval: Duration::ZERO,
            cleanup_interval: Duration::ZERO,
            queue_capacity: 0,
            ..Config::default()
        }
        .sanitized();
        assert!(config.tick_interval > Duration::ZERO);
        assert!(config.cleanup_interval > Duration::ZERO);
        assert_eq!(config.queue_capacity, 1);
    }
}
