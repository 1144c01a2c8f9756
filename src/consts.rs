//! Project-wide constants.

use std::time::Duration;

/// Animation tick shared by every spinner in terminal mode.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(80);

/// How often reserved lines are checked for reclaim.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5);

/// How long a freed line is held back before it may be reused.
pub const DEFAULT_RESERVE_TIMEOUT: Duration = Duration::from_secs(3);

/// How often a running spinner's message is reprinted when output is not a terminal.
pub const DEFAULT_PLAIN_REPRINT_INTERVAL: Duration = Duration::from_secs(5);

/// Capacity of the coordinator and cursor request queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Spaces between a glyph and its message.
pub const DEFAULT_PADDING: usize = 1;

/// Padding values above this are clamped.
pub const MAX_PADDING: usize = 8;

/// Spaces per indentation level.
pub const INDENT_WIDTH: usize = 2;

/// Forces terminal (`1`/`true`) or plain (`0`/`false`) rendering.
pub const TERMINAL_ENV: &str = "MULTISPIN_TERMINAL";

/// Diagnostic verbosity: `off`, `basic` or `verbose`.
pub const DEBUG_ENV: &str = "MULTISPIN_DEBUG";

/// Whitespace prefix for an indentation level.
pub fn indent(level: usize) -> String {
    " ".repeat(level * INDENT_WIDTH)
}
