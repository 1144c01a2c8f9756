//! Many concurrent tasks, one terminal: each task owns an animated status
//! line, and every cursor movement and write is serialized through a single
//! writer task.
//!
//! Entry point is [`Logger`]; spinners are created from it and finished with
//! one of the terminal transitions on [`Spinner`].

pub mod config;
pub mod consts;
pub mod coordinator;
pub mod cursor;
pub mod events;
pub mod frames;
pub mod lines;
pub mod logger;
pub mod output;
pub mod spinner;
pub mod style;
pub mod terminal;

pub use config::{Config, Verbosity};
pub use coordinator::{CoordinatorHandle, Mode, Snapshot};
pub use logger::{Logger, SpinnerBuilder};
pub use spinner::{Spinner, SpinnerId, SpinnerState};
