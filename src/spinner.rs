//! Client handle for one animated status line.
//!
//! A [`Spinner`] registers with the coordinator when it starts and never
//! touches the terminal itself. Its terminal transitions ([`Spinner::stop`],
//! [`Spinner::success`], [`Spinner::error`], [`Spinner::replace`]) return
//! only after the final line has been written, so anything the caller prints
//! afterwards lands below it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use tokio::sync::OnceCell;

use crate::coordinator::{CoordinatorHandle, SpinnerSpec, Update};
use crate::lines::LineId;
use crate::style::{Completion, CompletionKind};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique spinner identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpinnerId(u64);

impl SpinnerId {
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SpinnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpinnerState {
    Created = 0,
    Animating = 1,
    Stopped = 2,
    Succeeded = 3,
    Errored = 4,
    Replaced = 5,
}

impl SpinnerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Animating,
            2 => Self::Stopped,
            3 => Self::Succeeded,
            4 => Self::Errored,
            _ => Self::Replaced,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Created | Self::Animating)
    }
}

impl From<CompletionKind> for SpinnerState {
    fn from(kind: CompletionKind) -> Self {
        match kind {
            CompletionKind::Stopped => Self::Stopped,
            CompletionKind::Succeeded => Self::Succeeded,
            CompletionKind::Errored => Self::Errored,
            CompletionKind::Replaced => Self::Replaced,
        }
    }
}

/// A running spinner. Clones share state, so a spinner can be finished
/// from any task holding a clone.
#[derive(Debug, Clone)]
pub struct Spinner {
    id: SpinnerId,
    line: Option<LineId>,
    state: Arc<AtomicU8>,
    finished: Arc<OnceCell<()>>,
    coordinator: CoordinatorHandle,
}

impl Spinner {
    /// Register with the coordinator. Animation starts on the next tick.
    pub async fn start(coordinator: CoordinatorHandle, spec: SpinnerSpec) -> Self {
        let id = spec.id;
        let line = coordinator.register(spec).await;
        let state = if line.is_some() {
            SpinnerState::Animating
        } else {
            SpinnerState::Created
        };
        Self {
            id,
            line,
            state: Arc::new(AtomicU8::new(state as u8)),
            finished: Arc::new(OnceCell::new()),
            coordinator,
        }
    }

    pub fn id(&self) -> SpinnerId {
        self.id
    }

    /// Line assigned at registration. `None` if the coordinator was gone.
    pub fn line(&self) -> Option<LineId> {
        self.line
    }

    pub fn state(&self) -> SpinnerState {
        SpinnerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Change the message. May be dropped under load.
    pub async fn set_message(&self, text: impl Into<String>) {
        if self.state().is_terminal() {
            return;
        }
        self.coordinator
            .submit(Update::Message {
                id: self.id,
                text: text.into(),
            })
            .await;
    }

    /// Jump to a frame (wrapped to the frame count). May be dropped under load.
    pub async fn set_frame(&self, index: usize) {
        if self.state().is_terminal() {
            return;
        }
        self.coordinator
            .submit(Update::Frame { id: self.id, index })
            .await;
    }

    /// Finish, leaving the current message without a glyph.
    pub async fn stop(&self) {
        self.finish(Completion::stop()).await;
    }

    pub async fn success(&self, message: impl Into<String>) {
        self.finish(Completion::success(message)).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.finish(Completion::error(message)).await;
    }

    /// Alias of [`Spinner::error`].
    pub async fn fail(&self, message: impl Into<String>) {
        self.error(message).await;
    }

    /// Finish with a custom message in info styling.
    pub async fn replace(&self, message: impl Into<String>) {
        self.finish(Completion::replace(message)).await;
    }

    /// The first caller wins; everyone else waits until the winner's
    /// completion has been written, then returns without effect.
    async fn finish(&self, completion: Completion) {
        self.finished
            .get_or_init(move || async move {
                self.state
                    .store(SpinnerState::from(completion.kind) as u8, Ordering::Release);
                self.coordinator
                    .submit(Update::Complete {
                        id: self.id,
                        completion,
                    })
                    .await;
            })
            .await;
    }
}
