//! Diagnostic side channel.
//!
//! The coordinator emits lifecycle events here when diagnostics are enabled.
//! Nothing on this bus feeds back into rendering. Built on
//! [`tokio::sync::broadcast`] so tests and tools can listen independently.

use tokio::sync::broadcast;

use crate::coordinator::Mode;
use crate::lines::LineId;
use crate::spinner::SpinnerId;
use crate::style::CompletionKind;

/// Events that flow out of the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Switched between idle pass-through and animating.
    ModeChanged { mode: Mode },
    Registered { id: SpinnerId, line: LineId },
    Completed {
        id: SpinnerId,
        line: LineId,
        kind: CompletionKind,
    },
    /// A frame or message update was dropped on a full queue.
    UpdateDropped { id: SpinnerId },
    /// Reserved lines returned to the pool by a cleanup pass.
    Reclaimed { count: usize },
}

/// A broadcast channel any component can emit to or subscribe from.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Past events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
