//! The actor that owns every running spinner.
//!
//! One task holds the registry, the [`LineTracker`] and the animation
//! clock. Clients talk to it through a [`CoordinatorHandle`]; it talks to
//! the terminal only through the cursor service.
//!
//! Rows are assigned per session: a session starts when the first spinner
//! registers and ends, within the same turn as the last completion, with
//! exactly one trailing newline below the block. Each new line id and each
//! plain line printed during a session takes the next free row, so log
//! output keeps flowing below the spinners instead of waiting for them.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crossterm::style::Color;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, trace, warn};

use crate::config::{Config, Verbosity};
use crate::cursor::{self, CursorHandle};
use crate::events::{Event, EventBus};
use crate::frames;
use crate::lines::{LineId, LineTracker, PoolStats};
use crate::output::Sink;
use crate::spinner::SpinnerId;
use crate::style::{self, Completion};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// No spinners; plain lines pass straight through.
    #[default]
    Idle,
    /// At least one spinner owns a line.
    Animating,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Animating => f.write_str("animating"),
        }
    }
}

/// Everything a spinner registers with.
#[derive(Debug, Clone)]
pub struct SpinnerSpec {
    pub id: SpinnerId,
    pub message: String,
    pub frames: Vec<String>,
    pub color: Color,
    pub padding: usize,
    pub indent: usize,
    /// Minimum time between frame advances.
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub enum Update {
    /// Jump to a frame. Droppable.
    Frame { id: SpinnerId, index: usize },
    /// Replace the message. Droppable.
    Message { id: SpinnerId, text: String },
    /// Final render. Never dropped.
    Complete {
        id: SpinnerId,
        completion: Completion,
    },
}

impl Update {
    pub fn id(&self) -> SpinnerId {
        match self {
            Self::Frame { id, .. } | Self::Message { id, .. } | Self::Complete { id, .. } => *id,
        }
    }
}

/// Point-in-time view of the coordinator, for tests and tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub mode: Mode,
    /// Active spinners and their lines, ascending by line.
    pub lines: Vec<(SpinnerId, LineId)>,
    pub pool: PoolStats,
    pub cursor: usize,
}

impl Snapshot {
    pub fn active(&self) -> usize {
        self.lines.len()
    }

    pub fn line_of(&self, id: SpinnerId) -> Option<LineId> {
        self.lines
            .iter()
            .find(|(owner, _)| *owner == id)
            .map(|(_, line)| *line)
    }
}

#[derive(Debug, Clone)]
struct Registration {
    owner: SpinnerId,
    frames: Vec<String>,
    color: Color,
    padding: usize,
    indent: usize,
    message: String,
    interval: Duration,
    line: LineId,
    frame_index: usize,
    created_at: Instant,
    first_frame_rendered: bool,
    last_advance: Instant,
    last_printed: Instant,
}

impl Registration {
    fn new(spec: SpinnerSpec, line: LineId, now: Instant) -> Self {
        Self {
            owner: spec.id,
            frames: frames::normalize(spec.frames),
            color: spec.color,
            padding: style::clamp_padding(spec.padding),
            indent: spec.indent,
            message: spec.message,
            interval: spec.interval,
            line,
            frame_index: 0,
            created_at: now,
            first_frame_rendered: false,
            last_advance: now,
            last_printed: now,
        }
    }

    fn advance(&mut self, now: Instant) {
        self.frame_index = (self.frame_index + 1) % self.frames.len();
        self.last_advance = now;
    }

    fn render(&self, terminal: bool) -> String {
        let glyph = self
            .frames
            .get(self.frame_index)
            .map_or(frames::FALLBACK[0], String::as_str);
        style::spinner_line(
            self.indent,
            glyph,
            self.color,
            self.padding,
            &self.message,
            terminal,
        )
    }

    fn render_completion(&self, completion: &Completion, terminal: bool) -> String {
        style::completion_line(
            self.indent,
            self.padding,
            completion,
            &self.message,
            terminal,
        )
    }
}

enum Command {
    Register {
        spec: SpinnerSpec,
        reply: oneshot::Sender<LineId>,
    },
    Update {
        update: Update,
        done: Option<oneshot::Sender<()>>,
    },
    Print {
        text: String,
        done: oneshot::Sender<()>,
    },
    Snapshot(oneshot::Sender<Snapshot>),
    Validate(oneshot::Sender<Vec<SpinnerId>>),
    Shutdown(oneshot::Sender<()>),
}

struct Coordinator {
    config: Config,
    terminal: bool,
    registry: HashMap<SpinnerId, Registration>,
    lines: LineTracker,
    cursor: CursorHandle,
    mode: Mode,
    /// Cursor line where the current session started.
    origin: usize,
    /// Cursor row of every line id drawn in the current session.
    rows: HashMap<LineId, usize>,
    /// Next cursor row not yet assigned to a line or a plain print.
    next_row: usize,
    /// First cursor line not yet established on screen.
    bottom: usize,
    events: EventBus,
}

impl Coordinator {
    fn new(config: Config, cursor: CursorHandle, terminal: bool, events: EventBus) -> Self {
        Self {
            lines: LineTracker::new(terminal, config.reserve_timeout),
            config,
            terminal,
            registry: HashMap::new(),
            cursor,
            mode: Mode::Idle,
            origin: 0,
            rows: HashMap::new(),
            next_row: 0,
            bottom: 0,
            events,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cleanup = interval(self.config.cleanup_interval);
        cleanup.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = rx.recv() => {
                    let keep_running = match command {
                        Some(command) => self.handle(command).await,
                        None => {
                            self.leave_block().await;
                            false
                        }
                    };
                    if !keep_running {
                        break;
                    }
                }
                _ = ticker.tick() => self.animate().await,
                _ = cleanup.tick() => self.cleanup(),
            }
        }
        debug!("coordinator stopped");
    }

    /// Returns `false` once the actor should stop.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Register { spec, reply } => {
                let line = self.register(spec).await;
                let _ = reply.send(line);
            }
            Command::Update { update, done } => {
                self.apply(update).await;
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Command::Print { text, done } => {
                self.print(text).await;
                let _ = done.send(());
            }
            Command::Snapshot(reply) => {
                let snapshot = self.snapshot().await;
                let _ = reply.send(snapshot);
            }
            Command::Validate(reply) => {
                let _ = reply.send(self.validate());
            }
            Command::Shutdown(done) => {
                self.leave_block().await;
                self.cursor.flush().await;
                let _ = done.send(());
                return false;
            }
        }
        true
    }

    async fn register(&mut self, spec: SpinnerSpec) -> LineId {
        if let Some(existing) = self.registry.get(&spec.id) {
            return existing.line;
        }
        if self.registry.is_empty() {
            self.enter_session().await;
        }

        let now = Instant::now();
        let id = spec.id;
        let line = self.lines.allocate(id);
        if self.terminal {
            self.assign_row(line);
        }
        let mut registration = Registration::new(spec, line, now);

        if !self.terminal {
            registration.first_frame_rendered = true;
            self.cursor.write_line(registration.render(false)).await;
        }

        self.registry.insert(id, registration);
        self.emit(Event::Registered { id, line }, Verbosity::Basic);
        line
    }

    async fn apply(&mut self, update: Update) {
        match update {
            Update::Frame { id, index } => {
                if let Some(registration) = self.registry.get_mut(&id) {
                    registration.frame_index = index % registration.frames.len();
                }
            }
            Update::Message { id, text } => {
                let Some(registration) = self.registry.get_mut(&id) else {
                    return;
                };
                registration.message = text;
                if !self.terminal {
                    registration.last_printed = Instant::now();
                    let text = registration.render(false);
                    self.cursor.write_line(text).await;
                }
            }
            Update::Complete { id, completion } => self.complete(id, completion).await,
        }
    }

    async fn complete(&mut self, id: SpinnerId, completion: Completion) {
        let Some(registration) = self.registry.remove(&id) else {
            trace!(%id, "completion for unknown spinner ignored");
            return;
        };

        let freed = self.lines.deallocate(id);
        if freed != Some(registration.line) {
            self.violation(format!(
                "spinner {id} registered on line {} but the pool freed {freed:?}",
                registration.line
            ));
        }

        let text = registration.render_completion(&completion, self.terminal);
        self.draw(registration.line, &text).await;
        self.emit(
            Event::Completed {
                id,
                line: registration.line,
                kind: completion.kind,
            },
            Verbosity::Basic,
        );
        if self.config.verbosity >= Verbosity::Verbose {
            trace!(%id, lifetime = ?registration.created_at.elapsed(), "spinner completed");
        }

        if self.registry.is_empty() {
            self.leave_block().await;
        }
    }

    async fn animate(&mut self) {
        if self.registry.is_empty() {
            return;
        }
        let now = Instant::now();
        let slack = self.config.tick_interval / 2;

        // top-to-bottom: a first render establishes its row with a newline
        let mut order: Vec<(LineId, SpinnerId)> = self
            .registry
            .values()
            .map(|r| (r.line, r.owner))
            .collect();
        order.sort_unstable();

        for (line, id) in order {
            let Some(registration) = self.registry.get_mut(&id) else {
                continue;
            };
            let corrupt = registration.frame_index >= registration.frames.len();
            if corrupt {
                registration.frame_index = 0;
            }

            let text = if self.terminal {
                if !registration.first_frame_rendered {
                    registration.first_frame_rendered = true;
                    registration.last_advance = now;
                } else if now.saturating_duration_since(registration.last_advance) + slack
                    >= registration.interval
                {
                    registration.advance(now);
                } else {
                    continue;
                }
                registration.render(true)
            } else {
                match self.config.plain_reprint_interval {
                    Some(every) if now.saturating_duration_since(registration.last_printed) >= every => {
                        registration.last_printed = now;
                        registration.render(false)
                    }
                    _ => continue,
                }
            };

            if corrupt {
                self.violation(format!("spinner {id} had an out-of-range frame index"));
            }
            self.draw(line, &text).await;
        }
    }

    fn cleanup(&mut self) {
        let count = self.lines.reclaim();
        if count > 0 {
            self.emit(Event::Reclaimed { count }, Verbosity::Verbose);
        }
    }

    /// A plain line. During a terminal session it takes the next free row
    /// below everything assigned so far; spinners keep their rows above it.
    async fn print(&mut self, text: String) {
        if self.terminal && self.mode == Mode::Animating {
            let row = self.next_row;
            self.next_row += 1;
            self.bottom = self.cursor.draw_at(row, self.bottom, &text).await;
        } else {
            self.cursor.write_line(text).await;
        }
    }

    /// Row of `line`, assigning the next free one on first use. Recycled
    /// line ids keep the row they had.
    fn assign_row(&mut self, line: LineId) -> usize {
        if let Some(&row) = self.rows.get(&line) {
            return row;
        }
        let row = self.next_row;
        self.next_row += 1;
        self.rows.insert(line, row);
        row
    }

    async fn draw(&mut self, line: LineId, text: &str) {
        if !self.terminal {
            self.cursor.write_line(text).await;
            return;
        }
        let Some(&row) = self.rows.get(&line) else {
            self.violation(format!("line {line} has no row in the current session"));
            return;
        };
        self.bottom = self.cursor.draw_at(row, self.bottom, text).await;
    }

    async fn enter_session(&mut self) {
        self.origin = self.cursor.position().await;
        self.bottom = self.origin;
        self.next_row = self.origin;
        self.rows.clear();
        self.set_mode(Mode::Animating);
    }

    /// Park the cursor on a fresh row under the block and end the session.
    async fn leave_block(&mut self) {
        if self.mode == Mode::Idle {
            return;
        }
        if self.terminal && self.bottom > self.origin {
            self.cursor.move_to(self.bottom - 1).await;
            self.cursor.write_line("").await;
        }
        self.lines.retire();
        self.rows.clear();
        self.set_mode(Mode::Idle);
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.mode = mode;
            if self.config.verbosity >= Verbosity::Basic {
                debug!(%mode, "mode changed");
            }
            self.emit(Event::ModeChanged { mode }, Verbosity::Basic);
        }
    }

    async fn snapshot(&self) -> Snapshot {
        let mut lines: Vec<(SpinnerId, LineId)> = self
            .registry
            .values()
            .map(|r| (r.owner, r.line))
            .collect();
        lines.sort_by_key(|(_, line)| *line);
        Snapshot {
            mode: self.mode,
            lines,
            pool: self.lines.stats(),
            cursor: self.cursor.position().await,
        }
    }

    fn validate(&self) -> Vec<SpinnerId> {
        let mut bad = self.lines.validate();
        for registration in self.registry.values() {
            let owner = registration.owner;
            if self.lines.line_id_of(owner) != Some(registration.line)
                || registration.frame_index >= registration.frames.len()
                || (self.terminal && !self.rows.contains_key(&registration.line))
            {
                bad.push(owner);
            }
        }
        bad.extend(self.lines.owners().filter(|o| !self.registry.contains_key(o)));
        bad.sort();
        bad.dedup();
        bad
    }

    fn violation(&self, message: String) {
        if self.config.strict {
            panic!("spinner bookkeeping violated: {message}");
        }
        warn!(%message, "spinner bookkeeping violated");
    }

    fn emit(&self, event: Event, level: Verbosity) {
        if self.config.verbosity < level {
            return;
        }
        debug!(?event, "coordinator");
        self.events.emit(event);
    }
}

/// Spawn the coordinator and its cursor service on the current runtime.
pub fn spawn(config: Config, sink: Sink, terminal: bool) -> CoordinatorHandle {
    let config = config.sanitized();
    let (cursor, _cursor_task) =
        cursor::spawn(sink, terminal, config.queue_capacity, config.verbosity);
    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let events = EventBus::default();

    let coordinator = Coordinator::new(config.clone(), cursor, terminal, events.clone());
    tokio::spawn(coordinator.run(rx));

    debug!(terminal, verbosity = ?config.verbosity, "coordinator started");
    CoordinatorHandle {
        tx,
        events,
        terminal,
        verbosity: config.verbosity,
    }
}

/// Cheap, cloneable client of the coordinator. Once the coordinator has
/// stopped every call is a no-op.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
    events: EventBus,
    terminal: bool,
    verbosity: Verbosity,
}

impl CoordinatorHandle {
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Register a spinner and return its line.
    pub async fn register(&self, spec: SpinnerSpec) -> Option<LineId> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Register { spec, reply }).await.ok()?;
        rx.await.ok()
    }

    /// Frame and message updates are dropped when the queue is full.
    /// Completions wait for room and return once rendered.
    pub async fn submit(&self, update: Update) {
        if let Update::Complete { .. } = update {
            let (done, rx) = oneshot::channel();
            let command = Command::Update {
                update,
                done: Some(done),
            };
            if self.tx.send(command).await.is_ok() {
                let _ = rx.await;
            }
            return;
        }

        let id = update.id();
        let command = Command::Update { update, done: None };
        if let Err(TrySendError::Full(_)) = self.tx.try_send(command) {
            if self.verbosity >= Verbosity::Verbose {
                trace!(%id, "update dropped, queue full");
                self.events.emit(Event::UpdateDropped { id });
            }
        }
    }

    /// Print a plain line through the same writer as the spinners.
    pub async fn print(&self, text: impl Into<String>) {
        let (done, rx) = oneshot::channel();
        let command = Command::Print {
            text: text.into(),
            done,
        };
        if self.tx.send(command).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn snapshot(&self) -> Option<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Snapshot(reply)).await.ok()?;
        rx.await.ok()
    }

    /// Spinners with inconsistent bookkeeping. Empty when healthy.
    pub async fn validate(&self) -> Vec<SpinnerId> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Validate(reply)).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Stop the coordinator. Unfinished spinners stay on screen as they are.
    pub async fn shutdown(&self) {
        let (done, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(done)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Diagnostic events, emitted only when verbosity allows.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}
