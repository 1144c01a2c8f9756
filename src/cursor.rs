//! The single writer.
//!
//! [`spawn`] starts a task that owns the output sink and the authoritative
//! cursor line. Every escape sequence in the crate goes through it, one
//! request at a time, and each request is answered only after its bytes are
//! flushed. Line numbers count rows from where the service started.
//!
//! Without a terminal, moves are ignored and in-place writes become appended
//! lines.

use std::io::Write;

use crossterm::cursor::{MoveDown, MoveUp};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::config::Verbosity;
use crate::output::Sink;

#[derive(Debug)]
enum Op {
    MoveUp(usize),
    MoveDown(usize),
    WriteLine(String),
    WriteInPlace(String),
    Flush,
    Position,
}

struct Request {
    op: Op,
    /// Cursor line after the op was applied.
    reply: oneshot::Sender<usize>,
}

struct CursorService {
    out: Sink,
    line: usize,
    terminal: bool,
    verbosity: Verbosity,
}

impl CursorService {
    fn apply(&mut self, op: Op) -> usize {
        if self.verbosity >= Verbosity::Verbose {
            trace!(?op, line = self.line, "cursor op");
        }

        let result = match op {
            Op::Position => return self.line,
            Op::Flush => Ok(()),
            Op::MoveUp(n) if self.terminal => {
                let n = n.min(self.line);
                self.line -= n;
                move_lines(&mut self.out, n, true)
            }
            Op::MoveDown(n) if self.terminal => {
                self.line += n;
                move_lines(&mut self.out, n, false)
            }
            Op::MoveUp(_) | Op::MoveDown(_) => return self.line,
            Op::WriteInPlace(content) if self.terminal => {
                write!(self.out, "\r")
                    .and_then(|()| queue!(self.out, Clear(ClearType::CurrentLine)))
                    .and_then(|()| self.out.write_all(content.as_bytes()))
            }
            Op::WriteLine(content) | Op::WriteInPlace(content) => {
                self.line += 1;
                let prefix = if self.terminal { "\r" } else { "" };
                writeln!(self.out, "{prefix}{content}")
            }
        };

        if let Err(err) = result.and_then(|()| self.out.flush()) {
            if self.verbosity >= Verbosity::Verbose {
                trace!(%err, "write failed, output dropped");
            }
        }
        self.line
    }
}

fn move_lines(out: &mut Sink, n: usize, up: bool) -> std::io::Result<()> {
    let mut left = n;
    while left > 0 {
        let step = left.min(u16::MAX as usize) as u16;
        if up {
            queue!(out, MoveUp(step))?;
        } else {
            queue!(out, MoveDown(step))?;
        }
        left -= step as usize;
    }
    Ok(())
}

/// Start the writer task. It stops once every handle is dropped.
pub fn spawn(
    out: Sink,
    terminal: bool,
    capacity: usize,
    verbosity: Verbosity,
) -> (CursorHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Request>(capacity.max(1));
    let mut service = CursorService {
        out,
        line: 0,
        terminal,
        verbosity,
    };

    let task = tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            let line = service.apply(request.op);
            let _ = request.reply.send(line);
        }
    });

    (CursorHandle { tx, terminal }, task)
}

/// Client side of the writer. Every call waits until the op is applied.
/// Once the service is gone calls do nothing and report line 0.
#[derive(Debug, Clone)]
pub struct CursorHandle {
    tx: mpsc::Sender<Request>,
    terminal: bool,
}

impl CursorHandle {
    async fn request(&self, op: Op) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Request { op, reply }).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    pub async fn move_up(&self, n: usize) -> usize {
        self.request(Op::MoveUp(n)).await
    }

    pub async fn move_down(&self, n: usize) -> usize {
        self.request(Op::MoveDown(n)).await
    }

    /// Content plus newline. Establishes a new row.
    pub async fn write_line(&self, content: impl Into<String>) -> usize {
        self.request(Op::WriteLine(content.into())).await
    }

    /// Clear the current row and write content, no newline.
    pub async fn write_in_place(&self, content: impl Into<String>) -> usize {
        self.request(Op::WriteInPlace(content.into())).await
    }

    pub async fn position(&self) -> usize {
        self.request(Op::Position).await
    }

    /// Wait until everything queued before this call has reached the sink.
    pub async fn flush(&self) -> usize {
        self.request(Op::Flush).await
    }

    /// Move relative to the current position so the cursor ends on `target`.
    pub async fn move_to(&self, target: usize) -> usize {
        let current = self.position().await;
        if target < current {
            self.move_up(current - target).await
        } else if target > current {
            self.move_down(target - current).await
        } else {
            current
        }
    }

    /// Render `content` on row `line`, where rows below `bottom` already
    /// exist on screen. Existing rows are rewritten in place; a new row is
    /// reached from the bottom, padding any gap with blank rows, and
    /// established with a newline. Returns the new bottom.
    ///
    /// Callers must not interleave other writers between the moves and the
    /// write; the coordinator is the only caller.
    pub async fn draw_at(&self, line: usize, bottom: usize, content: &str) -> usize {
        if !self.terminal {
            self.write_line(content).await;
            return bottom;
        }

        if line < bottom {
            self.move_to(line).await;
            self.write_in_place(content).await;
            return bottom;
        }

        self.move_to(bottom).await;
        for _ in bottom..line {
            self.write_line("").await;
        }
        self.write_line(content).await;
        line + 1
    }
}
