#![allow(dead_code)]

use std::time::Duration;

use multispin::output::SharedBuffer;
use multispin::{Config, Logger, Mode, Verbosity};

/// Replays captured output onto a grid, understanding just the sequences the
/// cursor service emits: CR, LF, cursor up/down, clear line, and SGR colors.
pub struct Screen {
    rows: Vec<Vec<char>>,
    row: usize,
    col: usize,
}

impl Screen {
    pub fn replay(raw: &str) -> Self {
        let mut screen = Screen {
            rows: vec![Vec::new()],
            row: 0,
            col: 0,
        };
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\r' => screen.col = 0,
                '\n' => {
                    screen.row += 1;
                    screen.col = 0;
                    screen.grow();
                }
                '\x1b' => {
                    if chars.peek() != Some(&'[') {
                        continue;
                    }
                    chars.next();
                    let mut params = String::new();
                    let mut command = None;
                    for p in chars.by_ref() {
                        if p.is_ascii_digit() || p == ';' {
                            params.push(p);
                        } else {
                            command = Some(p);
                            break;
                        }
                    }
                    let n = params
                        .split(';')
                        .next()
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(1);
                    match command {
                        Some('A') => screen.row = screen.row.saturating_sub(n),
                        Some('B') => {
                            screen.row += n;
                            screen.grow();
                        }
                        Some('K') if params == "2" => screen.rows[screen.row].clear(),
                        Some('G') => screen.col = n.saturating_sub(1),
                        _ => {}
                    }
                }
                c => {
                    let line = &mut screen.rows[screen.row];
                    while line.len() < screen.col {
                        line.push(' ');
                    }
                    if screen.col < line.len() {
                        line[screen.col] = c;
                    } else {
                        line.push(c);
                    }
                    screen.col += 1;
                }
            }
        }
        screen
    }

    fn grow(&mut self) {
        while self.rows.len() <= self.row {
            self.rows.push(Vec::new());
        }
    }

    pub fn rows(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.iter().collect::<String>().trim_end().to_string())
            .collect()
    }

    pub fn row(&self, index: usize) -> String {
        self.rows().get(index).cloned().unwrap_or_default()
    }

    pub fn cursor_row(&self) -> usize {
        self.row
    }

    /// Indices of rows containing `needle`.
    pub fn find(&self, needle: &str) -> Vec<usize> {
        self.rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| row.contains(needle))
            .map(|(i, _)| i)
            .collect()
    }
}

pub fn tty_config() -> Config {
    Config {
        tick_interval: Duration::from_millis(10),
        terminal: Some(true),
        verbosity: Verbosity::Basic,
        strict: true,
        ..Config::default()
    }
}

pub fn tty_logger(config: Config) -> (Logger, SharedBuffer) {
    let buffer = SharedBuffer::new();
    let logger = Logger::with_sink(config, buffer.sink());
    (logger, buffer)
}

/// Poll until the coordinator reports `mode`, or give up after `within`.
pub async fn wait_for_mode(logger: &Logger, mode: Mode, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if let Some(snapshot) = logger.coordinator().snapshot().await {
            if snapshot.mode == mode {
                return true;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
