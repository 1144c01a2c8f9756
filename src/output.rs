//! Byte sinks the cursor service writes into.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Destination of every rendered byte.
pub type Sink = Box<dyn Write + Send>;

/// An in-memory sink that can be cloned and inspected while a logger
/// writes into it. Used to capture output in tests and demos.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A boxed clone suitable for [`Logger::with_sink`](crate::Logger::with_sink).
    pub fn sink(&self) -> Sink {
        Box::new(self.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
