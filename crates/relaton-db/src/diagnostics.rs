//! User-visible diagnostic channel.

use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

/// Line-oriented sink for messages meant for the person running the lookup.
///
/// Defaults to standard error. Write failures are logged and dropped.
pub struct Diagnostics {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl Diagnostics {
    /// Report to standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Report to an arbitrary writer.
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Write one message line.
    pub fn report(&self, message: &dyn fmt::Display) {
        let mut sink = match self.sink.lock() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(sink, "[relaton] {}", message).and_then(|()| sink.flush()) {
            tracing::debug!(error = %e, "failed to write diagnostic");
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}
