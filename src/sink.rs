use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::diag;

/// An output destination for formatted log lines.
///
/// Called only from the consumer worker thread, never from the hot path.
/// Implementations recover from their own failures locally (emitting a
/// diagnostic when enabled); errors are never surfaced to the producer.
pub trait Sink: Send {
    /// Appends `data`. The sink may buffer internally.
    fn write(&mut self, data: &[u8]);

    /// Pushes previously written bytes to the underlying output. Called by
    /// the worker on idle and at shutdown.
    fn flush(&mut self);
}

/// Append-only file sink with internal buffering.
pub struct FileSink {
    writer: BufWriter<std::fs::File>,
}

impl FileSink {
    /// Opens `path` for appending, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { writer: BufWriter::new(file) })
    }
}

impl Sink for FileSink {
    fn write(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if let Err(err) = self.writer.write_all(data) {
            diag::emit(format_args!("file sink write failed: {}", err));
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.writer.flush() {
            diag::emit(format_args!("file sink flush failed: {}", err));
        }
    }
}

/// Which standard stream a [`ConsoleSink`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

/// Console sink writing to stdout or stderr.
pub struct ConsoleSink {
    stream: ConsoleStream,
}

impl ConsoleSink {
    pub fn new(stream: ConsoleStream) -> Self {
        Self { stream }
    }

    pub fn stdout() -> Self {
        Self::new(ConsoleStream::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(ConsoleStream::Stderr)
    }

    fn with_stream(&self, op: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> io::Result<()> {
        match self.stream {
            ConsoleStream::Stdout => op(&mut io::stdout().lock()),
            ConsoleStream::Stderr => op(&mut io::stderr().lock()),
        }
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if let Err(err) = self.with_stream(|stream| stream.write_all(data)) {
            diag::emit(format_args!("console sink write failed: {}", err));
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.with_stream(|stream| stream.flush()) {
            diag::emit(format_args!("console sink flush failed: {}", err));
        }
    }
}

/// Discards everything. Useful for benchmarking the transport alone.
#[derive(Debug, Default)]
pub struct NullSink;

impl NullSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for NullSink {
    fn write(&mut self, _data: &[u8]) {}

    fn flush(&mut self) {}
}
