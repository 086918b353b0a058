use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::clock;
use crate::diag;
use crate::formatter::Formatter;
use crate::level::Level;
use crate::record::Record;
use crate::ring_buffer::{Producer, SpscRingBuffer};
use crate::sink::Sink;
use crate::worker::Worker;

/// Outcome of a log call, observable by the producer.
///
/// Everything past the queue boundary (formatting, sink I/O) handles its
/// own failures; the producer only ever sees these two states.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogResult {
    /// The record was enqueued for the background worker.
    Success,
    /// The queue was full and the record was dropped.
    BufferFull,
}

/// A call site captured by the logging macros.
#[derive(Debug, Clone, Copy)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
    pub function: &'static str,
}

/// Process-wide count of records dropped because the queue was full.
static DROPPED_RECORDS: AtomicU64 = AtomicU64::new(0);

/// Number of records dropped on a full queue since process start.
pub fn dropped_records() -> u64 {
    DROPPED_RECORDS.load(Ordering::Relaxed)
}

/// Asynchronous logger over a ring of `N` record slots (`N` a power of two
/// greater than one; usable depth is `N - 1`).
///
/// The log methods take `&mut self`: a `Logger` is bound to one producing
/// thread at a time, which is what makes the lock-free queue underneath it
/// sound. For several producing threads, give each its own `Logger` or
/// serialise access externally.
///
/// A log call stack-builds a record, copies the payload with truncation,
/// and attempts one non-blocking enqueue. Nothing on that path allocates,
/// locks, or enters the kernel.
pub struct Logger<const N: usize> {
    queue: Producer<Record, N>,
    worker: Worker<N>,
}

impl<const N: usize> Logger<N> {
    /// Builds a logger draining into `sink` through `formatter`.
    ///
    /// The worker is not started; call [`start`](Self::start) before
    /// logging, or records will sit in the queue until it runs.
    pub fn new(formatter: Box<dyn Formatter + Send>, sink: Box<dyn Sink + Send>) -> Self {
        let (producer, consumer) = SpscRingBuffer::<Record, N>::create();
        Self {
            queue: producer,
            worker: Worker::new(consumer, formatter, sink),
        }
    }

    /// Starts the background worker. Idempotent.
    pub fn start(&mut self) {
        self.worker.start();
    }

    /// Stops and joins the background worker, flushing the sink. Idempotent.
    /// Records still queued at this point are not drained; poll
    /// [`pending`](Self::pending) down to zero first if a clean drain is
    /// required.
    pub fn stop(&mut self) {
        self.worker.stop();
    }

    /// Whether the background worker is running.
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Logs a preformatted message.
    pub fn log(&mut self, level: Level, message: &str) -> LogResult {
        let mut record = new_record(level);
        record.set_message(message.as_bytes());
        self.push(record)
    }

    /// Logs a preformatted message with an explicit call site.
    pub fn log_at(&mut self, level: Level, location: SourceLocation, message: &str) -> LogResult {
        let mut record = new_record(level);
        record.set_message(message.as_bytes());
        apply_location(&mut record, location);
        self.push(record)
    }

    /// Renders `args` into the record's inline buffer (no allocation,
    /// truncating) and logs it.
    pub fn log_format(&mut self, level: Level, args: fmt::Arguments<'_>) -> LogResult {
        let mut record = new_record(level);
        record.format_message(args);
        self.push(record)
    }

    /// [`log_format`](Self::log_format) with an explicit call site. This is
    /// what the `log_event!` family of macros expands to.
    pub fn log_format_at(
        &mut self,
        level: Level,
        location: SourceLocation,
        args: fmt::Arguments<'_>,
    ) -> LogResult {
        let mut record = new_record(level);
        record.format_message(args);
        apply_location(&mut record, location);
        self.push(record)
    }

    pub fn trace(&mut self, message: &str) -> LogResult {
        self.log(Level::Trace, message)
    }

    pub fn debug(&mut self, message: &str) -> LogResult {
        self.log(Level::Debug, message)
    }

    pub fn info(&mut self, message: &str) -> LogResult {
        self.log(Level::Info, message)
    }

    pub fn warn(&mut self, message: &str) -> LogResult {
        self.log(Level::Warn, message)
    }

    pub fn error(&mut self, message: &str) -> LogResult {
        self.log(Level::Error, message)
    }

    pub fn fatal(&mut self, message: &str) -> LogResult {
        self.log(Level::Fatal, message)
    }

    /// Approximate number of records waiting in the queue. May be stale.
    pub fn pending(&self) -> u64 {
        self.queue.len()
    }

    /// Whether the queue currently reads as full. May be stale.
    pub fn is_buffer_full(&self) -> bool {
        self.queue.is_full()
    }

    fn push(&mut self, record: Record) -> LogResult {
        match self.queue.try_push(record) {
            Ok(()) => LogResult::Success,
            Err(_) => {
                let dropped = DROPPED_RECORDS.fetch_add(1, Ordering::Relaxed) + 1;
                // Warn on the first drop and every 1000th after, never more
                // often, so a sustained overload cannot swamp stderr.
                if dropped == 1 || dropped % 1000 == 0 {
                    diag::emit(format_args!("queue full, dropped {} record(s)", dropped));
                }
                LogResult::BufferFull
            }
        }
    }
}

fn new_record(level: Level) -> Record {
    #[cfg_attr(not(feature = "thread-id"), allow(unused_mut))]
    let mut record = Record::new(level, clock::read_counter());
    #[cfg(feature = "thread-id")]
    {
        record.thread_id = thread_id::current();
    }
    record
}

#[cfg(feature = "source-location")]
fn apply_location(record: &mut Record, location: SourceLocation) {
    record.set_source_location(location.file, location.line, location.function);
}

#[cfg(not(feature = "source-location"))]
fn apply_location(_record: &mut Record, _location: SourceLocation) {}

#[cfg(feature = "thread-id")]
mod thread_id {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        static THREAD_ID: Cell<u64> = const { Cell::new(0) };
    }

    /// Stable id of the calling thread, assigned lock-free on first use.
    pub(crate) fn current() -> u64 {
        THREAD_ID.with(|slot| {
            let cached = slot.get();
            if cached != 0 {
                return cached;
            }
            let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
            slot.set(id);
            id
        })
    }
}

/// Logs a formatted message at an explicit level, capturing the call site.
#[macro_export]
macro_rules! log_event {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        $logger.log_format_at(
            $level,
            $crate::SourceLocation {
                file: file!(),
                line: line!(),
                function: module_path!(),
            },
            format_args!($($arg)+),
        )
    }};
}

#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::Level::Trace, $($arg)+) };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::Level::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::Level::Warn, $($arg)+) };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::Level::Error, $($arg)+) };
}

#[macro_export]
macro_rules! log_fatal {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::Level::Fatal, $($arg)+) };
}
