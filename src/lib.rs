//! Low-latency asynchronous logging.
//!
//! Application threads hand records to a bounded lock-free SPSC queue; a
//! background worker drains it, renders each record to text, and writes to
//! a sink. The producing path performs no allocation, locking, or I/O;
//! when the queue is full the record is dropped and counted.
//!
//! ```no_run
//! use rapidlog::{log_info, ConsoleSink, Logger, TextFormatter};
//!
//! let mut logger: Logger<1024> =
//!     Logger::new(Box::new(TextFormatter::new()), Box::new(ConsoleSink::stdout()));
//! logger.start();
//! let _ = log_info!(logger, "connected in {} ms", 12);
//! logger.stop();
//! ```

pub mod clock;
pub mod formatter;
pub mod level;
pub mod logger;
pub mod record;
pub mod ring_buffer;
pub mod sink;
pub mod worker;

mod diag;

pub use formatter::{Formatter, TextFormatter, FORMAT_SLACK};
pub use level::Level;
pub use logger::{dropped_records, LogResult, Logger, SourceLocation};
pub use record::{Record, MAX_MESSAGE_SIZE};
pub use ring_buffer::SpscRingBuffer;
pub use sink::{ConsoleSink, ConsoleStream, FileSink, NullSink, Sink};
pub use worker::{Worker, IDLE_SLEEP, SPIN_COUNT};
