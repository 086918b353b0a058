use std::fmt;
use std::mem;

use crate::formatter::SliceWriter;
use crate::level::Level;

/// Inline payload capacity per record, in bytes. A record stores at most
/// `MAX_MESSAGE_SIZE - 1` message bytes followed by a NUL terminator.
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// Cache line size of the target. Apple Silicon uses 128-byte lines; 64 is
/// the floor everywhere else.
#[cfg(all(target_arch = "aarch64", target_vendor = "apple"))]
pub(crate) const CACHE_LINE_SIZE: usize = 128;
#[cfg(not(all(target_arch = "aarch64", target_vendor = "apple")))]
pub(crate) const CACHE_LINE_SIZE: usize = 64;

/// A single log record, sized and laid out for the SPSC ring.
///
/// Everything lives inline: the message is a fixed buffer with a recorded
/// length, and the optional source-location fields borrow `'static` string
/// storage. The record owns no heap memory, so moving one is a plain
/// bit-copy, which is what the ring does on push and pop.
#[derive(Clone, Copy)]
#[cfg_attr(all(target_arch = "aarch64", target_vendor = "apple"), repr(align(128)))]
#[cfg_attr(not(all(target_arch = "aarch64", target_vendor = "apple")), repr(align(64)))]
pub struct Record {
    /// Severity of the message.
    pub level: Level,
    /// Raw counter reading captured by the producer (see [`crate::clock`]).
    pub timestamp: u64,
    /// Number of valid payload bytes in `message`. Always `< MAX_MESSAGE_SIZE`.
    pub message_len: usize,
    /// Stable identifier of the producing thread.
    #[cfg(feature = "thread-id")]
    pub thread_id: u64,
    /// Source file, borrowed from static storage.
    #[cfg(feature = "source-location")]
    pub file: Option<&'static str>,
    /// Enclosing function or module path, borrowed from static storage.
    #[cfg(feature = "source-location")]
    pub function: Option<&'static str>,
    /// Source line number.
    #[cfg(feature = "source-location")]
    pub line: u32,
    /// Inline payload, NUL-terminated at `message[message_len]`.
    pub message: [u8; MAX_MESSAGE_SIZE],
}

// Layout contracts the ring and the consumer scratch sizing rely on.
const _: () = assert!(MAX_MESSAGE_SIZE > 1, "message buffer must hold at least one byte plus NUL");
const _: () = assert!(mem::size_of::<Record>() <= 4096, "Record is too large; reduce MAX_MESSAGE_SIZE");
const _: () = assert!(mem::align_of::<Record>() >= CACHE_LINE_SIZE, "Record must be cache-line aligned");

impl Record {
    /// Creates an empty record with the given level and timestamp.
    pub fn new(level: Level, timestamp: u64) -> Self {
        Self {
            level,
            timestamp,
            message_len: 0,
            #[cfg(feature = "thread-id")]
            thread_id: 0,
            #[cfg(feature = "source-location")]
            file: None,
            #[cfg(feature = "source-location")]
            function: None,
            #[cfg(feature = "source-location")]
            line: 0,
            message: [0u8; MAX_MESSAGE_SIZE],
        }
    }

    /// Copies `bytes` into the inline buffer, truncating to
    /// `MAX_MESSAGE_SIZE - 1`, and NUL-terminates. Returns the number of
    /// bytes stored. An empty slice yields an empty message. Never fails.
    pub fn set_message(&mut self, bytes: &[u8]) -> usize {
        let len = bytes.len().min(MAX_MESSAGE_SIZE - 1);
        self.message[..len].copy_from_slice(&bytes[..len]);
        self.message[len] = 0;
        self.message_len = len;
        len
    }

    /// Renders `args` directly into the inline buffer without allocating,
    /// truncating to `MAX_MESSAGE_SIZE - 1`. Returns the number of bytes
    /// stored. If a `Display` impl reports an error, the message is emptied
    /// and 0 is returned.
    pub fn format_message(&mut self, args: fmt::Arguments<'_>) -> usize {
        let mut writer = SliceWriter::new(&mut self.message[..MAX_MESSAGE_SIZE - 1]);
        match fmt::Write::write_fmt(&mut writer, args) {
            Ok(()) => {
                let len = writer.written();
                self.message[len] = 0;
                self.message_len = len;
                len
            }
            Err(_) => {
                self.message[0] = 0;
                self.message_len = 0;
                0
            }
        }
    }

    /// Assigns the borrowed source-location fields. No copy is made; the
    /// strings must outlive every consumer of the record, which holds for
    /// the `file!()` / `module_path!()` literals the macros pass in.
    #[cfg(feature = "source-location")]
    pub fn set_source_location(&mut self, file: &'static str, line: u32, function: &'static str) {
        self.file = Some(file);
        self.function = Some(function);
        self.line = line;
    }

    /// The valid payload bytes.
    pub fn message_bytes(&self) -> &[u8] {
        &self.message[..self.message_len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingDisplay;

    impl fmt::Display for FailingDisplay {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn test_set_message_truncates() {
        let mut record = Record::new(Level::Info, 0);
        let input = vec![b'x'; 2000];
        let stored = record.set_message(&input);

        assert_eq!(stored, MAX_MESSAGE_SIZE - 1, "oversized input should clamp to capacity - 1");
        assert_eq!(record.message_len, MAX_MESSAGE_SIZE - 1);
        assert_eq!(record.message[MAX_MESSAGE_SIZE - 1], 0, "buffer should stay NUL-terminated");
        assert_eq!(record.message_bytes(), &input[..MAX_MESSAGE_SIZE - 1]);
    }

    #[test]
    fn test_set_message_exact_prefix() {
        let mut record = Record::new(Level::Debug, 0);
        record.set_message(b"hello");
        assert_eq!(record.message_bytes(), b"hello");
        assert_eq!(record.message[5], 0);
    }

    #[test]
    fn test_set_message_empty() {
        let mut record = Record::new(Level::Warn, 0);
        record.set_message(b"placeholder");
        record.set_message(b"");
        assert_eq!(record.message_len, 0, "empty input should yield an empty message");
        assert_eq!(record.message[0], 0);
    }

    #[test]
    fn test_format_message() {
        let mut record = Record::new(Level::Info, 0);
        let written = record.format_message(format_args!("value={} flag={}", 42, true));
        assert_eq!(record.message_bytes(), b"value=42 flag=true");
        assert_eq!(written, record.message_len);
    }

    #[test]
    fn test_format_message_truncates() {
        let mut record = Record::new(Level::Info, 0);
        let long = "y".repeat(5000);
        let written = record.format_message(format_args!("{}", long));
        assert_eq!(written, MAX_MESSAGE_SIZE - 1, "formatted output should clamp to capacity - 1");
        assert_eq!(record.message[MAX_MESSAGE_SIZE - 1], 0);
    }

    #[test]
    fn test_format_message_error_empties_record() {
        let mut record = Record::new(Level::Error, 0);
        record.set_message(b"previous");
        let written = record.format_message(format_args!("{}", FailingDisplay));
        assert_eq!(written, 0, "a failing Display should yield an empty message");
        assert_eq!(record.message_len, 0);
    }

    #[test]
    #[cfg(feature = "source-location")]
    fn test_source_location_is_borrowed() {
        let mut record = Record::new(Level::Trace, 0);
        record.set_source_location("file.rs", 7, "func");
        assert_eq!(record.file, Some("file.rs"));
        assert_eq!(record.function, Some("func"));
        assert_eq!(record.line, 7);
    }
}
