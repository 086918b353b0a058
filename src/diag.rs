//! Best-effort diagnostic stream for the library's own warnings.
//!
//! Compiled to a no-op unless the `diagnostics` feature is enabled. Writes
//! are bounded by the callers (drop warnings are rate-limited) and failures
//! to write the diagnostic itself are ignored.

use std::fmt;

#[cfg(feature = "diagnostics")]
pub(crate) fn emit(args: fmt::Arguments<'_>) {
    use std::io::Write;

    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = handle.write_fmt(format_args!("[rapidlog] {}\n", args));
}

#[cfg(not(feature = "diagnostics"))]
pub(crate) fn emit(_args: fmt::Arguments<'_>) {}
