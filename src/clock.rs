use std::time::{Duration, Instant};

use lazy_static::lazy_static;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::_rdtsc;

/// Minimum steady-clock window sampled by the calibration loop.
const CALIBRATION_WINDOW: Duration = Duration::from_millis(1);

lazy_static! {
    /// Calibrated counter-ticks-per-nanosecond ratio, published once for the
    /// lifetime of the process. Every observer sees the same value.
    static ref TICKS_PER_NANO: f64 = calibrate_ticks_per_nano();
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
lazy_static! {
    /// Anchor for the portable fallback counter.
    static ref COUNTER_EPOCH: Instant = Instant::now();
}

/// Returns a monotonic counter reading from the cheapest source the
/// architecture offers: the time-stamp counter on x86_64, the virtual
/// counter register on aarch64, steady-clock nanoseconds elsewhere.
///
/// Monotonic within a single thread. The raw counter is not guaranteed to be
/// synchronised across cores on every system, so readings taken on different
/// cores may invert by small amounts; consumers tolerate this.
#[inline(always)]
pub fn read_counter() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        _rdtsc()
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        let mut value: u64;
        std::arch::asm!("mrs {}, cntvct_el0", out(reg) value);
        value
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        COUNTER_EPOCH.elapsed().as_nanos() as u64
    }
}

/// Converts a raw counter reading to nanoseconds.
///
/// The first call (from any thread) performs a one-time calibration against
/// the steady clock; the resulting ratio is cached for the process lifetime.
/// Intended for the consumer side; not part of the producer hot path.
pub fn ticks_to_nanos(ticks: u64) -> u64 {
    (ticks as f64 / *TICKS_PER_NANO) as u64
}

/// The calibrated ticks-per-nanosecond constant. Stable across calls.
pub fn ticks_per_nano() -> f64 {
    *TICKS_PER_NANO
}

fn calibrate_ticks_per_nano() -> f64 {
    let start = Instant::now();
    let counter_start = read_counter();

    // Spin out a short steady-clock window to keep quantisation error small.
    let mut elapsed = start.elapsed();
    while elapsed < CALIBRATION_WINDOW {
        std::hint::spin_loop();
        elapsed = start.elapsed();
    }

    let counter_end = read_counter();
    let ns = elapsed.as_nanos() as u64;

    let ratio = if ns > 0 {
        counter_end.wrapping_sub(counter_start) as f64 / ns as f64
    } else {
        0.0
    };

    if ratio < 1.0 {
        1.0
    } else {
        ratio
    }
}
