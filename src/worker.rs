use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::diag;
use crate::formatter::{Formatter, FORMAT_SLACK};
use crate::record::{Record, MAX_MESSAGE_SIZE};
use crate::ring_buffer::Consumer;
use crate::sink::Sink;

/// Iterations of the CPU-relax spin between empty polls before the worker
/// falls back to sleeping. Higher values trade CPU for latency.
pub const SPIN_COUNT: usize = 1000;

/// How long the worker sleeps when a full spin window found no work.
pub const IDLE_SLEEP: Duration = Duration::from_micros(500);

const SCRATCH_CAPACITY: usize = MAX_MESSAGE_SIZE + FORMAT_SLACK;

/// Everything the drain loop needs; moves into the worker thread on start
/// and comes back through the join handle on stop, so a stopped worker can
/// be started again.
struct WorkerParts<const N: usize> {
    queue: Consumer<Record, N>,
    formatter: Box<dyn Formatter + Send>,
    sink: Box<dyn Sink + Send>,
}

/// Background consumer worker.
///
/// Owns the run flag and the worker thread. The lifecycle is
/// idle → running → idle, with both transitions guarded by a compare-and-set
/// on the flag, so repeated or interleaved `start`/`stop` calls are no-ops
/// beyond the first. No mutex or condition variable anywhere; the only
/// blocking operation is the join inside `stop`.
pub struct Worker<const N: usize> {
    run: Arc<AtomicBool>,
    parts: Option<WorkerParts<N>>,
    handle: Option<JoinHandle<WorkerParts<N>>>,
}

impl<const N: usize> Worker<N> {
    /// Wraps a queue consumer handle with the collaborators the drain loop
    /// needs. The worker is idle until [`start`](Self::start).
    pub fn new(
        queue: Consumer<Record, N>,
        formatter: Box<dyn Formatter + Send>,
        sink: Box<dyn Sink + Send>,
    ) -> Self {
        Self {
            run: Arc::new(AtomicBool::new(false)),
            parts: Some(WorkerParts { queue, formatter, sink }),
            handle: None,
        }
    }

    /// Spawns the drain thread if the worker is idle. Idempotent.
    pub fn start(&mut self) {
        if self
            .run
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let Some(mut parts) = self.parts.take() else {
            // A previous worker thread panicked and its parts were lost.
            self.run.store(false, Ordering::Release);
            return;
        };

        let run = Arc::clone(&self.run);
        let spawned = thread::Builder::new()
            .name("rapidlog-worker".into())
            .spawn(move || {
                drain_loop(&run, &mut parts);
                parts
            });

        match spawned {
            Ok(handle) => self.handle = Some(handle),
            Err(err) => {
                self.run.store(false, Ordering::Release);
                diag::emit(format_args!("failed to spawn worker thread: {}", err));
            }
        }
    }

    /// Signals the drain thread to exit and joins it. Blocks until the
    /// thread has flushed the sink and terminated. Idempotent.
    ///
    /// Records still queued when the flag flips are not drained; callers
    /// that need a clean drain should stop producing and poll the queue
    /// empty first.
    pub fn stop(&mut self) {
        if self
            .run
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(parts) => self.parts = Some(parts),
                Err(_) => diag::emit(format_args!("worker thread panicked")),
            }
        }
    }

    /// Whether the drain thread is currently running.
    pub fn is_running(&self) -> bool {
        self.run.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Drop for Worker<N> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The drain loop. Pops eagerly while records are available; on empty it
/// flushes the sink, spins a bounded window, and only then sleeps. The run
/// flag is checked every iteration and inside the spin so `stop` is
/// honoured within one sleep quantum plus the current sink call.
fn drain_loop<const N: usize>(run: &AtomicBool, parts: &mut WorkerParts<N>) {
    // One scratch buffer for the whole thread lifetime; the formatter is
    // bounded by it, so a record can never overrun.
    let mut scratch = [0u8; SCRATCH_CAPACITY];

    while run.load(Ordering::Relaxed) {
        // Fast path: drain whatever is queued.
        if let Some(record) = parts.queue.try_pop() {
            let len = parts.formatter.format_record(&record, &mut scratch);
            parts.sink.write(&scratch[..len]);
            continue;
        }

        // Queue went empty: offer buffered output for persistence before
        // waiting for more work.
        parts.sink.flush();

        let mut popped = None;
        for _ in 0..SPIN_COUNT {
            std::hint::spin_loop();
            if !run.load(Ordering::Relaxed) {
                parts.sink.flush();
                return;
            }
            if let Some(record) = parts.queue.try_pop() {
                popped = Some(record);
                break;
            }
        }

        match popped {
            Some(record) => {
                let len = parts.formatter.format_record(&record, &mut scratch);
                parts.sink.write(&scratch[..len]);
            }
            None => {
                if run.load(Ordering::Relaxed) {
                    thread::sleep(IDLE_SLEEP);
                }
            }
        }
    }

    parts.sink.flush();
}
