use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

/// Lock-free single-producer/single-consumer ring buffer.
///
/// The buffer holds `N` slots (`N` a power of two greater than one) and
/// exposes exactly one [`Producer`] and one [`Consumer`] handle, created
/// together by [`SpscRingBuffer::create`]. The handles are not clonable and
/// their operations take `&mut self`, so the single-producer and
/// single-consumer constraints hold by construction.
///
/// One slot is reserved to disambiguate full from empty, so the usable
/// capacity is `N - 1`. The 64-bit indices only ever grow; at realistic
/// production rates they do not wrap for centuries.
///
/// Dropping the buffer does not drain it: remaining slots are abandoned.
/// Elements are `Copy`, so abandonment needs no cleanup.
pub struct SpscRingBuffer<T: Copy, const N: usize> {
    /// Written only by the producer; read by both sides.
    write_index: CachePadded<AtomicU64>,
    /// Written only by the consumer; read by both sides.
    read_index: CachePadded<AtomicU64>,
    /// Slot storage, allocated once at construction. Lives in its own heap
    /// block, away from the index cache lines.
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// The slot protocol hands each slot to exactly one side at a time: the
// producer owns positions >= W, the consumer owns [R, W). Publication of a
// new W (release) transfers ownership, and the matching acquire loads order
// the slot bytes. The handles serialise each side with &mut self.
unsafe impl<T: Copy + Send, const N: usize> Sync for SpscRingBuffer<T, N> {}
unsafe impl<T: Copy + Send, const N: usize> Send for SpscRingBuffer<T, N> {}

impl<T: Copy, const N: usize> SpscRingBuffer<T, N> {
    /// Number of slots, including the reserved one.
    pub const CAPACITY: usize = N;

    const MASK: u64 = N as u64 - 1;

    const CAPACITY_CHECK: () = assert!(
        N > 1 && N.is_power_of_two(),
        "ring buffer capacity must be a power of two greater than one"
    );

    /// Builds an empty ring and splits it into its two handles.
    ///
    /// All storage is allocated here; push and pop never allocate.
    pub fn create() -> (Producer<T, N>, Consumer<T, N>) {
        let _: () = Self::CAPACITY_CHECK;

        let slots = (0..N)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let ring = Arc::new(Self {
            write_index: CachePadded::new(AtomicU64::new(0)),
            read_index: CachePadded::new(AtomicU64::new(0)),
            slots,
        });

        (Producer { ring: Arc::clone(&ring) }, Consumer { ring })
    }

    /// Approximate occupancy from two relaxed loads. The result may be
    /// stale but is always either correct or conservative.
    fn occupancy(&self) -> u64 {
        let write_idx = self.write_index.load(Ordering::Relaxed);
        let read_idx = self.read_index.load(Ordering::Relaxed);
        write_idx.wrapping_sub(read_idx)
    }
}

/// Write handle of an SPSC ring. Exactly one exists per ring.
pub struct Producer<T: Copy, const N: usize> {
    ring: Arc<SpscRingBuffer<T, N>>,
}

impl<T: Copy, const N: usize> Producer<T, N> {
    /// Attempts a non-blocking enqueue. Returns the value back if the ring
    /// is full.
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        let ring = &*self.ring;

        // Producer owns the write index, so a relaxed load suffices; the
        // acquire on the read index pairs with the consumer's release and
        // tells us which slots have been reclaimed.
        let write_idx = ring.write_index.load(Ordering::Relaxed);
        let read_idx = ring.read_index.load(Ordering::Acquire);

        if write_idx.wrapping_sub(read_idx) >= N as u64 - 1 {
            return Err(value);
        }

        let slot = ring.slots[(write_idx & SpscRingBuffer::<T, N>::MASK) as usize].get();
        // Safety: the full check above proves the consumer has reclaimed
        // this slot, and &mut self guarantees no other producer exists.
        unsafe {
            (*slot).write(value);
        }

        // Publish: everything written to the slot happens-before any
        // consumer that observes the new write index.
        ring.write_index.store(write_idx.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Approximate number of queued elements. May be stale.
    pub fn len(&self) -> u64 {
        self.ring.occupancy()
    }

    /// Whether the ring currently reads as empty. May be stale.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the ring currently reads as full. May be stale.
    pub fn is_full(&self) -> bool {
        self.len() >= N as u64 - 1
    }
}

/// Read handle of an SPSC ring. Exactly one exists per ring.
pub struct Consumer<T: Copy, const N: usize> {
    ring: Arc<SpscRingBuffer<T, N>>,
}

impl<T: Copy, const N: usize> Consumer<T, N> {
    /// Attempts a non-blocking dequeue.
    pub fn try_pop(&mut self) -> Option<T> {
        let ring = &*self.ring;

        // Consumer owns the read index; the acquire on the write index
        // pairs with the producer's release and orders the slot bytes.
        let read_idx = ring.read_index.load(Ordering::Relaxed);
        let write_idx = ring.write_index.load(Ordering::Acquire);

        if read_idx == write_idx {
            return None;
        }

        let slot = ring.slots[(read_idx & SpscRingBuffer::<T, N>::MASK) as usize].get();
        // Safety: the emptiness check above proves the producer published
        // this slot, and &mut self guarantees no other consumer exists.
        let value = unsafe { (*slot).assume_init_read() };

        // Release the slot back to the producer.
        ring.read_index.store(read_idx.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Approximate number of queued elements. May be stale.
    pub fn len(&self) -> u64 {
        self.ring.occupancy()
    }

    /// Whether the ring currently reads as empty. May be stale.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the ring currently reads as full. May be stale.
    pub fn is_full(&self) -> bool {
        self.len() >= N as u64 - 1
    }
}
