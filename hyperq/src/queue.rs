//! `Queue`: the bytes-in/bytes-out facade over `hyperq_core::Handle`
//! (spec §4.7). This is the type most callers reach for directly; the
//! engine crate's lock/mmap/pthread plumbing stays behind it.

use hyperq_core::Handle;

pub use hyperq_core::{HyperQError as Error, Provenance, Result};

/// A bounded multi-producer/multi-consumer FIFO queue backed by a named
/// POSIX shared-memory segment.
///
/// `Queue` is `Send + Sync` and cheap to share behind an `Arc`: every
/// operation takes `&self` and serializes internally via the segment's
/// process-shared mutex.
pub struct Queue {
    handle: Handle,
}

impl Queue {
    /// Open (create or attach to) a queue under `name` with the given
    /// byte capacity. `capacity` only matters for the handle that creates
    /// the segment; an attaching handle inherits the existing capacity.
    pub fn open(name: &str, capacity: u64) -> Result<Self> {
        Ok(Self {
            handle: Handle::open(name, capacity)?,
        })
    }

    /// Create a queue under a freshly generated, collision-free name.
    pub fn create_anonymous(capacity: u64) -> Result<Self> {
        Ok(Self {
            handle: Handle::create_anonymous(capacity)?,
        })
    }

    /// The normalized segment name, without its leading `/`.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn provenance(&self) -> Provenance {
        self.handle.provenance()
    }

    /// Total byte capacity of the queue's ring buffer, including space
    /// consumed by length prefixes.
    pub fn capacity(&self) -> u64 {
        self.handle.capacity()
    }

    /// Enqueue `payload`. Blocks until there is room.
    pub fn put(&self, payload: &[u8]) -> Result<()> {
        self.handle.put(payload)
    }

    /// Dequeue the oldest enqueued payload. Blocks until one is available.
    pub fn get(&self) -> Result<Vec<u8>> {
        self.handle.get()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.handle.empty()
    }

    pub fn is_full(&self) -> Result<bool> {
        self.handle.full()
    }

    /// Live bytes currently occupied, frame headers included.
    pub fn len(&self) -> Result<u64> {
        self.handle.size()
    }

    /// Discard all queued messages.
    pub fn clear(&self) -> Result<()> {
        self.handle.clear()
    }
}
