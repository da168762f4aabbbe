//! Fixed on-disk header layout (spec §3, "Header" table) and the page
//! rounding math `Segment` needs to place the capacity region that follows
//! it on a page boundary.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::error::{HyperQError, Result};
use crate::sync::{MutexGuard, RawCondvar, RawMutex};

/// Tag written once a segment's header has finished initializing.
pub const MAGIC: u32 = 0x4879_7051; // "HyQ" + version nibble, ASCII-ish

/// How long an attacher spin-waits for `magic` to appear before giving up.
const ATTACH_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(200);
const ATTACH_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(10);

#[repr(C)]
pub struct Header {
    magic: AtomicU32,
    _pad0: u32,
    capacity: u64,
    head: AtomicU64,
    tail: AtomicU64,
    count: AtomicU64,
    refcount: AtomicU32,
    _pad1: u32,
    pub(crate) mutex: RawMutex,
    pub(crate) not_full: RawCondvar,
    pub(crate) not_empty: RawCondvar,
}

impl Header {
    /// Byte size of the header region, rounded up to `page_size` so the
    /// capacity region that follows starts on a page boundary (spec §4.1
    /// step 5/6 require page-aligned `mmap` offsets for the double
    /// mapping).
    pub fn region_len(page_size: usize) -> usize {
        let raw = std::mem::size_of::<Header>();
        ((raw + page_size - 1) / page_size) * page_size
    }

    /// Zero-initialize the header in place and set up a fresh queue.
    ///
    /// # Safety
    /// `ptr` must point to at least `region_len(page_size)` bytes of
    /// writable memory that no other handle is concurrently initializing,
    /// and must outlive every access made through the returned reference.
    pub unsafe fn init_fresh<'a>(ptr: *mut Header, capacity: u64) -> Result<&'a Header> {
        std::ptr::write_bytes(ptr as *mut u8, 0, std::mem::size_of::<Header>());
        std::ptr::addr_of_mut!((*ptr).capacity).write(capacity);
        let header = &*ptr;
        header.head.store(0, Ordering::Relaxed);
        header.tail.store(0, Ordering::Relaxed);
        header.count.store(0, Ordering::Relaxed);
        header.refcount.store(1, Ordering::Relaxed);
        RawMutex::init_process_shared(std::ptr::addr_of!(header.mutex) as *mut RawMutex)?;
        RawCondvar::init_process_shared(
            std::ptr::addr_of!(header.not_full) as *mut RawCondvar,
        )?;
        RawCondvar::init_process_shared(
            std::ptr::addr_of!(header.not_empty) as *mut RawCondvar,
        )?;
        // Magic goes last: it is the signal attachers spin-wait on, and
        // must not appear before the sync primitives are ready.
        header.magic.store(MAGIC, Ordering::Release);
        Ok(header)
    }

    /// Spin-wait for an existing header to finish initializing, then
    /// return a reference to it and bump the refcount.
    ///
    /// # Safety
    /// `ptr` must point to a mapped, previously-or-concurrently-initialized
    /// `Header` that outlives every access made through the returned
    /// reference.
    pub unsafe fn attach<'a>(ptr: *const Header, segment_name: &str) -> Result<&'a Header> {
        let header = &*ptr;
        let deadline = std::time::Instant::now() + ATTACH_TIMEOUT;
        loop {
            if header.magic.load(Ordering::Acquire) == MAGIC {
                header.refcount.fetch_add(1, Ordering::AcqRel);
                return Ok(header);
            }
            if std::time::Instant::now() >= deadline {
                return Err(HyperQError::NotInitialized {
                    name: segment_name.to_string(),
                });
            }
            std::thread::sleep(ATTACH_POLL_INTERVAL);
        }
    }

    /// `capacity` is written once by `init_fresh`, before any other handle
    /// can observe the segment (attachers only proceed once `magic`
    /// appears, which is written last), so a plain read is safe here even
    /// though the field lives in memory shared across processes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn lock(&self, segment_name: &str) -> Result<MutexGuard<'_>> {
        self.mutex.lock(segment_name)
    }

    pub fn wait_not_full<'a>(&self, guard: MutexGuard<'a>) -> Result<MutexGuard<'a>> {
        self.not_full.wait(guard)
    }

    pub fn wait_not_empty<'a>(&self, guard: MutexGuard<'a>) -> Result<MutexGuard<'a>> {
        self.not_empty.wait(guard)
    }

    pub fn signal_not_full(&self) {
        self.not_full.signal();
    }

    pub fn signal_not_empty(&self) {
        self.not_empty.signal();
    }

    pub fn broadcast_not_full(&self) {
        self.not_full.broadcast();
    }

    pub fn head(&self) -> u64 {
        self.head.load(Ordering::Relaxed)
    }

    pub fn tail(&self) -> u64 {
        self.tail.load(Ordering::Relaxed)
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn set_head(&self, value: u64) {
        self.head.store(value, Ordering::Relaxed);
    }

    pub fn set_tail(&self, value: u64) {
        self.tail.store(value, Ordering::Relaxed);
    }

    pub fn set_count(&self, value: u64) {
        self.count.store(value, Ordering::Relaxed);
    }

    /// Decrement the live-handle refcount (spec §3 Lifecycle, §4.6).
    /// Returns `true` if this call observed the transition to zero, i.e.
    /// the caller is responsible for tearing the segment down.
    pub fn release(&self) -> bool {
        self.refcount.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Destroy the embedded sync primitives. Only valid once `release`
    /// has returned `true` for this segment.
    ///
    /// # Safety
    /// No other thread/process may be holding or waiting on the mutex or
    /// condition variables.
    pub unsafe fn destroy_sync(&self) {
        self.not_empty.destroy();
        self.not_full.destroy();
        self.mutex.destroy();
    }
}
