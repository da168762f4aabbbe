//! Enqueue/dequeue and introspection over a mapped `Segment` (spec
//! §4.3–§4.5). Every operation here assumes the double mapping from
//! `segment.rs`: a write or read of up to `capacity` bytes starting at
//! any offset `0..capacity` is always a single contiguous slice, because
//! bytes past the end of the canonical region alias back to its start.

use crate::error::{HyperQError, Result};
use crate::header::Header;
use crate::segment::Segment;

const LENGTH_PREFIX_BYTES: u64 = 4;

/// Ring buffer operations bound to one attached segment.
pub struct RingOps<'a> {
    segment: &'a Segment,
}

impl<'a> RingOps<'a> {
    pub fn new(segment: &'a Segment) -> Self {
        Self { segment }
    }

    fn header(&self) -> &Header {
        self.segment.header()
    }

    fn capacity(&self) -> u64 {
        self.segment.capacity()
    }

    /// Write `len` bytes starting at byte offset `at` (mod capacity) in the
    /// canonical region. Relies on the double mapping: this is always one
    /// contiguous `copy_nonoverlapping`, even when `at + len > capacity`.
    unsafe fn write_at(&self, at: u64, bytes: &[u8]) {
        let dst = self.segment.data_ptr().add(at as usize);
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
    }

    unsafe fn read_at(&self, at: u64, len: usize) -> Vec<u8> {
        let src = self.segment.data_ptr().add(at as usize);
        let mut buf = vec![0u8; len];
        std::ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), len);
        buf
    }

    /// Enqueue `payload` as a length-prefixed frame (spec §4.3). Blocks on
    /// `not_full` while the frame would not fit in the remaining free
    /// space. Returns `MessageTooLarge` immediately, without locking, if
    /// the frame could never fit even in a fully empty queue.
    pub fn put(&self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Err(HyperQError::InvalidArgument(
                "cannot enqueue an empty message".into(),
            ));
        }
        let capacity = self.capacity();
        let frame_len = LENGTH_PREFIX_BYTES + payload.len() as u64;
        if frame_len > capacity {
            return Err(HyperQError::MessageTooLarge {
                len: payload.len(),
                capacity,
            });
        }

        let header = self.header();
        let segment_name = self.segment.name().display_name();
        let mut guard = header.lock(segment_name)?;

        loop {
            let free = capacity - header.count();
            if frame_len <= free {
                break;
            }
            guard = header.wait_not_full(guard)?;
        }

        let tail = header.tail();
        let len_bytes = (payload.len() as u32).to_le_bytes();
        // SAFETY: the mutex is held, frame_len was checked against free
        // space above, and the double mapping makes offset+len always
        // in-bounds for a contiguous copy.
        unsafe {
            self.write_at(tail, &len_bytes);
            self.write_at((tail + LENGTH_PREFIX_BYTES) % capacity, payload);
        }

        header.set_tail((tail + frame_len) % capacity);
        header.set_count(header.count() + frame_len);

        header.signal_not_empty();
        drop(guard);
        Ok(())
    }

    /// Dequeue the oldest frame (spec §4.4). Blocks on `not_empty` while the
    /// queue has no complete frame available.
    pub fn get(&self) -> Result<Vec<u8>> {
        let capacity = self.capacity();
        let header = self.header();
        let segment_name = self.segment.name().display_name();
        let mut guard = header.lock(segment_name)?;

        loop {
            if header.count() > 0 {
                break;
            }
            guard = header.wait_not_empty(guard)?;
        }

        let head = header.head();
        let count = header.count();
        if count < LENGTH_PREFIX_BYTES {
            return Err(HyperQError::CorruptState {
                name: segment_name.to_string(),
                length: 0,
                count,
                capacity,
            });
        }

        // SAFETY: mutex held; head..head+4 is within the live region, and
        // the double mapping makes this a contiguous read regardless of
        // wraparound.
        let len_bytes = unsafe { self.read_at(head, LENGTH_PREFIX_BYTES as usize) };
        let payload_len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as u64;
        let frame_len = LENGTH_PREFIX_BYTES + payload_len;

        if frame_len > count {
            return Err(HyperQError::CorruptState {
                name: segment_name.to_string(),
                length: payload_len,
                count,
                capacity,
            });
        }

        // SAFETY: same as above; payload_len + head is in-bounds because
        // frame_len <= count <= capacity was just checked.
        let payload =
            unsafe { self.read_at((head + LENGTH_PREFIX_BYTES) % capacity, payload_len as usize) };

        header.set_head((head + frame_len) % capacity);
        header.set_count(count - frame_len);

        header.signal_not_full();
        drop(guard);
        Ok(payload)
    }

    /// `true` if the queue currently holds no frames (spec §4.5).
    pub fn empty(&self) -> Result<bool> {
        let header = self.header();
        let guard = header.lock(self.segment.name().display_name())?;
        let empty = header.count() == 0;
        drop(guard);
        Ok(empty)
    }

    /// `true` if the queue has no room for another message, i.e. not even
    /// a 1-byte payload (the smallest message `put` accepts, since empty
    /// payloads are rejected) could fit: `count + 5 > capacity` (spec
    /// §4.5).
    pub fn full(&self) -> Result<bool> {
        let header = self.header();
        let guard = header.lock(self.segment.name().display_name())?;
        let free = self.capacity() - header.count();
        drop(guard);
        Ok(free < LENGTH_PREFIX_BYTES + 1)
    }

    /// Number of live bytes currently occupied (frame headers included).
    pub fn size(&self) -> Result<u64> {
        let header = self.header();
        let guard = header.lock(self.segment.name().display_name())?;
        let count = header.count();
        drop(guard);
        Ok(count)
    }

    /// Discard all queued frames and wake every blocked producer (spec
    /// §4.5: "clear" resets head/tail/count and broadcasts `not_full` so
    /// waiting producers re-check rather than hang against a queue that
    /// silently became empty underneath them).
    pub fn clear(&self) -> Result<()> {
        let header = self.header();
        let guard = header.lock(self.segment.name().display_name())?;
        header.set_head(0);
        header.set_tail(0);
        header.set_count(0);
        header.broadcast_not_full();
        drop(guard);
        Ok(())
    }
}
