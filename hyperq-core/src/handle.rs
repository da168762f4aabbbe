//! Public engine entry point (spec §4.6): owns a `Segment`, exposes
//! `RingOps` through thin delegating methods, and drops cleanly.

use crate::error::Result;
use crate::name::SegmentName;
use crate::ring::RingOps;
use crate::segment::{Provenance, Segment};

/// One process's attachment to a HyperQ segment.
///
/// Cloning is not supported: each `Handle` owns one live attachment and
/// decrements the shared refcount exactly once, on drop. Share a `Handle`
/// across threads behind an `Arc` instead of duplicating the attachment.
pub struct Handle {
    segment: Segment,
}

impl Handle {
    /// Create a new segment, or attach to one already created under
    /// `name` (spec §6). `capacity` is ignored when attaching to an
    /// existing segment; the segment's own stored capacity always wins.
    pub fn open(name: &str, capacity: u64) -> Result<Self> {
        let name = SegmentName::normalize(name)?;
        let segment = Segment::open(name, capacity)?;
        Ok(Self { segment })
    }

    /// Create a segment under a freshly generated, process-unique name.
    pub fn create_anonymous(capacity: u64) -> Result<Self> {
        let name = SegmentName::generate();
        let segment = Segment::open(name, capacity)?;
        Ok(Self { segment })
    }

    /// The normalized segment name, without its leading `/` (spec §6).
    pub fn name(&self) -> &str {
        self.segment.name().display_name()
    }

    /// Whether this handle created the segment or attached to an existing
    /// one.
    pub fn provenance(&self) -> Provenance {
        self.segment.provenance()
    }

    pub fn capacity(&self) -> u64 {
        self.segment.capacity()
    }

    fn ops(&self) -> RingOps<'_> {
        RingOps::new(&self.segment)
    }

    pub fn put(&self, payload: &[u8]) -> Result<()> {
        self.ops().put(payload)
    }

    pub fn get(&self) -> Result<Vec<u8>> {
        self.ops().get()
    }

    pub fn empty(&self) -> Result<bool> {
        self.ops().empty()
    }

    pub fn full(&self) -> Result<bool> {
        self.ops().full()
    }

    pub fn size(&self) -> Result<u64> {
        self.ops().size()
    }

    pub fn clear(&self) -> Result<()> {
        self.ops().clear()
    }
}

// `Segment`'s own `Drop` impl does the refcount-aware teardown; `Handle`
// has nothing further to release.
