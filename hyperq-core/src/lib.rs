//! Engine crate for HyperQ: named POSIX shared-memory segments mapped
//! twice to make ring-buffer wraparound a single contiguous copy, a
//! process-shared mutex/condvar pair embedded in the segment header, and
//! the enqueue/dequeue operations built on top.
//!
//! This crate has no opinion on message encoding; see `hyperq` for the
//! bytes-in/bytes-out facade most callers want.

mod error;
mod header;
mod name;
mod ring;
mod segment;
mod sync;

mod handle;

pub use error::{HyperQError, Result};
pub use handle::Handle;
pub use name::{SegmentName, MAX_NAME_LEN};
pub use segment::Provenance;
