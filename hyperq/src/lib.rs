//! Bytes-in/bytes-out facade over the HyperQ shared-memory queue engine.
//! Most callers want [`Queue`]; `hyperq_core` is the underlying engine
//! for anyone who needs lower-level access to the segment/handle types.

mod queue;
mod serializer;

pub use queue::{Error, Provenance, Queue, Result};
pub use serializer::Serializer;
