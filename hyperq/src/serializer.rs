//! Typed message interface over [`crate::Queue`].
//!
//! Out of scope for this crate (spec §6: "pluggable serialization" is a
//! non-goal): `Queue` moves raw bytes only. `Serializer` exists so a
//! caller's own crate can bolt one on without forking the queue itself —
//! there is no blanket impl here and none is planned.

use crate::Result;

/// Encode/decode a value of type `T` to and from the byte frames
/// `Queue::put`/`Queue::get` carry. Left for callers to implement with
/// whatever wire format they need (`serde` + `bincode`/`postcard`/JSON,
/// protobuf, …); this crate takes no dependency on any of them.
pub trait Serializer<T> {
    fn encode(&self, value: &T) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}
