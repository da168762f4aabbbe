//! Error taxonomy for the shared-memory ring buffer engine.
//!
//! Mirrors the driver-error pattern used throughout the corpus this crate
//! was grown from: one `thiserror` enum per crate, one variant per failure
//! mode, `Display` messages that embed the operands that caused the
//! failure rather than a generic message.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, HyperQError>;

/// Errors the engine can surface, per the error taxonomy in the spec.
#[derive(Error, Debug)]
pub enum HyperQError {
    /// Bad name, bad capacity, or an out-of-contract `put` (empty message).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An underlying `shm_open`/`mmap`/`pthread_*` call failed.
    #[error("os error during {operation}: {source}")]
    Os {
        operation: &'static str,
        source: std::io::Error,
    },

    /// Attached to a segment whose header `magic` never appeared.
    #[error("segment '{name}' did not initialize within the timeout window")]
    NotInitialized { name: String },

    /// `4 + len(message) > capacity`.
    #[error("message of {len} bytes does not fit in a queue of capacity {capacity}")]
    MessageTooLarge { len: usize, capacity: u64 },

    /// A length prefix read during `get` would overrun the live data.
    /// Unrecoverable: the caller should tear its handle down.
    #[error("corrupt ring state in segment '{name}': length prefix {length} at head does not fit in {count} live bytes (capacity {capacity})")]
    CorruptState {
        name: String,
        length: u64,
        count: u64,
        capacity: u64,
    },

    /// The previous mutex owner died while holding the lock (robust-mutex
    /// path only, Linux-only).
    #[error("previous owner of segment '{name}' died while holding the lock")]
    OwnerDied { name: String },
}

impl HyperQError {
    pub(crate) fn os(operation: &'static str) -> Self {
        Self::Os {
            operation,
            source: std::io::Error::last_os_error(),
        }
    }
}
