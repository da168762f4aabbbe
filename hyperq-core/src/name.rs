//! Segment name validation and normalization (spec §3, §6).

use crate::error::{HyperQError, Result};

/// Maximum length, in bytes, of a user-supplied segment name (excluding
/// the leading `/` the kernel name carries).
pub const MAX_NAME_LEN: usize = 30;

/// A validated, kernel-ready segment name: always starts with `/`, and the
/// part after the slash is 1..=30 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentName(String);

impl SegmentName {
    /// Validate and normalize a user-supplied name, adding a leading `/`
    /// if absent.
    pub fn normalize(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(HyperQError::InvalidArgument(
                "segment name must not be empty".into(),
            ));
        }
        let without_slash = raw.strip_prefix('/').unwrap_or(raw);
        if without_slash.is_empty() {
            return Err(HyperQError::InvalidArgument(
                "segment name must not be empty".into(),
            ));
        }
        if without_slash.len() > MAX_NAME_LEN {
            return Err(HyperQError::InvalidArgument(format!(
                "segment name '{without_slash}' is {} bytes, exceeds the {MAX_NAME_LEN}-byte limit",
                without_slash.len()
            )));
        }
        if without_slash.contains('/') {
            return Err(HyperQError::InvalidArgument(format!(
                "segment name '{without_slash}' must not contain additional '/' characters"
            )));
        }
        Ok(Self(format!("/{without_slash}")))
    }

    /// Synthesize a process-unique name when the caller didn't provide one.
    pub fn generate() -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        // uuid hex is 32 chars; keep within MAX_NAME_LEN with a short prefix.
        let truncated = &suffix[..24];
        Self(format!("/hq-{truncated}"))
    }

    /// The kernel-visible name, including the leading `/`.
    pub fn as_kernel_name(&self) -> &str {
        &self.0
    }

    /// The normalized name without the leading `/`, as returned by
    /// `Queue::name()` (spec §6: "the normalized name (without the leading
    /// `/`)").
    pub fn display_name(&self) -> &str {
        &self.0[1..]
    }
}
