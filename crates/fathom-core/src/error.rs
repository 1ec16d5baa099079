#![forbid(unsafe_code)]

//! Measurement failure kinds and the result channel.
//!
//! Failures are never panics. Every session delivers its terminal outcome
//! through a single [`MeasureOutcome`] value, so callers branch on
//! `Ok`/`Err` rather than catching anything.

use std::fmt;

use crate::geometry::Size;

/// Why a measurement session ended without a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MeasureError {
    /// The bound target had no resolvable parent element at attempt time.
    ///
    /// Terminal immediately: retrying cannot help when the anchor itself
    /// is detached.
    ParentNotFound,
    /// Every attempt up to the retry limit produced a size that failed
    /// validation.
    InvalidSize,
}

impl MeasureError {
    /// Stable string name for logs and serialized payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ParentNotFound => "PARENT_NOT_FOUND",
            Self::InvalidSize => "INVALID_SIZE",
        }
    }
}

impl fmt::Display for MeasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParentNotFound => write!(f, "no parent element to measure"),
            Self::InvalidSize => write!(f, "measured size failed validation after all retries"),
        }
    }
}

impl std::error::Error for MeasureError {}

/// The single result channel of a measurement session.
///
/// Delivered exactly once per session generation: a validated [`Size`] on
/// success, a [`MeasureError`] on terminal failure.
pub type MeasureOutcome = Result<Size, MeasureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_names() {
        assert_eq!(MeasureError::ParentNotFound.as_str(), "PARENT_NOT_FOUND");
        assert_eq!(MeasureError::InvalidSize.as_str(), "INVALID_SIZE");
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            MeasureError::ParentNotFound.to_string(),
            "no parent element to measure"
        );
        assert!(MeasureError::InvalidSize.to_string().contains("validation"));
    }
}
