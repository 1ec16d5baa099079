#![forbid(unsafe_code)]

//! Size validation policy.
//!
//! A reading is acceptable when all of the following hold:
//!
//! - width is at least the lower width bound;
//! - the lower height bound is zero (unchecked) or height is at least it;
//! - there is no custom predicate, or the custom predicate accepts it.
//!
//! The policy is a deterministic pure predicate: the same size and the same
//! policy always produce the same answer. It is re-evaluated on every
//! attempt; there is no memoization.

use std::fmt;

use crate::config::MeasureConfig;
use crate::geometry::Size;

/// Custom acceptance predicate layered on top of the bounds checks.
pub type SizePredicate = Box<dyn Fn(Size) -> bool>;

/// The validation policy applied to every measurement reading.
pub struct SizePolicy {
    min_width: u32,
    min_height: u32,
    custom: Option<SizePredicate>,
}

impl SizePolicy {
    /// Create a policy from explicit bounds, with no custom predicate.
    #[must_use]
    pub fn new(min_width: u32, min_height: u32) -> Self {
        Self {
            min_width,
            min_height,
            custom: None,
        }
    }

    /// Attach a custom acceptance predicate.
    ///
    /// The predicate runs only after both bounds checks pass; all
    /// conditions must hold for a reading to be accepted.
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Fn(Size) -> bool + 'static) -> Self {
        self.custom = Some(Box::new(predicate));
        self
    }

    /// Lower width bound in pixels.
    #[inline]
    pub fn min_width(&self) -> u32 {
        self.min_width
    }

    /// Lower height bound in pixels. 0 means height is unchecked.
    #[inline]
    pub fn min_height(&self) -> u32 {
        self.min_height
    }

    /// Whether a custom predicate is attached.
    #[inline]
    pub fn has_predicate(&self) -> bool {
        self.custom.is_some()
    }

    /// Evaluate the policy against a reading.
    pub fn admits(&self, size: Size) -> bool {
        if size.width < self.min_width {
            return false;
        }

        if self.min_height > 0 && size.height < self.min_height {
            return false;
        }

        match &self.custom {
            Some(predicate) => predicate(size),
            None => true,
        }
    }
}

impl From<&MeasureConfig> for SizePolicy {
    fn from(config: &MeasureConfig) -> Self {
        Self::new(config.min_width, config.min_height)
    }
}

impl fmt::Debug for SizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizePolicy")
            .field("min_width", &self.min_width)
            .field("min_height", &self.min_height)
            .field("custom", &self.custom.as_ref().map(|_| ".."))
            .finish()
    }
}
