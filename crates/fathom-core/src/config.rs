#![forbid(unsafe_code)]

//! Session configuration.

use std::time::Duration;

use crate::error::MeasureError;

/// Configuration for one measurement session.
///
/// Immutable for the duration of a session; replacing the configuration
/// means starting a new session. All fields have conservative defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasureConfig {
    /// Delay before the first attempt and between retry attempts.
    ///
    /// The first attempt is always scheduled through the delay host, never
    /// run synchronously, so the host layout engine gets at least one turn
    /// to settle before the first read. Default: 0ms.
    pub settle_delay: Duration,

    /// Lower width bound in pixels. A reading narrower than this fails
    /// validation. Default: 320.
    pub min_width: u32,

    /// Lower height bound in pixels. 0 disables height validation
    /// entirely. Default: 0.
    pub min_height: u32,

    /// Maximum number of retries after the initial attempt. Once the
    /// counter reaches this bound the session reports
    /// [`MeasureError::InvalidSize`] and schedules nothing further.
    /// Default: 1.
    pub retry_limit: u32,

    /// Arm the continuous observer after a successful report.
    /// Default: true.
    pub observe_resizes: bool,

    /// Initial host-declared loading state. While loading, the observer
    /// is not armed. Default: false.
    pub loading: bool,

    /// Initial host-declared error state. While set, the observer is not
    /// armed. Default: None.
    pub host_error: Option<MeasureError>,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            min_width: 320,
            min_height: 0,
            retry_limit: 1,
            observe_resizes: true,
            loading: false,
            host_error: None,
        }
    }
}

impl MeasureConfig {
    /// Create a configuration with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay before the first attempt and between retries.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the lower width bound in pixels.
    #[must_use]
    pub fn with_min_width(mut self, min_width: u32) -> Self {
        self.min_width = min_width;
        self
    }

    /// Set the lower height bound in pixels. 0 disables height validation.
    #[must_use]
    pub fn with_min_height(mut self, min_height: u32) -> Self {
        self.min_height = min_height;
        self
    }

    /// Set the maximum number of retries after the initial attempt.
    #[must_use]
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Enable or disable continuous observation after success.
    #[must_use]
    pub fn with_observe_resizes(mut self, observe: bool) -> Self {
        self.observe_resizes = observe;
        self
    }

    /// Set the initial host-declared loading state.
    #[must_use]
    pub fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    /// Set the initial host-declared error state.
    #[must_use]
    pub fn with_host_error(mut self, error: Option<MeasureError>) -> Self {
        self.host_error = error;
        self
    }
}
