#![forbid(unsafe_code)]

//! Result and retry callbacks.

use std::fmt;

use fathom_core::MeasureOutcome;

/// Callbacks a driver invokes on behalf of its embedder.
///
/// `measured` is the single result channel: it receives exactly one
/// [`MeasureOutcome`] per session generation. `on_retry` fires once per
/// retry, never on the terminal attempt.
pub struct MeasureHooks {
    measured: Box<dyn FnMut(MeasureOutcome)>,
    on_retry: Option<Box<dyn FnMut()>>,
}

impl MeasureHooks {
    /// Create hooks with the required result callback.
    #[must_use]
    pub fn new(measured: impl FnMut(MeasureOutcome) + 'static) -> Self {
        Self {
            measured: Box::new(measured),
            on_retry: None,
        }
    }

    /// Attach a retry notification callback.
    #[must_use]
    pub fn with_on_retry(mut self, on_retry: impl FnMut() + 'static) -> Self {
        self.on_retry = Some(Box::new(on_retry));
        self
    }

    pub(crate) fn report(&mut self, outcome: MeasureOutcome) {
        (self.measured)(outcome);
    }

    pub(crate) fn notify_retry(&mut self) {
        if let Some(on_retry) = self.on_retry.as_mut() {
            on_retry();
        }
    }
}

impl fmt::Debug for MeasureHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasureHooks")
            .field("measured", &"..")
            .field("on_retry", &self.on_retry.as_ref().map(|_| ".."))
            .finish()
    }
}
