#![forbid(unsafe_code)]

//! The measurement driver: one session bound to one target and two host
//! capabilities.
//!
//! The driver owns the session state machine, at most one outstanding
//! timer token, and at most one resize subscription. The embedding event
//! loop feeds it three kinds of input:
//!
//! - [`bind`](MeasureDriver::bind) when a target becomes available,
//! - [`timer_fired`](MeasureDriver::timer_fired) when the delay host
//!   delivers an expiry,
//! - [`resize_notified`](MeasureDriver::resize_notified) when the resize
//!   host delivers a notification.
//!
//! Everything else — validation, retry counting, exactly-once reporting —
//! lives in [`MeasureSession`]; the driver only executes the [`Step`]
//! effects the machine returns.
//!
//! # Restart contract
//!
//! `bind` is the only restart trigger: binding a target always tears down
//! the previous binding and starts a fresh session. The host-state setters
//! (`set_loading`, `set_host_error`) re-evaluate observer arming and never
//! re-measure, so host churn cannot cause re-measurement storms.
//!
//! # Resize vs. pending retry
//!
//! A resize notification cancels any pending retry timer, resets the retry
//! counter, and re-runs the attempt synchronously (not re-delayed). The
//! notification carries strictly fresher layout information than the stale
//! retry, and the one-outstanding-attempt invariant stays intact.
//!
//! # Teardown
//!
//! [`teardown`](MeasureDriver::teardown) (also run on drop) cancels the
//! pending timer, releases the subscription, and closes the session. No
//! callback is ever invoked after teardown; tearing down before the first
//! attempt completes reports nothing — that is a cancellation, not a
//! failure.

use fathom_core::{MeasureConfig, MeasureError, MeasureSession, Phase, Size, Step};

use crate::hooks::MeasureHooks;
use crate::host::{DelayHost, MeasureTarget, ResizeHost, SubToken, TimerToken};

/// Drives measurement sessions against an injected host.
///
/// Single-threaded by construction: all inputs must be delivered from the
/// embedding's event loop.
pub struct MeasureDriver<T, D, R>
where
    T: MeasureTarget,
    D: DelayHost,
    R: ResizeHost<T>,
{
    session: MeasureSession,
    hooks: MeasureHooks,
    delay_host: D,
    resize_host: R,

    observe_resizes: bool,
    loading: bool,
    host_error: Option<MeasureError>,

    target: Option<T>,
    timer: Option<TimerToken>,
    subscription: Option<SubToken>,
    /// A success was reported under the current binding. Arming eligibility
    /// is sticky across reopened generations until the binding changes.
    settled_once: bool,
}

impl<T, D, R> MeasureDriver<T, D, R>
where
    T: MeasureTarget,
    D: DelayHost,
    R: ResizeHost<T>,
{
    /// Create a driver. No measurement happens until a target is bound.
    #[must_use]
    pub fn new(config: MeasureConfig, hooks: MeasureHooks, delay_host: D, resize_host: R) -> Self {
        Self {
            session: MeasureSession::new(&config),
            hooks,
            delay_host,
            resize_host,
            observe_resizes: config.observe_resizes,
            loading: config.loading,
            host_error: config.host_error,
            target: None,
            timer: None,
            subscription: None,
            settled_once: false,
        }
    }

    /// Attach a custom acceptance predicate to the validation policy.
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Fn(Size) -> bool + 'static) -> Self {
        self.session.set_predicate(predicate);
        self
    }

    /// Whether a target is currently bound.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.target.is_some()
    }

    /// Whether the continuous observer is currently armed.
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Current session phase.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// Retries consumed in the current session generation.
    #[inline]
    pub fn retries(&self) -> u32 {
        self.session.retries()
    }

    /// A target became available: start a fresh session.
    ///
    /// Attempt #0 is scheduled after the configured settle delay, never run
    /// synchronously. Any previous binding is torn down first.
    pub fn bind(&mut self, target: T) {
        self.release_binding();
        self.target = Some(target);
        let delay = self.session.begin();
        self.timer = Some(self.delay_host.schedule(delay));
        tracing::debug!(delay_ms = delay.as_millis() as u64, "measurement session started");
    }

    /// Deliver a timer expiry from the delay host.
    ///
    /// Tokens the driver does not currently own (cancelled, superseded, or
    /// foreign) are dropped without effect.
    pub fn timer_fired(&mut self, token: TimerToken) {
        if self.timer != Some(token) {
            tracing::trace!(token = token.0, "dropping stale timer token");
            return;
        }
        self.timer = None;
        self.run_attempt();
    }

    /// Deliver a resize notification from the resize host.
    ///
    /// Ignored unless the observer is armed. Cancels any pending retry
    /// timer, resets the retry counter, and re-runs the attempt
    /// synchronously.
    pub fn resize_notified(&mut self) {
        if self.subscription.is_none() {
            return;
        }
        if let Some(token) = self.timer.take() {
            tracing::trace!(token = token.0, "resize supersedes pending retry");
            self.delay_host.cancel(token);
        }
        self.session.reopen();
        self.run_attempt();
    }

    /// Update the host-declared loading state.
    pub fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.refresh_arming();
        }
    }

    /// Update the host-declared error state.
    pub fn set_host_error(&mut self, error: Option<MeasureError>) {
        if self.host_error != error {
            self.host_error = error;
            self.refresh_arming();
        }
    }

    /// Tear down the current binding: cancel the pending timer, release
    /// the subscription, close the session.
    pub fn teardown(&mut self) {
        if self.is_bound() {
            tracing::debug!("measurement session torn down");
        }
        self.release_binding();
    }

    fn release_binding(&mut self) {
        if let Some(token) = self.timer.take() {
            self.delay_host.cancel(token);
        }
        if let Some(token) = self.subscription.take() {
            self.resize_host.unsubscribe(token);
        }
        self.session.close();
        self.target = None;
        self.settled_once = false;
    }

    /// One read-and-validate cycle against the current parent dimensions.
    fn run_attempt(&mut self) {
        let reading = self.target.as_ref().and_then(MeasureTarget::parent_size);
        match self.session.attempt(reading) {
            Step::Report(outcome) => {
                match outcome {
                    Ok(size) => tracing::debug!(
                        width = size.width,
                        height = size.height,
                        "measurement settled"
                    ),
                    Err(error) => tracing::debug!(error = error.as_str(), "measurement failed"),
                }
                self.hooks.report(outcome);
                if outcome.is_ok() {
                    self.settled_once = true;
                    self.refresh_arming();
                }
            }
            Step::Retry { delay } => {
                tracing::trace!(
                    retry = self.session.retries(),
                    delay_ms = delay.as_millis() as u64,
                    "measurement retry scheduled"
                );
                self.hooks.notify_retry();
                self.timer = Some(self.delay_host.schedule(delay));
            }
            Step::Idle => {}
        }
    }

    /// Reconcile the resize subscription against the arming conditions:
    /// observation enabled, not loading, no host-declared error, a success
    /// reported under this binding, and the parent still resolvable. A
    /// host without resize capability declines the subscription, which is
    /// the supported degraded mode.
    fn refresh_arming(&mut self) {
        let parent_resolvable = self
            .target
            .as_ref()
            .and_then(MeasureTarget::parent_size)
            .is_some();
        let want = self.observe_resizes
            && !self.loading
            && self.host_error.is_none()
            && self.settled_once
            && parent_resolvable;

        if want && self.subscription.is_none() {
            if let Some(target) = self.target.as_ref() {
                match self.resize_host.subscribe(target) {
                    Some(token) => {
                        tracing::debug!(sub = token.0, "resize observer armed");
                        self.subscription = Some(token);
                    }
                    None => {
                        tracing::trace!("resize capability unavailable; observer not armed");
                    }
                }
            }
        } else if !want && let Some(token) = self.subscription.take() {
            tracing::debug!(sub = token.0, "resize observer released");
            self.resize_host.unsubscribe(token);
        }
    }
}

impl<T, D, R> Drop for MeasureDriver<T, D, R>
where
    T: MeasureTarget,
    D: DelayHost,
    R: ResizeHost<T>,
{
    fn drop(&mut self) {
        self.release_binding();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{SimHost, SimTarget};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn collecting_hooks() -> (MeasureHooks, Rc<RefCell<Vec<fathom_core::MeasureOutcome>>>) {
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let hooks = MeasureHooks::new({
            let outcomes = Rc::clone(&outcomes);
            move |outcome| outcomes.borrow_mut().push(outcome)
        });
        (hooks, outcomes)
    }

    fn driver_with(
        config: MeasureConfig,
        host: &SimHost,
    ) -> (
        MeasureDriver<SimTarget, SimHost, SimHost>,
        Rc<RefCell<Vec<fathom_core::MeasureOutcome>>>,
    ) {
        let (hooks, outcomes) = collecting_hooks();
        let driver = MeasureDriver::new(config, hooks, host.clone(), host.clone());
        (driver, outcomes)
    }

    #[test]
    fn bind_schedules_rather_than_measures() {
        let host = SimHost::new();
        let (mut driver, outcomes) = driver_with(MeasureConfig::default(), &host);

        driver.bind(SimTarget::fixed(400, 200));
        // Nothing reported until the scheduled attempt fires.
        assert!(outcomes.borrow().is_empty());
        assert_eq!(driver.phase(), Phase::Scheduled);

        let token = host.pop_due(Duration::ZERO).expect("first attempt queued");
        driver.timer_fired(token);
        assert_eq!(outcomes.borrow().as_slice(), &[Ok(Size::new(400, 200))]);
    }

    #[test]
    fn stale_timer_tokens_are_dropped() {
        let host = SimHost::new();
        let (mut driver, outcomes) = driver_with(MeasureConfig::default(), &host);

        driver.bind(SimTarget::fixed(400, 200));
        let first = host.pop_due(Duration::ZERO).expect("first attempt queued");

        // Rebinding supersedes the first timer.
        driver.bind(SimTarget::fixed(800, 600));
        driver.timer_fired(first);
        assert!(outcomes.borrow().is_empty());

        let second = host.pop_due(Duration::ZERO).expect("second attempt queued");
        driver.timer_fired(second);
        assert_eq!(outcomes.borrow().as_slice(), &[Ok(Size::new(800, 600))]);
    }

    #[test]
    fn teardown_cancels_pending_timer_before_first_report() {
        let host = SimHost::new();
        let (mut driver, outcomes) = driver_with(MeasureConfig::default(), &host);

        driver.bind(SimTarget::fixed(400, 200));
        driver.teardown();

        // The host queue was drained by the cancellation.
        assert!(host.pop_due(Duration::from_secs(1)).is_none());
        assert!(outcomes.borrow().is_empty());
        assert_eq!(driver.phase(), Phase::Idle);
    }

    #[test]
    fn observer_not_armed_when_disabled() {
        let host = SimHost::new();
        let config = MeasureConfig::default().with_observe_resizes(false);
        let (mut driver, _outcomes) = driver_with(config, &host);

        driver.bind(SimTarget::fixed(400, 200));
        let token = host.pop_due(Duration::ZERO).expect("attempt queued");
        driver.timer_fired(token);
        assert!(!driver.is_armed());
    }

    #[test]
    fn observer_not_armed_without_capability() {
        let host = SimHost::without_resize_capability();
        let (mut driver, outcomes) = driver_with(MeasureConfig::default(), &host);

        driver.bind(SimTarget::fixed(400, 200));
        let token = host.pop_due(Duration::ZERO).expect("attempt queued");
        driver.timer_fired(token);

        // Degraded mode: success reported, observer silently absent.
        assert_eq!(outcomes.borrow().as_slice(), &[Ok(Size::new(400, 200))]);
        assert!(!driver.is_armed());
    }

    #[test]
    fn loading_gate_disarms_and_rearms() {
        let host = SimHost::new();
        let (mut driver, _outcomes) = driver_with(MeasureConfig::default(), &host);

        driver.bind(SimTarget::fixed(400, 200));
        let token = host.pop_due(Duration::ZERO).expect("attempt queued");
        driver.timer_fired(token);
        assert!(driver.is_armed());

        driver.set_loading(true);
        assert!(!driver.is_armed());

        driver.set_loading(false);
        assert!(driver.is_armed());
    }

    #[test]
    fn host_error_gate_disarms() {
        let host = SimHost::new();
        let (mut driver, _outcomes) = driver_with(MeasureConfig::default(), &host);

        driver.bind(SimTarget::fixed(400, 200));
        let token = host.pop_due(Duration::ZERO).expect("attempt queued");
        driver.timer_fired(token);
        assert!(driver.is_armed());

        driver.set_host_error(Some(MeasureError::InvalidSize));
        assert!(!driver.is_armed());
    }

    #[test]
    fn resize_before_arming_is_ignored() {
        let host = SimHost::new();
        let (mut driver, outcomes) = driver_with(MeasureConfig::default(), &host);

        driver.bind(SimTarget::fixed(400, 200));
        driver.resize_notified();
        assert!(outcomes.borrow().is_empty());
    }

    #[test]
    fn custom_predicate_gates_success() {
        let host = SimHost::new();
        let (hooks, outcomes) = collecting_hooks();
        let config = MeasureConfig::default().with_retry_limit(0);
        let mut driver = MeasureDriver::new(config, hooks, host.clone(), host.clone())
            .with_predicate(|size| size.height >= 300);

        driver.bind(SimTarget::fixed(400, 200));
        let token = host.pop_due(Duration::ZERO).expect("attempt queued");
        driver.timer_fired(token);
        assert_eq!(
            outcomes.borrow().as_slice(),
            &[Err(MeasureError::InvalidSize)]
        );
    }
}
