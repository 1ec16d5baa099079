#![forbid(unsafe_code)]

//! Deterministic measurement simulator for testing.
//!
//! Drives a [`MeasureDriver`] with a virtual clock, an in-memory timer
//! queue, and scripted target readings — no threads, no real time, no
//! rendering environment. Timers fire in deadline order when the clock is
//! advanced; resize notifications are emitted on demand.
//!
//! # Example
//!
//! ```
//! use fathom_core::{MeasureConfig, Size};
//! use fathom_runtime::simulator::{MeasureSimulator, SimTarget};
//!
//! let mut sim = MeasureSimulator::new(MeasureConfig::default());
//! sim.bind(SimTarget::fixed(400, 200));
//! sim.run_until_idle();
//! assert_eq!(sim.outcomes(), vec![Ok(Size::new(400, 200))]);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use fathom_core::{MeasureConfig, MeasureError, MeasureOutcome, Phase, Size};

use crate::driver::MeasureDriver;
use crate::hooks::MeasureHooks;
use crate::host::{DelayHost, MeasureTarget, ResizeHost, SubToken, TimerToken};

// ---------------------------------------------------------------------------
// SimTarget
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TargetState {
    /// Readings consumed one per probe; when drained, the last reading
    /// sticks.
    script: VecDeque<Option<Size>>,
    current: Option<Size>,
}

/// A scripted measurement target.
///
/// Cloning shares the underlying state, so a test can keep one handle to
/// mutate the parent while the driver owns the other.
#[derive(Debug, Clone)]
pub struct SimTarget {
    inner: Rc<RefCell<TargetState>>,
}

impl SimTarget {
    /// A target whose parent always reads the given size.
    #[must_use]
    pub fn fixed(width: u32, height: u32) -> Self {
        Self::with_state(VecDeque::new(), Some(Size::new(width, height)))
    }

    /// A target with no resolvable parent.
    #[must_use]
    pub fn detached() -> Self {
        Self::with_state(VecDeque::new(), None)
    }

    /// A target whose parent reads each size in turn, one per probe,
    /// holding the last one once the script is drained.
    #[must_use]
    pub fn sequence(sizes: impl IntoIterator<Item = Size>) -> Self {
        let script = sizes.into_iter().map(Some).collect();
        Self::with_state(script, None)
    }

    fn with_state(script: VecDeque<Option<Size>>, current: Option<Size>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TargetState { script, current })),
        }
    }

    /// Replace the parent's current size.
    pub fn set_size(&self, width: u32, height: u32) {
        self.inner.borrow_mut().current = Some(Size::new(width, height));
    }

    /// Detach the parent: subsequent probes resolve nothing.
    pub fn detach(&self) {
        let mut state = self.inner.borrow_mut();
        state.script.clear();
        state.current = None;
    }
}

impl MeasureTarget for SimTarget {
    fn parent_size(&self) -> Option<Size> {
        let mut state = self.inner.borrow_mut();
        if let Some(next) = state.script.pop_front() {
            state.current = next;
        }
        state.current
    }
}

// ---------------------------------------------------------------------------
// SimHost
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct HostState {
    now: Duration,
    next_timer: u64,
    /// Pending timers: (token, deadline, insertion order).
    timers: Vec<(TimerToken, Duration, u64)>,
    next_sub: u64,
    subs: Vec<SubToken>,
    resize_capable: bool,
}

/// A virtual host providing both the delay and resize capabilities.
///
/// Cloning shares the underlying state; pass one clone as the delay host
/// and another as the resize host.
#[derive(Debug, Clone)]
pub struct SimHost {
    inner: Rc<RefCell<HostState>>,
}

impl SimHost {
    /// A host with resize-notification capability.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capability(true)
    }

    /// A host without resize-notification capability (degraded mode).
    #[must_use]
    pub fn without_resize_capability() -> Self {
        Self::with_capability(false)
    }

    fn with_capability(resize_capable: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(HostState {
                now: Duration::ZERO,
                next_timer: 0,
                timers: Vec::new(),
                next_sub: 0,
                subs: Vec::new(),
                resize_capable,
            })),
        }
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Advance the clock by `delta` and pop the earliest timer that is now
    /// due, if any.
    pub fn pop_due(&self, delta: Duration) -> Option<TimerToken> {
        let mut state = self.inner.borrow_mut();
        state.now = state.now.saturating_add(delta);
        let deadline = state.now;
        Self::pop_due_before(&mut state, deadline).map(|(token, _)| token)
    }

    /// Whether any timer is pending.
    #[must_use]
    pub fn has_pending_timers(&self) -> bool {
        !self.inner.borrow().timers.is_empty()
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending_timer_count(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Deadline of the earliest pending timer.
    #[must_use]
    pub fn earliest_deadline(&self) -> Option<Duration> {
        self.inner.borrow().timers.iter().map(|&(_, due, _)| due).min()
    }

    /// Number of active resize subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subs.len()
    }

    fn set_now(&self, now: Duration) {
        self.inner.borrow_mut().now = now;
    }

    /// Remove and return the earliest timer due at or before `deadline`,
    /// breaking ties by insertion order.
    fn take_due(&self, deadline: Duration) -> Option<(TimerToken, Duration)> {
        let mut state = self.inner.borrow_mut();
        Self::pop_due_before(&mut state, deadline)
    }

    fn pop_due_before(
        state: &mut HostState,
        deadline: Duration,
    ) -> Option<(TimerToken, Duration)> {
        let index = state
            .timers
            .iter()
            .enumerate()
            .filter(|&(_, &(_, due, _))| due <= deadline)
            .min_by_key(|&(_, &(_, due, seq))| (due, seq))
            .map(|(index, _)| index)?;
        let (token, due, _) = state.timers.swap_remove(index);
        Some((token, due))
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayHost for SimHost {
    fn schedule(&mut self, delay: Duration) -> TimerToken {
        let mut state = self.inner.borrow_mut();
        let token = TimerToken(state.next_timer);
        state.next_timer += 1;
        let deadline = state.now.saturating_add(delay);
        let seq = token.0;
        state.timers.push((token, deadline, seq));
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        self.inner
            .borrow_mut()
            .timers
            .retain(|&(pending, _, _)| pending != token);
    }
}

impl<T: MeasureTarget> ResizeHost<T> for SimHost {
    fn subscribe(&mut self, _target: &T) -> Option<SubToken> {
        let mut state = self.inner.borrow_mut();
        if !state.resize_capable {
            return None;
        }
        let token = SubToken(state.next_sub);
        state.next_sub += 1;
        state.subs.push(token);
        Some(token)
    }

    fn unsubscribe(&mut self, token: SubToken) {
        self.inner.borrow_mut().subs.retain(|&sub| sub != token);
    }
}

// ---------------------------------------------------------------------------
// MeasureSimulator
// ---------------------------------------------------------------------------

/// Harness bundling a driver, a [`SimHost`], and recording hooks.
///
/// Outcomes and retry notifications are recorded in order; scenario tests
/// assert on them after advancing the virtual clock.
pub struct MeasureSimulator {
    host: SimHost,
    driver: MeasureDriver<SimTarget, SimHost, SimHost>,
    outcomes: Rc<RefCell<Vec<MeasureOutcome>>>,
    retries: Rc<RefCell<u32>>,
}

impl MeasureSimulator {
    /// Create a simulator with a resize-capable host.
    #[must_use]
    pub fn new(config: MeasureConfig) -> Self {
        Self::with_host(config, SimHost::new())
    }

    /// Create a simulator over a specific host.
    #[must_use]
    pub fn with_host(config: MeasureConfig, host: SimHost) -> Self {
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let retries = Rc::new(RefCell::new(0u32));
        let hooks = MeasureHooks::new({
            let outcomes = Rc::clone(&outcomes);
            move |outcome| outcomes.borrow_mut().push(outcome)
        })
        .with_on_retry({
            let retries = Rc::clone(&retries);
            move || *retries.borrow_mut() += 1
        });
        let driver = MeasureDriver::new(config, hooks, host.clone(), host.clone());
        Self {
            host,
            driver,
            outcomes,
            retries,
        }
    }

    /// Attach a custom acceptance predicate.
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Fn(Size) -> bool + 'static) -> Self {
        self.driver = self.driver.with_predicate(predicate);
        self
    }

    /// The shared virtual host.
    #[must_use]
    pub fn host(&self) -> SimHost {
        self.host.clone()
    }

    /// Bind a target, starting a measurement session.
    pub fn bind(&mut self, target: SimTarget) {
        self.driver.bind(target);
    }

    /// Advance the virtual clock, firing due timers in deadline order.
    ///
    /// Timers scheduled while firing (retries) are fired too when their
    /// deadline falls within the window.
    pub fn advance(&mut self, delta: Duration) {
        let target_now = self.host.now().saturating_add(delta);
        while let Some((token, due)) = self.host.take_due(target_now) {
            self.host.set_now(due);
            self.driver.timer_fired(token);
        }
        self.host.set_now(target_now);
    }

    /// Advance until no timer is pending.
    pub fn run_until_idle(&mut self) {
        while let Some(deadline) = self.host.earliest_deadline() {
            let delta = deadline.saturating_sub(self.host.now());
            self.advance(delta);
        }
    }

    /// Deliver a resize notification to the armed subscription, if any.
    pub fn emit_resize(&mut self) {
        if self.host.subscriber_count() > 0 {
            self.driver.resize_notified();
        }
    }

    /// Update the host-declared loading state.
    pub fn set_loading(&mut self, loading: bool) {
        self.driver.set_loading(loading);
    }

    /// Update the host-declared error state.
    pub fn set_host_error(&mut self, error: Option<MeasureError>) {
        self.driver.set_host_error(error);
    }

    /// Tear down the driver's current binding.
    pub fn teardown(&mut self) {
        self.driver.teardown();
    }

    /// Whether the continuous observer is armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.driver.is_armed()
    }

    /// Current session phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.driver.phase()
    }

    /// All outcomes reported so far, in order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<MeasureOutcome> {
        self.outcomes.borrow().clone()
    }

    /// Number of retry notifications fired so far.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        *self.retries.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_deadline_order() {
        let host = SimHost::new();
        let mut delay_a = host.clone();
        let a = delay_a.schedule(Duration::from_millis(30));
        let b = delay_a.schedule(Duration::from_millis(10));

        assert_eq!(host.pop_due(Duration::from_millis(50)), Some(b));
        assert_eq!(host.pop_due(Duration::ZERO), Some(a));
        assert_eq!(host.pop_due(Duration::ZERO), None);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let host = SimHost::new();
        let mut delay = host.clone();
        let token = delay.schedule(Duration::from_millis(10));
        delay.cancel(token);
        assert_eq!(host.pop_due(Duration::from_secs(1)), None);
    }

    #[test]
    fn sequence_target_consumes_one_reading_per_probe() {
        let target = SimTarget::sequence([Size::new(100, 50), Size::new(400, 200)]);
        assert_eq!(target.parent_size(), Some(Size::new(100, 50)));
        assert_eq!(target.parent_size(), Some(Size::new(400, 200)));
        // Drained script holds the last reading.
        assert_eq!(target.parent_size(), Some(Size::new(400, 200)));
    }

    #[test]
    fn detached_target_resolves_nothing() {
        let target = SimTarget::detached();
        assert_eq!(target.parent_size(), None);
    }

    #[test]
    fn set_size_and_detach_mutate_shared_state() {
        let target = SimTarget::fixed(400, 200);
        let handle = target.clone();
        handle.set_size(150, 80);
        assert_eq!(target.parent_size(), Some(Size::new(150, 80)));
        handle.detach();
        assert_eq!(target.parent_size(), None);
    }

    #[test]
    fn subscriptions_are_tracked() {
        let host = SimHost::new();
        let target = SimTarget::fixed(400, 200);
        let mut resize = host.clone();
        let token = ResizeHost::subscribe(&mut resize, &target).expect("capable host");
        assert_eq!(host.subscriber_count(), 1);
        ResizeHost::<SimTarget>::unsubscribe(&mut resize, token);
        assert_eq!(host.subscriber_count(), 0);
    }

    #[test]
    fn incapable_host_declines_subscriptions() {
        let host = SimHost::without_resize_capability();
        let target = SimTarget::fixed(400, 200);
        let mut resize = host.clone();
        assert_eq!(ResizeHost::subscribe(&mut resize, &target), None);
    }
}
