#![forbid(unsafe_code)]

//! Host capability traits.
//!
//! The driver has no direct dependency on any rendering environment.
//! Everything it needs from the outside world is expressed as three small
//! injected capabilities:
//!
//! - [`MeasureTarget`] - resolve the bound anchor's parent and read its
//!   content size
//! - [`DelayHost`] - the delayed-invocation primitive
//! - [`ResizeHost`] - the resize-notification primitive
//!
//! Hosts mint opaque `u64` tokens for timers and subscriptions. Delivery
//! is inverted: the embedding event loop receives expiries/notifications
//! from its host and feeds them back into the driver
//! (`timer_fired` / `resize_notified`). The driver ignores tokens it does
//! not currently own, so a delivery that races a cancellation is harmless.

use std::time::Duration;

use fathom_core::Size;

/// Opaque handle to one pending delayed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u64);

/// Opaque handle to one resize-notification registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubToken(pub u64);

/// A bindable anchor inside a rendered subtree.
///
/// The target itself is only a marker; the element actually measured is
/// its *parent*. The rendering layer owns the target's lifecycle — the
/// driver only reads from it.
pub trait MeasureTarget {
    /// Resolve the current parent element and read its content size.
    ///
    /// Returns `None` when no parent is resolvable, which the scheduler
    /// treats as an immediate terminal failure.
    fn parent_size(&self) -> Option<Size>;
}

/// The delayed-invocation primitive.
///
/// At most one token is outstanding per driver at any instant; the driver
/// owns it and cancels it on teardown. A cancelled timer must not deliver,
/// though a delivery already in flight is tolerated (the driver drops
/// stale tokens).
pub trait DelayHost {
    /// Schedule a delayed invocation and return its token.
    fn schedule(&mut self, delay: Duration) -> TimerToken;

    /// Cancel a pending invocation. Cancelling an already-fired or unknown
    /// token is a no-op.
    fn cancel(&mut self, token: TimerToken);
}

/// The resize-notification primitive.
///
/// `subscribe` returning `None` is the supported degraded mode: the host
/// has no resize capability (or refuses this target), and observation
/// silently never arms. This is not a failure.
pub trait ResizeHost<T: MeasureTarget> {
    /// Register for size-change notifications on the target's parent.
    fn subscribe(&mut self, target: &T) -> Option<SubToken>;

    /// Release a registration. Unknown tokens are a no-op.
    fn unsubscribe(&mut self, token: SubToken);
}

/// A [`ResizeHost`] for embeddings without resize notification.
///
/// Every subscription attempt reports the capability as absent, so the
/// continuous observer never arms and sessions end after their first
/// terminal outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResizeHost;

impl<T: MeasureTarget> ResizeHost<T> for NoResizeHost {
    fn subscribe(&mut self, _target: &T) -> Option<SubToken> {
        None
    }

    fn unsubscribe(&mut self, _token: SubToken) {}
}
