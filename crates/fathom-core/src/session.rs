#![forbid(unsafe_code)]

//! The measurement session state machine.
//!
//! A session runs from target availability to a terminal outcome or
//! teardown. The machine owns the retry counter and the phase; it performs
//! no I/O and schedules nothing itself. Each [`attempt`](MeasureSession::attempt)
//! consumes one reading and returns a [`Step`] describing the effect the
//! embedding driver must perform (report, schedule a retry, or nothing).
//!
//! # Phases
//!
//! ```text
//! Idle ──begin──▶ Scheduled ──valid reading──────────▶ Settled
//!                    │ │                                  │
//!                    │ └─invalid, budget left─▶ Scheduled │
//!                    │                                    │
//!                    ├─no parent / budget spent─▶ Failed  │
//!                    │                              │     │
//!                    ◀──────────────reopen──────────┴─────┘
//! ```
//!
//! `close` returns the machine to `Idle` from any phase; attempts delivered
//! against an `Idle` or terminal phase are no-ops, so a timer that fires
//! after teardown cannot produce a report.
//!
//! # Invariants
//!
//! 1. The retry counter never exceeds the configured limit.
//! 2. Each begin/reopen admits exactly one report; further attempts are
//!    no-ops until the next begin/reopen.
//! 3. At most one attempt is ever pending: a `Retry` step replaces the
//!    attempt that just completed, never adds to it.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use fathom_core::{MeasureConfig, MeasureSession, Size, Step};
//!
//! let config = MeasureConfig::new().with_retry_limit(2);
//! let mut session = MeasureSession::new(&config);
//!
//! // The first attempt is scheduled after the settle delay, never run
//! // synchronously.
//! assert_eq!(session.begin(), Duration::ZERO);
//!
//! // Too narrow: the machine asks for one more attempt.
//! let step = session.attempt(Some(Size::new(200, 100)));
//! assert!(matches!(step, Step::Retry { .. }));
//!
//! // Wide enough: settled.
//! let step = session.attempt(Some(Size::new(400, 100)));
//! assert!(matches!(step, Step::Report(Ok(size)) if size.width == 400));
//! ```

use std::time::Duration;

use crate::config::MeasureConfig;
use crate::error::{MeasureError, MeasureOutcome};
use crate::geometry::Size;
use crate::validate::SizePolicy;

/// Lifecycle phase of a measurement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not started, or torn down. Attempts are ignored.
    Idle,
    /// Exactly one attempt is pending on the driver's timer.
    Scheduled,
    /// A success was reported. Resize re-entry is permitted.
    Settled,
    /// A terminal failure was reported. Resize re-entry is permitted.
    Failed,
}

/// Effect requested by the machine after consuming one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Deliver the terminal outcome for this session generation.
    Report(MeasureOutcome),
    /// Fire the retry notification and schedule another attempt after
    /// `delay`. The retry counter has already been incremented.
    Retry {
        /// Delay before the next attempt.
        delay: Duration,
    },
    /// Nothing to do. The attempt landed on an idle or terminal session
    /// (e.g. a timer that outlived its cancellation window).
    Idle,
}

/// The measurement scheduler.
///
/// Owns the retry counter and phase for one target binding. The embedding
/// driver resolves readings, runs timers, and delivers [`Step`] effects;
/// the machine decides what happens.
#[derive(Debug)]
pub struct MeasureSession {
    policy: SizePolicy,
    settle_delay: Duration,
    retry_limit: u32,
    retries: u32,
    phase: Phase,
}

impl MeasureSession {
    /// Create a session from a configuration. The validation policy is
    /// derived from the configured bounds.
    #[must_use]
    pub fn new(config: &MeasureConfig) -> Self {
        Self {
            policy: SizePolicy::from(config),
            settle_delay: config.settle_delay,
            retry_limit: config.retry_limit,
            retries: 0,
            phase: Phase::Idle,
        }
    }

    /// Attach a custom acceptance predicate to the validation policy.
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Fn(Size) -> bool + 'static) -> Self {
        self.set_predicate(predicate);
        self
    }

    /// Replace the validation policy's custom predicate in place.
    pub fn set_predicate(&mut self, predicate: impl Fn(Size) -> bool + 'static) {
        self.policy = SizePolicy::new(self.policy.min_width(), self.policy.min_height())
            .with_predicate(predicate);
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Retries consumed so far in this generation.
    #[inline]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Whether the session has reported a success.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }

    /// Whether the session has reported a terminal outcome.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Settled | Phase::Failed)
    }

    /// Start (or restart) the session: reset the retry counter and return
    /// the delay after which the first attempt must run.
    pub fn begin(&mut self) -> Duration {
        self.retries = 0;
        self.phase = Phase::Scheduled;
        self.settle_delay
    }

    /// Re-enter the machine after a resize notification: reset the retry
    /// counter and permit a fresh report. No-op on an `Idle` session; a
    /// closed session stays closed.
    pub fn reopen(&mut self) {
        if self.phase == Phase::Idle {
            return;
        }
        self.retries = 0;
        self.phase = Phase::Scheduled;
    }

    /// Tear the session down. Any attempt delivered afterwards is ignored.
    pub fn close(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Consume one reading and decide the next effect.
    ///
    /// `reading` is `None` when the target has no resolvable parent, which
    /// is terminal immediately under the bounded-retry policy.
    pub fn attempt(&mut self, reading: Option<Size>) -> Step {
        if self.phase != Phase::Scheduled {
            return Step::Idle;
        }

        let Some(size) = reading else {
            self.phase = Phase::Failed;
            return Step::Report(Err(MeasureError::ParentNotFound));
        };

        if self.policy.admits(size) {
            self.phase = Phase::Settled;
            return Step::Report(Ok(size));
        }

        if self.retries < self.retry_limit {
            self.retries += 1;
            return Step::Retry {
                delay: self.settle_delay,
            };
        }

        self.phase = Phase::Failed;
        Step::Report(Err(MeasureError::InvalidSize))
    }
}
