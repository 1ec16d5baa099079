#![forbid(unsafe_code)]

//! Thread-backed one-shot timers.
//!
//! [`ThreadTimer`] is a [`DelayHost`] for embeddings without their own
//! timer wheel. Each scheduled delay parks a worker thread on a
//! condvar-backed cancel flag; on expiry the worker sends the
//! [`TimerToken`] over the `mpsc` channel supplied at construction, and
//! the embedding's event loop feeds it to
//! [`MeasureDriver::timer_fired`](crate::driver::MeasureDriver::timer_fired).
//!
//! A cancelled timer never sends. A token already in flight when its timer
//! is cancelled can still arrive at the channel; the driver drops tokens
//! it does not own, so that race is harmless.
//!
//! # Example
//!
//! ```ignore
//! let (mut timers, expiries) = ThreadTimer::channel();
//! let mut driver = MeasureDriver::new(config, hooks, timers, resize_host);
//! driver.bind(target);
//! while let Ok(token) = expiries.recv() {
//!     driver.timer_fired(token);
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::host::{DelayHost, TimerToken};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Default)]
struct FlagState {
    cancelled: bool,
    done: bool,
}

/// Shared cancel/completion flag for one worker.
#[derive(Debug, Default)]
struct TimerFlag {
    state: Mutex<FlagState>,
    cond: Condvar,
}

impl TimerFlag {
    /// Block until cancelled or `delay` elapses. Returns `true` when
    /// cancelled. Loops against spurious wakeups.
    fn wait_cancelled(&self, delay: Duration) -> bool {
        let start = Instant::now();
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => return true,
        };
        loop {
            if state.cancelled {
                return true;
            }
            let elapsed = start.elapsed();
            if elapsed >= delay {
                return false;
            }
            let remaining = delay - elapsed;
            state = match self.cond.wait_timeout(state, remaining) {
                Ok((state, _)) => state,
                Err(_) => return true,
            };
        }
    }

    fn cancel(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.cancelled = true;
        }
        self.cond.notify_all();
    }

    fn mark_done(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.done = true;
        }
    }

    fn is_done(&self) -> bool {
        self.state.lock().map(|state| state.done).unwrap_or(true)
    }
}

struct PendingTimer {
    token: TimerToken,
    flag: Arc<TimerFlag>,
}

/// A [`DelayHost`] backed by one-shot worker threads.
pub struct ThreadTimer {
    sender: Sender<TimerToken>,
    pending: Vec<PendingTimer>,
}

impl ThreadTimer {
    /// Create a timer host delivering expiries to `sender`.
    #[must_use]
    pub fn new(sender: Sender<TimerToken>) -> Self {
        Self {
            sender,
            pending: Vec::new(),
        }
    }

    /// Create a timer host together with its expiry channel.
    #[must_use]
    pub fn channel() -> (Self, Receiver<TimerToken>) {
        let (sender, receiver) = channel();
        (Self::new(sender), receiver)
    }

    /// Number of timers whose workers have not finished.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending
            .iter()
            .filter(|pending| !pending.flag.is_done())
            .count()
    }
}

impl DelayHost for ThreadTimer {
    fn schedule(&mut self, delay: Duration) -> TimerToken {
        // Prune workers that already finished.
        self.pending.retain(|pending| !pending.flag.is_done());

        let token = TimerToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed));
        let flag = Arc::new(TimerFlag::default());
        let worker_flag = Arc::clone(&flag);
        let sender = self.sender.clone();

        thread::spawn(move || {
            if !worker_flag.wait_cancelled(delay) {
                // Receiver gone means the embedding shut down; nothing to do.
                let _ = sender.send(token);
            }
            worker_flag.mark_done();
        });

        self.pending.push(PendingTimer { token, flag });
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(index) = self
            .pending
            .iter()
            .position(|pending| pending.token == token)
        {
            let pending = self.pending.swap_remove(index);
            pending.flag.cancel();
        }
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        // Stop every worker; do not join, to avoid blocking drop.
        for pending in self.pending.drain(..) {
            pending.flag.cancel();
        }
    }
}
