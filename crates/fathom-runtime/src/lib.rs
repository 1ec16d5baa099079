#![forbid(unsafe_code)]

//! Fathom runtime: host integration for the measurement state machine.
//!
//! `fathom-core` decides; this crate acts. It binds a
//! [`MeasureSession`](fathom_core::MeasureSession) to a concrete host
//! through three injected capabilities and drives it to a terminal
//! outcome, then keeps the measurement live through resize notifications.
//!
//! # Key Components
//!
//! - [`MeasureTarget`] / [`DelayHost`] / [`ResizeHost`] - the capability
//!   seams between the driver and the embedding
//! - [`MeasureDriver`] - scheduler plus continuous observer for one bound
//!   target
//! - [`MeasureHooks`] - the result channel and retry notification
//! - [`ThreadTimer`] - a real delay host backed by one-shot worker threads
//! - [`NoResizeHost`] - the degraded mode for hosts without resize
//!   notification
//! - [`MeasureSimulator`] - deterministic harness with a virtual clock
//!
//! # Threading
//!
//! The driver is single-threaded: every input (bind, timer expiry, resize
//! notification, host-state change, teardown) must be delivered from one
//! embedding event loop. [`ThreadTimer`] uses worker threads only to
//! produce expiry messages; state transitions happen when the embedder
//! feeds the token back in.

pub mod driver;
pub mod hooks;
pub mod host;
pub mod simulator;
pub mod timer;

pub use driver::MeasureDriver;
pub use hooks::MeasureHooks;
pub use host::{DelayHost, MeasureTarget, NoResizeHost, ResizeHost, SubToken, TimerToken};
pub use simulator::{MeasureSimulator, SimHost, SimTarget};
pub use timer::ThreadTimer;
