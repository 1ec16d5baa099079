#![forbid(unsafe_code)]

//! Fathom public facade crate.
//!
//! Fathom measures the rendered size of a container's parent element,
//! retries while the host layout settles, and keeps the measurement live
//! through resize notifications. This crate re-exports the stable surface
//! from `fathom-core` (the state machine) and `fathom-runtime` (host
//! integration) and offers a lightweight prelude.
//!
//! # Example
//!
//! ```
//! use fathom::prelude::*;
//! use fathom::simulator::{MeasureSimulator, SimTarget};
//!
//! let config = MeasureConfig::new().with_retry_limit(2);
//! let mut sim = MeasureSimulator::new(config);
//! sim.bind(SimTarget::fixed(1024, 768));
//! sim.run_until_idle();
//! assert_eq!(sim.outcomes(), vec![Ok(Size::new(1024, 768))]);
//! ```

// --- Core re-exports -------------------------------------------------------

pub use fathom_core::config::MeasureConfig;
pub use fathom_core::error::{MeasureError, MeasureOutcome};
pub use fathom_core::geometry::Size;
pub use fathom_core::session::{MeasureSession, Phase, Step};
pub use fathom_core::validate::{SizePolicy, SizePredicate};

// --- Runtime re-exports ----------------------------------------------------

pub use fathom_runtime::driver::MeasureDriver;
pub use fathom_runtime::hooks::MeasureHooks;
pub use fathom_runtime::host::{
    DelayHost, MeasureTarget, NoResizeHost, ResizeHost, SubToken, TimerToken,
};
pub use fathom_runtime::timer::ThreadTimer;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        DelayHost, MeasureConfig, MeasureDriver, MeasureError, MeasureHooks, MeasureOutcome,
        MeasureTarget, ResizeHost, Size, Step,
    };
}

pub use fathom_core as core;
pub use fathom_runtime as runtime;
pub use fathom_runtime::simulator;
