//! Property-based invariant tests for the validation policy and the
//! session state machine.
//!
//! These tests verify invariants that must hold for any configuration and
//! any sequence of readings:
//!
//! 1. Validation is a pure function: repeated evaluation agrees.
//! 2. Validation agrees with the reference predicate
//!    (`width >= min_width && (min_height == 0 || height >= min_height)`).
//! 3. A session never consumes more retries than its limit.
//! 4. Each begin/reopen produces exactly one report.
//! 5. A missing parent reports `ParentNotFound` with zero retries consumed.
//! 6. A report, once delivered, is followed only by idle steps until the
//!    session is reopened.

use std::time::Duration;

use fathom_core::{MeasureConfig, MeasureError, MeasureSession, Size, SizePolicy, Step};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn size_strategy() -> impl Strategy<Value = Size> {
    (0u32..=4096, 0u32..=4096).prop_map(|(w, h)| Size::new(w, h))
}

fn reading_strategy() -> impl Strategy<Value = Option<Size>> {
    prop_oneof![
        1 => Just(None),
        9 => size_strategy().prop_map(Some),
    ]
}

fn config_strategy() -> impl Strategy<Value = MeasureConfig> {
    (0u32..=2048, 0u32..=2048, 0u32..=8, 0u64..=250).prop_map(|(w, h, retries, delay)| {
        MeasureConfig::new()
            .with_min_width(w)
            .with_min_height(h)
            .with_retry_limit(retries)
            .with_settle_delay(Duration::from_millis(delay))
    })
}

fn reference_admits(config: &MeasureConfig, size: Size) -> bool {
    size.width >= config.min_width && (config.min_height == 0 || size.height >= config.min_height)
}

/// Drive a session generation to its report, feeding `readings` in order
/// and repeating the last one if the machine outlasts the script.
/// Returns (report, retry_steps).
fn run_generation(
    session: &mut MeasureSession,
    readings: &[Option<Size>],
) -> (Option<Step>, u32) {
    let mut retry_steps = 0;
    let mut index = 0;
    loop {
        let reading = readings
            .get(index)
            .or_else(|| readings.last())
            .copied()
            .flatten();
        index += 1;
        match session.attempt(reading) {
            step @ Step::Report(_) => return (Some(step), retry_steps),
            Step::Retry { .. } => retry_steps += 1,
            Step::Idle => return (None, retry_steps),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. Validation purity and agreement with the reference predicate
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn validation_is_pure(config in config_strategy(), size in size_strategy()) {
        let policy = SizePolicy::from(&config);
        let first = policy.admits(size);
        for _ in 0..4 {
            prop_assert_eq!(policy.admits(size), first);
        }
    }

    #[test]
    fn validation_matches_reference(config in config_strategy(), size in size_strategy()) {
        let policy = SizePolicy::from(&config);
        prop_assert_eq!(
            policy.admits(size),
            reference_admits(&config, size),
            "policy disagrees with reference: config={:?}, size={:?}",
            config, size
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3 + 4. Retry budget is respected and exactly one report is delivered
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn retries_never_exceed_limit(
        config in config_strategy(),
        readings in prop::collection::vec(reading_strategy(), 1..12),
    ) {
        let mut session = MeasureSession::new(&config);
        session.begin();
        let (report, retry_steps) = run_generation(&mut session, &readings);

        prop_assert!(retry_steps <= config.retry_limit);
        prop_assert_eq!(session.retries(), retry_steps);
        prop_assert!(report.is_some(), "a generation with readings must report");
    }

    #[test]
    fn exactly_one_report_per_generation(
        config in config_strategy(),
        readings in prop::collection::vec(reading_strategy(), 1..12),
    ) {
        let mut session = MeasureSession::new(&config);
        session.begin();
        let (report, _) = run_generation(&mut session, &readings);
        prop_assert!(matches!(report, Some(Step::Report(_))));

        // Once terminal, every further attempt is a no-op until reopen.
        for reading in &readings {
            prop_assert_eq!(session.attempt(*reading), Step::Idle);
        }

        session.reopen();
        let (second, _) = run_generation(&mut session, &readings);
        prop_assert!(matches!(second, Some(Step::Report(_))));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Missing parent is terminal with zero retries consumed
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn missing_parent_is_immediate(config in config_strategy()) {
        let mut session = MeasureSession::new(&config);
        session.begin();
        let step = session.attempt(None);
        prop_assert_eq!(step, Step::Report(Err(MeasureError::ParentNotFound)));
        prop_assert_eq!(session.retries(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Terminal failure reading-independence: an always-too-small parent
//    burns exactly the retry budget
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn undersized_parent_burns_exact_budget(
        retry_limit in 0u32..=6,
        width in 0u32..320,
    ) {
        let config = MeasureConfig::new().with_retry_limit(retry_limit);
        let mut session = MeasureSession::new(&config);
        session.begin();

        let (report, retry_steps) =
            run_generation(&mut session, &[Some(Size::new(width, 100))]);
        prop_assert_eq!(retry_steps, retry_limit);
        prop_assert_eq!(
            report,
            Some(Step::Report(Err(MeasureError::InvalidSize)))
        );
    }
}
