#![allow(dead_code)]
#![allow(unused_imports)]
//! Fixtures shared by the integration tests.
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::Once;
use vcilock::{Granularity, Runtime, RuntimeBuilder, VciMask};

static INIT_LOGGING: Once = Once::new();

/// Seed used for property tests on CI when none is given.
pub const CI_PROPTEST_SEED: u64 = 0x0C5_10C4;

/// Proptest config with `cases` cases.
///
/// The RNG seed comes from `VCILOCK_PROPTEST_SEED`, or is fixed on CI, unless
/// `PROPTEST_RNG_SEED` already pinned it.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    let seed = std::env::var("VCILOCK_PROPTEST_SEED")
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .or_else(|| std::env::var("CI").ok().map(|_| CI_PROPTEST_SEED));
    if let (RngSeed::Random, Some(seed)) = (config.rng_seed, seed) {
        config.rng_seed = RngSeed::Fixed(seed);
    }
    config
}

/// Sends `tracing` output to the test writer, once per process.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_thread_names(true)
            .with_ansi(false)
            .try_init();
    });
}

/// VCI runtime whose streams own exactly the given VCI sets, with the
/// diagnostics journal on.
#[must_use]
pub fn runtime_with_masks(masks: &[&[usize]]) -> Runtime {
    let num_vcis = masks.iter().flat_map(|m| m.iter().copied()).max().unwrap_or(1);
    RuntimeBuilder::new()
        .granularity(Granularity::Vci)
        .streams(masks.len())
        .vcis(num_vcis)
        .stream_masks(masks.iter().map(|m| VciMask::of(m)).collect())
        .debug(true)
        .print_level(1)
        .journal(true)
        .build()
        .expect("failed to build test runtime")
}

/// Runtime with round-robin masks and diagnostics off.
#[must_use]
pub fn runtime_with(granularity: Granularity, streams: usize, vcis: usize) -> Runtime {
    RuntimeBuilder::new()
        .granularity(granularity)
        .streams(streams)
        .vcis(vcis)
        .build()
        .expect("failed to build test runtime")
}

/// Marks the start of a test in the log.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
    };
}

/// Marks a step inside a test.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Marks the end of a test, with optional summary fields.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(test = %$name, $($key = %$value,)* "test completed: {}", $name);
    };
}

/// Asserts `cond`, logging the expected and actual values first.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(expected = ?$expected, actual = ?$actual, "checking: {}", $msg);
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
