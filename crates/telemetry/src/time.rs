// time.rs - Core time measurement utilities
use std::sync::OnceLock;
use std::time::Instant;

static T0: OnceLock<Instant> = OnceLock::new();

/// Returns nanoseconds since first call (monotonic)
#[inline]
pub fn now_ns() -> u64 {
    T0.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Returns milliseconds elapsed since start_ns
#[inline]
pub fn since_ms(start_ns: u64) -> f64 {
    (now_ns().saturating_sub(start_ns)) as f64 / 1_000_000.0
}
