// lib.rs - Main telemetry API
mod time;
mod timer;

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "human-log")]
mod log;

pub use time::{now_ns, since_ms};
pub use timer::{FrameTimer, FrameTiming, TimerError};

/// Record a measurement in milliseconds
///
/// Emits the measurement to the configured backend (log or json)
pub fn record_ms(name: &str, start_ns: u64) {
    let ms = since_ms(start_ns);

    #[cfg(feature = "json")]
    json::emit(name, ms);

    #[cfg(all(not(feature = "json"), feature = "human-log"))]
    log::emit(name, ms);

    #[cfg(not(any(feature = "json", feature = "human-log")))]
    let _ = ms;
}
