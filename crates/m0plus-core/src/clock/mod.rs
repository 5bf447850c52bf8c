//! Monotonic timekeeping on the SysTick down-counter.

/// Clock configuration and validation.
pub mod config;
/// SysTick-backed monotonic clock and busy-wait delays.
pub mod systick;

pub use config::{
    ClockConfig, ClockSource, DEFAULT_CLOCK_HZ, DEFAULT_MIN_OVERRUN_WINDOW, MAX_RELOAD,
};
pub use systick::{InitStage, Instant, SysTickClock, INIT_OPERATIONS};
