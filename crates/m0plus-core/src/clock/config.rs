//! SysTick clock configuration and its validation rules.

use core::time::Duration;

use crate::interrupt::Priority;
use crate::ConfigError;

/// Widest value the 24-bit SysTick reload register accepts.
pub const MAX_RELOAD: u32 = 0x00FF_FFFF;

/// Default core clock frequency.
pub const DEFAULT_CLOCK_HZ: u64 = 48_000_000;

/// Default window the overrun counter must cover without wrapping.
pub const DEFAULT_MIN_OVERRUN_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Clock feeding the SysTick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ClockSource {
    /// Processor clock (`CSR.CLKSOURCE = 1`).
    #[default]
    Processor,
    /// Implementation-defined external reference clock (`CSR.CLKSOURCE = 0`).
    External,
}

impl ClockSource {
    /// Value of the `CSR.CLKSOURCE` bit for this source.
    #[must_use]
    pub const fn clksource_bit(self) -> u32 {
        match self {
            Self::Processor => 1,
            Self::External => 0,
        }
    }
}

/// Immutable configuration of a [`SysTickClock`](crate::SysTickClock).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ClockConfig {
    /// Frequency of the selected counter clock in Hz.
    pub clock_hz: u64,
    /// Counter clock selection.
    pub source: ClockSource,
    /// Reload value; one period is `reload + 1` ticks.
    pub reload: u32,
    /// Shortest uptime the overrun counter must represent.
    pub min_overrun_window: Duration,
    /// Priority programmed for the SysTick exception.
    pub tick_priority: Priority,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            clock_hz: DEFAULT_CLOCK_HZ,
            source: ClockSource::Processor,
            reload: MAX_RELOAD,
            min_overrun_window: DEFAULT_MIN_OVERRUN_WINDOW,
            tick_priority: Priority::HIGHEST,
        }
    }
}

impl ClockConfig {
    /// Ticks per counter period.
    #[must_use]
    pub const fn period_ticks(&self) -> u64 {
        self.reload as u64 + 1
    }

    /// Overruns needed to cover `min_overrun_window`.
    #[must_use]
    pub const fn required_overruns(&self) -> u128 {
        if self.clock_hz == 0 {
            return 0;
        }
        match self.min_overrun_window.as_nanos().checked_mul(self.clock_hz as u128) {
            Some(scaled) => scaled / NANOS_PER_SEC / self.period_ticks() as u128,
            None => u128::MAX,
        }
    }

    /// Checks every constraint the clock relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated [`ConfigError`].
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_hz == 0 {
            return Err(ConfigError::ZeroClock);
        }
        if self.clock_hz >= u64::MAX / 100_000_000 {
            return Err(ConfigError::ClockTooFast {
                clock_hz: self.clock_hz,
            });
        }
        if self.reload == 0 || self.reload > MAX_RELOAD {
            return Err(ConfigError::ReloadOutOfRange {
                reload: self.reload,
            });
        }
        let required = self.required_overruns();
        if required > u32::MAX as u128 {
            #[allow(clippy::cast_possible_truncation)]
            let required = if required > u64::MAX as u128 {
                u64::MAX
            } else {
                required as u64
            };
            return Err(ConfigError::OverrunWindowTooLong { required });
        }
        Ok(())
    }
}
