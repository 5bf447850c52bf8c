//! Wrap-safe monotonic clock over the 24-bit SysTick down-counter.
//!
//! The hardware counter counts from `reload` down to zero and reloads. The
//! SysTick exception handler calls [`SysTickClock::on_tick`] once per reload,
//! and foreground code combines the counter with that overrun count.

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use log::debug;

use crate::clock::ClockConfig;
use crate::interrupt::{InterruptController, InterruptLine, InterruptTable, Operation};
use crate::regs::{fields, modify_field, read_field, read_flag, write_field_blind, RegisterBus};
use crate::{ConfigError, InterruptError};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// SysTick line operations issued by the init sequence.
pub const INIT_OPERATIONS: [Operation; 4] = [
    Operation::Disable,
    Operation::SetPriority,
    Operation::ClearPending,
    Operation::Enable,
];

/// Point on the clock's timeline, in counter ticks since the counter started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Instant(u64);

impl Instant {
    /// Clock origin.
    pub const ZERO: Self = Self(0);

    /// Instant `ticks` after the origin.
    #[must_use]
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Ticks since the origin.
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier`, zero if `earlier` is later.
    #[must_use]
    pub const fn ticks_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Instant `ticks` later, `None` on overflow.
    #[must_use]
    pub const fn checked_add_ticks(self, ticks: u64) -> Option<Self> {
        match self.0.checked_add(ticks) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }
}

/// Ordered steps of SysTick bring-up, so an external initializer can
/// interleave them with other peripherals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitStage {
    /// Select the clock, program the reload, stop the counter, mask the
    /// exception and clear the current value.
    PeripheryConfig,
    /// Program the exception priority and clear any stale pending request.
    InterruptConfig,
    /// Start the counter and unmask the exception.
    PeripheryEnable,
}

impl InitStage {
    /// Required execution order.
    pub const ORDER: [Self; 3] = [
        Self::PeripheryConfig,
        Self::InterruptConfig,
        Self::PeripheryEnable,
    ];
}

/// Monotonic clock state shared between the SysTick handler and foreground code.
///
/// Create once at start-up and keep for the lifetime of the program; there is
/// no re-initialization path.
#[derive(Debug)]
pub struct SysTickClock {
    config: ClockConfig,
    overruns: AtomicU32,
}

impl SysTickClock {
    /// Validates `config` and checks once that `table` allows every SysTick
    /// operation the init sequence issues.
    ///
    /// `const` so the clock can live in a `static` reachable from the handler.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid configuration or a table that
    /// rejects the SysTick line.
    pub const fn new(config: ClockConfig, table: &InterruptTable) -> Result<Self, ConfigError> {
        if let Err(err) = config.validate() {
            return Err(err);
        }
        let caps = match table.capabilities(InterruptLine::SYSTICK) {
            Ok(caps) => caps,
            Err(err) => return Err(ConfigError::SysTickLine(err)),
        };
        let mut i = 0;
        while i < INIT_OPERATIONS.len() {
            let operation = INIT_OPERATIONS[i];
            if !caps.allows(operation) {
                return Err(ConfigError::SysTickLine(InterruptError::Unsupported {
                    line: InterruptLine::SYSTICK,
                    operation,
                }));
            }
            i += 1;
        }
        Ok(Self {
            config,
            overruns: AtomicU32::new(0),
        })
    }

    /// Configuration the clock was built with.
    #[must_use]
    pub const fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// SysTick exception handler body: counts one completed period.
    ///
    /// This is the only writer of the overrun counter.
    pub fn on_tick(&self) {
        // Single writer, and thumbv6m has no atomic read-modify-write.
        let next = self.overruns.load(Ordering::Relaxed).wrapping_add(1);
        self.overruns.store(next, Ordering::Relaxed);
    }

    /// Completed periods observed so far.
    #[must_use]
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Current logical time.
    ///
    /// The counter and overrun count are read as a pair and the pair is
    /// discarded whenever `COUNTFLAG` shows a reload happened around the
    /// reads, so an overrun increment in flight never produces a value.
    pub fn now<B: RegisterBus + ?Sized>(&self, bus: &mut B) -> Instant {
        loop {
            let count = read_field(bus, fields::CVR_CURRENT);
            let overruns = self.overruns.load(Ordering::Relaxed);
            if !read_flag(bus, fields::CSR_COUNTFLAG) {
                return Instant(self.combine(count, overruns));
            }
        }
    }

    fn combine(&self, count: u32, overruns: u32) -> u64 {
        let reload = u64::from(self.config.reload);
        reload.saturating_sub(u64::from(count)) + u64::from(overruns) * self.config.period_ticks()
    }

    /// Busy-waits for at least `duration`.
    ///
    /// Waits longer than one reload period are split into whole periods plus
    /// a remainder. The precondition of [`Self::delay_ticks`] applies.
    pub fn delay<B: RegisterBus + ?Sized>(&self, bus: &mut B, duration: Duration) {
        let reload = self.config.reload;
        let ticks = self.duration_to_ticks(duration);
        let periods = ticks / u64::from(reload);
        let remainder = u32::try_from(ticks % u64::from(reload)).unwrap_or(reload);
        for _ in 0..periods {
            self.delay_ticks(bus, reload);
        }
        self.delay_ticks(bus, remainder);
    }

    /// Busy-waits for at least `ticks` counter ticks, `ticks <= reload`.
    ///
    /// Terminates once the wrap-aware elapsed count reaches `ticks`, once two
    /// or more overruns were counted, or once exactly one overrun was counted
    /// and the counter is back below its starting value.
    ///
    /// # Precondition
    ///
    /// The SysTick handler must run promptly while this waits: do not call it
    /// with the exception masked or from a handler of equal or higher
    /// priority. A request left pending from before the call is counted as a
    /// full period and can end the wait early.
    pub fn delay_ticks<B: RegisterBus + ?Sized>(&self, bus: &mut B, ticks: u32) {
        let reload = self.config.reload;
        let count_start = read_field(bus, fields::CVR_CURRENT);
        let overruns_start = self.overruns.load(Ordering::Relaxed);
        loop {
            // Overruns first: every counted period then predates `count_now`.
            let overruns_now = self.overruns.load(Ordering::Relaxed);
            let count_now = read_field(bus, fields::CVR_CURRENT);
            let elapsed = if count_now <= count_start {
                count_start - count_now
            } else {
                count_start + reload.saturating_sub(count_now)
            };
            let periods = overruns_now.wrapping_sub(overruns_start);
            if elapsed >= ticks || periods >= 2 || (periods == 1 && count_now < count_start) {
                return;
            }
            core::hint::spin_loop();
        }
    }

    /// Converts a duration to counter ticks, rounding up and saturating at
    /// `u64::MAX`.
    #[must_use]
    pub fn duration_to_ticks(&self, duration: Duration) -> u64 {
        let hz = u128::from(self.config.clock_hz);
        duration
            .as_nanos()
            .checked_mul(hz)
            .map_or(u64::MAX, |scaled| {
                u64::try_from(scaled.div_ceil(NANOS_PER_SEC)).unwrap_or(u64::MAX)
            })
    }

    /// Converts counter ticks to a duration, rounding down to whole nanoseconds.
    #[must_use]
    pub fn ticks_to_duration(&self, ticks: u64) -> Duration {
        let hz = self.config.clock_hz;
        let secs = ticks / hz;
        let sub_nanos = u128::from(ticks % hz) * NANOS_PER_SEC / u128::from(hz);
        Duration::new(secs, u32::try_from(sub_nanos).unwrap_or(0))
    }

    /// Runs one init stage.
    ///
    /// # Errors
    ///
    /// Returns an [`InterruptError`] if `controller` uses a table that rejects
    /// a SysTick operation; this cannot happen with the table passed to
    /// [`Self::new`].
    pub fn init<B: RegisterBus + ?Sized>(
        &self,
        stage: InitStage,
        bus: &mut B,
        controller: &InterruptController<'_>,
    ) -> Result<(), InterruptError> {
        debug!("systick init stage {stage:?}");
        match stage {
            InitStage::PeripheryConfig => {
                modify_field(bus, fields::CSR_CLKSOURCE, self.config.source.clksource_bit());
                write_field_blind(bus, fields::RVR_RELOAD, self.config.reload);
                modify_field(bus, fields::CSR_ENABLE, 0);
                controller.disable(bus, InterruptLine::SYSTICK)?;
                write_field_blind(bus, fields::CVR_CURRENT, 0);
            }
            InitStage::InterruptConfig => {
                controller.set_priority(bus, InterruptLine::SYSTICK, self.config.tick_priority)?;
                controller.clear_pending(bus, InterruptLine::SYSTICK)?;
            }
            InitStage::PeripheryEnable => {
                modify_field(bus, fields::CSR_ENABLE, 1);
                controller.enable(bus, InterruptLine::SYSTICK)?;
            }
        }
        Ok(())
    }

    /// Runs every init stage in [`InitStage::ORDER`].
    ///
    /// # Errors
    ///
    /// Propagates the first stage failure.
    pub fn init_all<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        controller: &InterruptController<'_>,
    ) -> Result<(), InterruptError> {
        for stage in InitStage::ORDER {
            self.init(stage, bus, controller)?;
        }
        Ok(())
    }
}
