//! Register-accurate simulation of the NVIC, SCB and SysTick blocks.
//!
//! [`SimulatedCore`] implements [`RegisterBus`] so every operation of this
//! crate can run on a host. The SysTick counter advances by a configurable
//! number of ticks after each bus access, and the SysTick exception can be
//! delivered at the end of the access that wrapped the counter or one access
//! later, which is enough to reproduce every interleaving the clock's retry
//! protocol has to survive.

use log::{debug, warn};

use crate::fault::DebugFaultStatus;
use crate::regs::{fields, Register, RegisterBus, AIRCR_VECTKEY, PRIORITY_REGISTER_COUNT};
use crate::SysTickClock;

/// Implemented bits of each `IPRn` register: the top two bits of every lane.
pub const IPR_IMPLEMENTED: u32 = 0xC0C0_C0C0;
/// Implemented bits of `SHPR2`.
pub const SHPR2_IMPLEMENTED: u32 = 0xC000_0000;
/// Implemented bits of `SHPR3`.
pub const SHPR3_IMPLEMENTED: u32 = 0xC0C0_0000;

const CSR_CONTROL: u32 = 0b111;
const DFSR_IMPLEMENTED: u32 = 0b1_1111;
const ICSR_STATE: u32 =
    fields::ICSR_NMIPENDSET.mask() | fields::ICSR_PENDSVSET.mask() | fields::ICSR_PENDSTSET.mask();
const AIRCR_READBACK: u32 = 0xFA05_0000;

/// When the SysTick handler runs relative to the wrap that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsrDelivery {
    /// At the end of the access during which the counter wrapped.
    #[default]
    Immediate,
    /// At the end of the following access.
    Deferred,
}

/// Snapshot of every simulated register, as hardware would hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegisterFile {
    /// Enabled peripheral lines (`ISER`/`ICER` view).
    pub enabled: u32,
    /// Pending peripheral lines (`ISPR`/`ICPR` view).
    pub pending: u32,
    /// `IPR0..IPR7`.
    pub ipr: [u32; PRIORITY_REGISTER_COUNT as usize],
    /// `ICSR` pending bits and `VECTACTIVE`.
    pub icsr: u32,
    /// `SHPR2`.
    pub shpr2: u32,
    /// `SHPR3`.
    pub shpr3: u32,
    /// `DFSR`.
    pub dfsr: u32,
    /// `SYST_CSR`, including `COUNTFLAG`.
    pub csr: u32,
    /// `SYST_RVR`.
    pub rvr: u32,
    /// `SYST_CVR`.
    pub cvr: u32,
    /// `SYST_CALIB`.
    pub calib: u32,
}

/// Host-side stand-in for the core peripherals.
#[derive(Debug)]
pub struct SimulatedCore<'c> {
    regs: RegisterFile,
    clock: Option<&'c SysTickClock>,
    pattern: &'c [u32],
    cursor: usize,
    delivery: IsrDelivery,
    deferred: u32,
    reads: u64,
    writes: u64,
    elapsed: u64,
    reset_requests: u32,
}

impl Default for SimulatedCore<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'c> SimulatedCore<'c> {
    /// Core in its reset state; the counter advances one tick per access.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regs: RegisterFile {
                enabled: 0,
                pending: 0,
                ipr: [0; PRIORITY_REGISTER_COUNT as usize],
                icsr: 0,
                shpr2: 0,
                shpr3: 0,
                dfsr: 0,
                csr: 0,
                rvr: 0,
                cvr: 0,
                calib: 0,
            },
            clock: None,
            pattern: &[1],
            cursor: 0,
            delivery: IsrDelivery::Immediate,
            deferred: 0,
            reads: 0,
            writes: 0,
            elapsed: 0,
            reset_requests: 0,
        }
    }

    /// Routes SysTick exceptions to `clock`'s handler instead of leaving
    /// them pending in `ICSR`.
    #[must_use]
    pub const fn with_clock(mut self, clock: &'c SysTickClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Ticks the counter advances after successive accesses, cycled.
    ///
    /// An empty pattern freezes the counter between explicit
    /// [`advance`](Self::advance) calls.
    #[must_use]
    pub const fn with_access_pattern(mut self, pattern: &'c [u32]) -> Self {
        self.pattern = pattern;
        self.cursor = 0;
        self
    }

    /// Selects when the SysTick handler runs after a wrap.
    #[must_use]
    pub const fn with_isr_delivery(mut self, delivery: IsrDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Current register contents.
    #[must_use]
    pub const fn registers(&self) -> RegisterFile {
        self.regs
    }

    /// Bus reads performed so far.
    #[must_use]
    pub const fn reads(&self) -> u64 {
        self.reads
    }

    /// Bus writes performed so far.
    #[must_use]
    pub const fn writes(&self) -> u64 {
        self.writes
    }

    /// Ticks counted while the counter was enabled.
    #[must_use]
    pub const fn elapsed_ticks(&self) -> u64 {
        self.elapsed
    }

    /// Accepted `AIRCR.SYSRESETREQ` writes.
    #[must_use]
    pub const fn reset_requests(&self) -> u32 {
        self.reset_requests
    }

    /// Advances the counter outside any access. Handlers run at once,
    /// including any still deferred.
    pub fn advance(&mut self, ticks: u64) {
        let late = core::mem::take(&mut self.deferred);
        let wraps = self.count(ticks);
        self.run_handler(late.saturating_add(wraps));
    }

    /// Latches debug event indicators in `DFSR`.
    pub const fn set_debug_status(&mut self, status: DebugFaultStatus) {
        self.regs.dfsr = status.raw() & DFSR_IMPLEMENTED;
    }

    /// Sets the exception number reported by `ICSR.VECTACTIVE`.
    pub const fn set_active_vector(&mut self, vector: u8) {
        let field = fields::ICSR_VECTACTIVE;
        self.regs.icsr = (self.regs.icsr & !field.mask()) | field.place(vector as u32);
    }

    fn count(&mut self, ticks: u64) -> u32 {
        if ticks == 0 || fields::CSR_ENABLE.extract(self.regs.csr) == 0 || self.regs.rvr == 0 {
            return 0;
        }
        self.elapsed = self.elapsed.saturating_add(ticks);
        let current = u64::from(self.regs.cvr);
        if ticks <= current {
            self.regs.cvr = truncate(current - ticks);
            return 0;
        }
        let period = u64::from(self.regs.rvr) + 1;
        let remaining = ticks - (current + 1);
        self.regs.cvr = self.regs.rvr - truncate(remaining % period);
        self.regs.csr |= fields::CSR_COUNTFLAG.mask();
        let wraps = 1 + remaining / period;
        if fields::CSR_TICKINT.extract(self.regs.csr) == 0 {
            return 0;
        }
        let wraps = u32::try_from(wraps).unwrap_or(u32::MAX);
        if self.clock.is_none() {
            self.regs.icsr |= fields::ICSR_PENDSTSET.mask();
            return 0;
        }
        wraps
    }

    fn run_handler(&self, wraps: u32) {
        if let Some(clock) = self.clock {
            for _ in 0..wraps {
                clock.on_tick();
            }
        }
    }

    fn settle(&mut self) {
        let late = core::mem::take(&mut self.deferred);
        self.run_handler(late);
        let step = if self.pattern.is_empty() {
            0
        } else {
            let step = self.pattern[self.cursor % self.pattern.len()];
            self.cursor = (self.cursor + 1) % self.pattern.len();
            step
        };
        let wraps = self.count(u64::from(step));
        match self.delivery {
            IsrDelivery::Immediate => self.run_handler(wraps),
            IsrDelivery::Deferred => self.deferred = wraps,
        }
    }

    fn write_icsr(&mut self, value: u32) {
        let icsr = &mut self.regs.icsr;
        if fields::ICSR_NMIPENDSET.extract(value) != 0 {
            *icsr |= fields::ICSR_NMIPENDSET.mask();
        }
        if fields::ICSR_PENDSVSET.extract(value) != 0 {
            *icsr |= fields::ICSR_PENDSVSET.mask();
        }
        if fields::ICSR_PENDSVCLR.extract(value) != 0 {
            *icsr &= !fields::ICSR_PENDSVSET.mask();
        }
        if fields::ICSR_PENDSTSET.extract(value) != 0 {
            *icsr |= fields::ICSR_PENDSTSET.mask();
        }
        if fields::ICSR_PENDSTCLR.extract(value) != 0 {
            *icsr &= !fields::ICSR_PENDSTSET.mask();
        }
    }

    fn write_aircr(&mut self, value: u32) {
        if fields::AIRCR_VECTKEY.extract(value) != AIRCR_VECTKEY {
            warn!("AIRCR write {value:#010x} without VECTKEY ignored");
            return;
        }
        if fields::AIRCR_SYSRESETREQ.extract(value) != 0 {
            self.reset_requests = self.reset_requests.saturating_add(1);
            debug!("system reset requested");
        }
    }
}

impl RegisterBus for SimulatedCore<'_> {
    fn read(&mut self, register: Register) -> u32 {
        self.reads += 1;
        let value = match register {
            Register::Iser | Register::Icer => self.regs.enabled,
            Register::Ispr | Register::Icpr => self.regs.pending,
            Register::Ipr(n) => self.regs.ipr.get(usize::from(n)).copied().unwrap_or(0),
            Register::Icsr => self.regs.icsr & (ICSR_STATE | fields::ICSR_VECTACTIVE.mask()),
            Register::Aircr => AIRCR_READBACK,
            Register::Shpr2 => self.regs.shpr2,
            Register::Shpr3 => self.regs.shpr3,
            Register::Dfsr => self.regs.dfsr,
            Register::SystCsr => {
                let csr = self.regs.csr;
                self.regs.csr &= !fields::CSR_COUNTFLAG.mask();
                csr
            }
            Register::SystRvr => self.regs.rvr,
            Register::SystCvr => self.regs.cvr,
            Register::SystCalib => self.regs.calib,
        };
        self.settle();
        value
    }

    fn write(&mut self, register: Register, value: u32) {
        self.writes += 1;
        match register {
            Register::Iser => self.regs.enabled |= value,
            Register::Icer => self.regs.enabled &= !value,
            Register::Ispr => self.regs.pending |= value,
            Register::Icpr => self.regs.pending &= !value,
            Register::Ipr(n) => {
                if let Some(ipr) = self.regs.ipr.get_mut(usize::from(n)) {
                    *ipr = value & IPR_IMPLEMENTED;
                }
            }
            Register::Icsr => self.write_icsr(value),
            Register::Aircr => self.write_aircr(value),
            Register::Shpr2 => self.regs.shpr2 = value & SHPR2_IMPLEMENTED,
            Register::Shpr3 => self.regs.shpr3 = value & SHPR3_IMPLEMENTED,
            Register::Dfsr => self.regs.dfsr &= !value,
            Register::SystCsr => {
                self.regs.csr = (self.regs.csr & !CSR_CONTROL) | (value & CSR_CONTROL);
            }
            Register::SystRvr => self.regs.rvr = fields::RVR_RELOAD.place(value),
            Register::SystCvr => {
                self.regs.cvr = self.regs.rvr;
                self.regs.csr &= !fields::CSR_COUNTFLAG.mask();
            }
            Register::SystCalib => {}
        }
        self.settle();
    }
}

fn truncate(ticks: u64) -> u32 {
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{IsrDelivery, SimulatedCore};
    use crate::clock::ClockConfig;
    use crate::interrupt::CORTEX_M0PLUS;
    use crate::regs::{fields, Register, RegisterBus};
    use crate::SysTickClock;

    fn running(core: &mut SimulatedCore<'_>, reload: u32) {
        core.write(Register::SystRvr, reload);
        core.write(Register::SystCvr, 0);
        core.write(Register::SystCsr, 0b111);
    }

    #[test]
    fn stopped_counter_does_not_move() {
        let mut core = SimulatedCore::new();
        core.write(Register::SystRvr, 99);
        core.write(Register::SystCvr, 0);
        core.advance(500);
        assert_eq!(core.registers().cvr, 99);
        assert_eq!(core.elapsed_ticks(), 0);
    }

    #[test]
    fn wrap_happens_on_the_reload_transition() {
        let mut core = SimulatedCore::new().with_access_pattern(&[]);
        running(&mut core, 9);
        core.advance(9);
        assert_eq!(core.registers().cvr, 0);
        assert_eq!(core.registers().csr & fields::CSR_COUNTFLAG.mask(), 0);
        core.advance(1);
        assert_eq!(core.registers().cvr, 9);
        assert_ne!(core.registers().csr & fields::CSR_COUNTFLAG.mask(), 0);
    }

    #[test]
    fn countflag_clears_on_read() {
        let mut core = SimulatedCore::new().with_access_pattern(&[]);
        running(&mut core, 9);
        core.advance(10);
        assert_ne!(core.read(Register::SystCsr) & (1 << 16), 0);
        assert_eq!(core.read(Register::SystCsr) & (1 << 16), 0);
    }

    #[test]
    fn wrap_without_handler_pends_systick() {
        let mut core = SimulatedCore::new().with_access_pattern(&[]);
        running(&mut core, 9);
        core.advance(25);
        assert_eq!(core.registers().cvr, 4);
        assert_ne!(core.registers().icsr & fields::ICSR_PENDSTSET.mask(), 0);
    }

    #[test]
    fn deferred_handler_runs_one_access_late() {
        let config = ClockConfig {
            clock_hz: 1_000,
            reload: 3,
            ..ClockConfig::default()
        };
        let clock = SysTickClock::new(config, &CORTEX_M0PLUS).expect("valid config");
        let mut core = SimulatedCore::new()
            .with_clock(&clock)
            .with_access_pattern(&[4])
            .with_isr_delivery(IsrDelivery::Deferred);
        core.write(Register::SystRvr, 3);
        core.write(Register::SystCvr, 0);
        core.write(Register::SystCsr, 0b111);
        assert_eq!(clock.overruns(), 0);
        core.read(Register::SystCvr);
        assert_eq!(clock.overruns(), 1);
    }

    #[test]
    fn priority_registers_keep_only_implemented_bits() {
        let mut core = SimulatedCore::new();
        core.write(Register::Ipr(2), u32::MAX);
        core.write(Register::Shpr3, u32::MAX);
        assert_eq!(core.registers().ipr[2], 0xC0C0_C0C0);
        assert_eq!(core.registers().shpr3, 0xC0C0_0000);
    }

    #[test]
    fn aircr_requires_the_key() {
        let mut core = SimulatedCore::new();
        core.write(Register::Aircr, 1 << 2);
        assert_eq!(core.reset_requests(), 0);
        core.write(Register::Aircr, 0x05FA_0004);
        assert_eq!(core.reset_requests(), 1);
    }
}
