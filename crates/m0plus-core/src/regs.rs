//! Named hardware registers and fields, and the bus contract used to reach them.
//!
//! Nothing in this crate touches an address directly. Every access is
//! expressed as "read field X" or "write field X := value" against a
//! [`RegisterBus`], and the firmware decides how a [`Register`] maps onto
//! memory-mapped I/O.

use core::fmt;

/// Base address of the NVIC register block.
pub const NVIC_BASE: u32 = 0xE000_E100;
/// Base address of the SysTick register block.
pub const SYSTICK_BASE: u32 = 0xE000_E010;
/// Base address of the System Control Block registers used here.
pub const SCB_BASE: u32 = 0xE000_ED00;

/// Number of NVIC priority registers (`IPR0..IPR7`) on an ARMv6-M core.
pub const PRIORITY_REGISTER_COUNT: u8 = 8;

/// Key that must accompany every write to `AIRCR`.
pub const AIRCR_VECTKEY: u32 = 0x05FA;

/// Hardware registers this core reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// NVIC interrupt set-enable register.
    Iser,
    /// NVIC interrupt clear-enable register.
    Icer,
    /// NVIC interrupt set-pending register.
    Ispr,
    /// NVIC interrupt clear-pending register.
    Icpr,
    /// NVIC interrupt priority register `IPRn` (`n` in `0..8`).
    Ipr(u8),
    /// SCB interrupt control and state register.
    Icsr,
    /// SCB application interrupt and reset control register.
    Aircr,
    /// SCB system handler priority register 2 (SVCall).
    Shpr2,
    /// SCB system handler priority register 3 (PendSV, SysTick).
    Shpr3,
    /// SCB debug fault status register.
    Dfsr,
    /// SysTick control and status register.
    SystCsr,
    /// SysTick reload value register.
    SystRvr,
    /// SysTick current value register.
    SystCvr,
    /// SysTick calibration value register.
    SystCalib,
}

impl Register {
    /// Returns the architectural address of this register.
    #[must_use]
    pub const fn address(self) -> u32 {
        match self {
            Self::Iser => NVIC_BASE,
            Self::Icer => NVIC_BASE + 0x080,
            Self::Ispr => NVIC_BASE + 0x100,
            Self::Icpr => NVIC_BASE + 0x180,
            Self::Ipr(n) => NVIC_BASE + 0x300 + 4 * n as u32,
            Self::Icsr => SCB_BASE + 0x04,
            Self::Aircr => SCB_BASE + 0x0C,
            Self::Shpr2 => SCB_BASE + 0x1C,
            Self::Shpr3 => SCB_BASE + 0x20,
            Self::Dfsr => SCB_BASE + 0x30,
            Self::SystCsr => SYSTICK_BASE,
            Self::SystRvr => SYSTICK_BASE + 0x04,
            Self::SystCvr => SYSTICK_BASE + 0x08,
            Self::SystCalib => SYSTICK_BASE + 0x0C,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iser => f.write_str("NVIC.ISER"),
            Self::Icer => f.write_str("NVIC.ICER"),
            Self::Ispr => f.write_str("NVIC.ISPR"),
            Self::Icpr => f.write_str("NVIC.ICPR"),
            Self::Ipr(n) => write!(f, "NVIC.IPR{n}"),
            Self::Icsr => f.write_str("SCB.ICSR"),
            Self::Aircr => f.write_str("SCB.AIRCR"),
            Self::Shpr2 => f.write_str("SCB.SHPR2"),
            Self::Shpr3 => f.write_str("SCB.SHPR3"),
            Self::Dfsr => f.write_str("SCB.DFSR"),
            Self::SystCsr => f.write_str("SYST.CSR"),
            Self::SystRvr => f.write_str("SYST.RVR"),
            Self::SystCvr => f.write_str("SYST.CVR"),
            Self::SystCalib => f.write_str("SYST.CALIB"),
        }
    }
}

/// A contiguous bit field inside one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    /// Register holding the field.
    pub register: Register,
    /// Bit position of the field's least significant bit.
    pub offset: u8,
    /// Field width in bits (`1..=32`).
    pub width: u8,
}

impl Field {
    /// Describes a field of `width` bits starting at `offset`.
    #[must_use]
    pub const fn new(register: Register, offset: u8, width: u8) -> Self {
        Self {
            register,
            offset,
            width,
        }
    }

    /// Describes a single-bit field.
    #[must_use]
    pub const fn bit(register: Register, offset: u8) -> Self {
        Self::new(register, offset, 1)
    }

    /// Mask of the field's bits at their in-register position.
    #[must_use]
    pub const fn mask(self) -> u32 {
        let low = if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        };
        low << self.offset
    }

    /// Places `value` at the field position, dropping bits that do not fit.
    #[must_use]
    pub const fn place(self, value: u32) -> u32 {
        (value << self.offset) & self.mask()
    }

    /// Extracts the field from a full register value.
    #[must_use]
    pub const fn extract(self, register_value: u32) -> u32 {
        (register_value & self.mask()) >> self.offset
    }
}

/// Named fields used by the interrupt controller, clock and fault analyzer.
pub mod fields {
    use super::{Field, Register};

    /// `ICSR.NMIPENDSET`: write 1 to pend NMI, reads NMI pending state.
    pub const ICSR_NMIPENDSET: Field = Field::bit(Register::Icsr, 31);
    /// `ICSR.PENDSVSET`: write 1 to pend PendSV, reads PendSV pending state.
    pub const ICSR_PENDSVSET: Field = Field::bit(Register::Icsr, 28);
    /// `ICSR.PENDSVCLR`: write 1 to clear PendSV pending state.
    pub const ICSR_PENDSVCLR: Field = Field::bit(Register::Icsr, 27);
    /// `ICSR.PENDSTSET`: write 1 to pend SysTick, reads SysTick pending state.
    pub const ICSR_PENDSTSET: Field = Field::bit(Register::Icsr, 26);
    /// `ICSR.PENDSTCLR`: write 1 to clear SysTick pending state.
    pub const ICSR_PENDSTCLR: Field = Field::bit(Register::Icsr, 25);
    /// `ICSR.VECTACTIVE`: number of the currently active exception.
    pub const ICSR_VECTACTIVE: Field = Field::new(Register::Icsr, 0, 6);

    /// `AIRCR.VECTKEY`: write key, must be `0x05FA`.
    pub const AIRCR_VECTKEY: Field = Field::new(Register::Aircr, 16, 16);
    /// `AIRCR.SYSRESETREQ`: requests a system reset.
    pub const AIRCR_SYSRESETREQ: Field = Field::bit(Register::Aircr, 2);

    /// `SHPR2.PRI_11`: SVCall priority byte.
    pub const SHPR2_PRI_11: Field = Field::new(Register::Shpr2, 24, 8);
    /// `SHPR3.PRI_14`: PendSV priority byte.
    pub const SHPR3_PRI_14: Field = Field::new(Register::Shpr3, 16, 8);
    /// `SHPR3.PRI_15`: SysTick priority byte.
    pub const SHPR3_PRI_15: Field = Field::new(Register::Shpr3, 24, 8);

    /// `DFSR.HALTED`: halt request debug event.
    pub const DFSR_HALTED: Field = Field::bit(Register::Dfsr, 0);
    /// `DFSR.BKPT`: breakpoint debug event.
    pub const DFSR_BKPT: Field = Field::bit(Register::Dfsr, 1);
    /// `DFSR.DWTTRAP`: data watchpoint trap debug event.
    pub const DFSR_DWTTRAP: Field = Field::bit(Register::Dfsr, 2);
    /// `DFSR.VCATCH`: vector catch debug event.
    pub const DFSR_VCATCH: Field = Field::bit(Register::Dfsr, 3);
    /// `DFSR.EXTERNAL`: external debug request event.
    pub const DFSR_EXTERNAL: Field = Field::bit(Register::Dfsr, 4);

    /// `SYST_CSR.ENABLE`: counter enable.
    pub const CSR_ENABLE: Field = Field::bit(Register::SystCsr, 0);
    /// `SYST_CSR.TICKINT`: exception request on count to zero.
    pub const CSR_TICKINT: Field = Field::bit(Register::SystCsr, 1);
    /// `SYST_CSR.CLKSOURCE`: 1 selects the processor clock.
    pub const CSR_CLKSOURCE: Field = Field::bit(Register::SystCsr, 2);
    /// `SYST_CSR.COUNTFLAG`: counted to zero since last read; clear-on-read.
    pub const CSR_COUNTFLAG: Field = Field::bit(Register::SystCsr, 16);
    /// `SYST_RVR.RELOAD`: 24-bit reload value.
    pub const RVR_RELOAD: Field = Field::new(Register::SystRvr, 0, 24);
    /// `SYST_CVR.CURRENT`: 24-bit current counter value.
    pub const CVR_CURRENT: Field = Field::new(Register::SystCvr, 0, 24);
}

/// Register-level access contract consumed by every operation in this crate.
///
/// Reads take `&mut self` because some reads have side effects: reading
/// `SYST_CSR` clears `COUNTFLAG`.
pub trait RegisterBus {
    /// Reads the full 32-bit value of `register`.
    fn read(&mut self, register: Register) -> u32;

    /// Writes the full 32-bit value of `register`.
    fn write(&mut self, register: Register, value: u32);
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&mut self, register: Register) -> u32 {
        (**self).read(register)
    }

    fn write(&mut self, register: Register, value: u32) {
        (**self).write(register, value);
    }
}

/// Reads one field.
pub fn read_field<B: RegisterBus + ?Sized>(bus: &mut B, field: Field) -> u32 {
    field.extract(bus.read(field.register))
}

/// Reads a single-bit field as a flag.
pub fn read_flag<B: RegisterBus + ?Sized>(bus: &mut B, field: Field) -> bool {
    read_field(bus, field) != 0
}

/// Writes a register whose only non-zero bits are `value` placed at `field`.
///
/// Used for write-one-to-act registers (`ISER`, `ICER`, `ISPR`, `ICPR`,
/// the `ICSR` set/clear bits), where zero bits have no effect.
pub fn write_field_blind<B: RegisterBus + ?Sized>(bus: &mut B, field: Field, value: u32) {
    bus.write(field.register, field.place(value));
}

/// Read-modify-write of one field, leaving the rest of the register intact.
pub fn modify_field<B: RegisterBus + ?Sized>(bus: &mut B, field: Field, value: u32) {
    let current = bus.read(field.register);
    bus.write(
        field.register,
        (current & !field.mask()) | field.place(value),
    );
}
