//! Fault classification from the debug fault status and active vector.
//!
//! ARMv6-M has no configurable fault status registers: everything escalates
//! to HardFault, and the only clues are five `DFSR` debug-event bits and the
//! active exception number.

use core::fmt;

use crate::regs::{fields, read_field, read_flag, RegisterBus};

/// Whether this core family latches a faulting address. ARMv6-M has no
/// `MMFAR`/`BFAR`, so every classification reports the address as absent.
pub const CAPTURES_FAULT_ADDRESS: bool = false;

/// The five `DFSR` debug-event indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DebugFaultStatus {
    /// External debug request (`EXTERNAL`).
    pub external: bool,
    /// Vector catch (`VCATCH`).
    pub vector_catch: bool,
    /// Data watchpoint trap (`DWTTRAP`).
    pub dwt_trap: bool,
    /// Breakpoint (`BKPT`).
    pub breakpoint: bool,
    /// Halt request (`HALTED`).
    pub halted: bool,
}

impl DebugFaultStatus {
    /// Decodes the packed form `external<<4 | vcatch<<3 | dwttrap<<2 | bkpt<<1 | halted`.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            external: raw & (1 << 4) != 0,
            vector_catch: raw & (1 << 3) != 0,
            dwt_trap: raw & (1 << 2) != 0,
            breakpoint: raw & (1 << 1) != 0,
            halted: raw & 1 != 0,
        }
    }

    /// Packed five-bit form.
    #[must_use]
    pub const fn raw(self) -> u32 {
        ((self.external as u32) << 4)
            | ((self.vector_catch as u32) << 3)
            | ((self.dwt_trap as u32) << 2)
            | ((self.breakpoint as u32) << 1)
            | (self.halted as u32)
    }

    /// Reads the five indicators through the bus.
    pub fn read<B: RegisterBus + ?Sized>(bus: &mut B) -> Self {
        Self {
            external: read_flag(bus, fields::DFSR_EXTERNAL),
            vector_catch: read_flag(bus, fields::DFSR_VCATCH),
            dwt_trap: read_flag(bus, fields::DFSR_DWTTRAP),
            breakpoint: read_flag(bus, fields::DFSR_BKPT),
            halted: read_flag(bus, fields::DFSR_HALTED),
        }
    }
}

/// Exception the fault was delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// HardFault, the only fault exception on this core.
    Hard,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hard => f.write_str("HardFault"),
        }
    }
}

/// Cause inferred from the status indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCause {
    /// External debug request was asserted.
    ExternalDebug,
    /// A vector catch triggered.
    VectorCatch,
    /// A DWT watchpoint matched.
    DwtTrap,
    /// A `BKPT` instruction executed.
    Breakpoint,
    /// The debugger requested a halt.
    HaltRequest,
    /// No debug event is set; a finer-grained fault escalated to HardFault.
    EscalatedFault,
}

impl FaultCause {
    /// Short stable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExternalDebug => "ExternalDebug",
            Self::VectorCatch => "VectorCatch",
            Self::DwtTrap => "DWTTrap",
            Self::Breakpoint => "Breakpoint",
            Self::HaltRequest => "HaltRequest",
            Self::EscalatedFault => "EscalatedFault",
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ExternalDebug => "external debug request",
            Self::VectorCatch => "vector catch",
            Self::DwtTrap => "data watchpoint trap",
            Self::Breakpoint => "breakpoint instruction",
            Self::HaltRequest => "halt request",
            Self::EscalatedFault => "fault escalated to HardFault",
        }
    }
}

impl fmt::Display for FaultCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaultClassification {
    /// Exception the fault arrived through.
    pub kind: FaultKind,
    /// Inferred cause.
    pub cause: FaultCause,
    /// Packed `DFSR` bits, or the active vector number for
    /// [`FaultCause::EscalatedFault`].
    pub status_bits: u32,
    /// Faulting address when the core latches one.
    pub fault_address: Option<u32>,
}

/// Classifies a fault, first match wins in the order external debug,
/// vector catch, DWT trap, breakpoint, halt request.
///
/// With no indicator set the status reported is `active_vector`, the only
/// remaining clue after escalation.
#[must_use]
pub const fn classify_status(status: DebugFaultStatus, active_vector: u32) -> FaultClassification {
    let cause = if status.external {
        FaultCause::ExternalDebug
    } else if status.vector_catch {
        FaultCause::VectorCatch
    } else if status.dwt_trap {
        FaultCause::DwtTrap
    } else if status.breakpoint {
        FaultCause::Breakpoint
    } else if status.halted {
        FaultCause::HaltRequest
    } else {
        FaultCause::EscalatedFault
    };
    let status_bits = match cause {
        FaultCause::EscalatedFault => active_vector,
        _ => status.raw(),
    };
    FaultClassification {
        kind: FaultKind::Hard,
        cause,
        status_bits,
        fault_address: None,
    }
}

/// Reads the status indicators and active vector, then classifies.
pub fn classify<B: RegisterBus + ?Sized>(bus: &mut B) -> FaultClassification {
    let status = DebugFaultStatus::read(bus);
    let active_vector = read_field(bus, fields::ICSR_VECTACTIVE);
    classify_status(status, active_vector)
}
