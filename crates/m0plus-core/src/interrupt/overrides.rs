//! System control block routing for core exceptions.
//!
//! SysTick, PendSV, NMI and SVCall share the signed index space with NVIC
//! lines, but their enable, pending and priority controls live in `SCB` and
//! `SYST` registers. Each entry maps one of those indices onto the fields that
//! implement each operation; a `None` field means the hardware has no control
//! for it.

use crate::interrupt::{Capabilities, InterruptLine, Operation};
use crate::regs::{fields, Field};

/// Register routing for one core exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreOverride {
    /// Overridden line.
    pub line: InterruptLine,
    /// Read/write enable bit.
    pub enable: Option<Field>,
    /// Write-one-to-pend bit.
    pub set_pending: Option<Field>,
    /// Write-one-to-clear bit.
    pub clear_pending: Option<Field>,
    /// Bit reporting the pending state.
    pub pending_status: Option<Field>,
    /// Priority byte lane.
    pub priority: Option<Field>,
}

/// Overrides for the Cortex-M0+ core exceptions.
pub const CORE_EXCEPTION_OVERRIDES: [CoreOverride; 4] = [
    CoreOverride {
        line: InterruptLine::SYSTICK,
        enable: Some(fields::CSR_TICKINT),
        set_pending: Some(fields::ICSR_PENDSTSET),
        clear_pending: Some(fields::ICSR_PENDSTCLR),
        pending_status: Some(fields::ICSR_PENDSTSET),
        priority: Some(fields::SHPR3_PRI_15),
    },
    CoreOverride {
        line: InterruptLine::PEND_SV,
        enable: None,
        set_pending: Some(fields::ICSR_PENDSVSET),
        clear_pending: Some(fields::ICSR_PENDSVCLR),
        pending_status: Some(fields::ICSR_PENDSVSET),
        priority: Some(fields::SHPR3_PRI_14),
    },
    CoreOverride {
        line: InterruptLine::NON_MASKABLE_INT,
        enable: None,
        set_pending: Some(fields::ICSR_NMIPENDSET),
        clear_pending: None,
        pending_status: Some(fields::ICSR_NMIPENDSET),
        priority: None,
    },
    CoreOverride {
        line: InterruptLine::SV_CALL,
        enable: None,
        set_pending: None,
        clear_pending: None,
        pending_status: None,
        priority: Some(fields::SHPR2_PRI_11),
    },
];

impl CoreOverride {
    /// Field that implements `operation`, if the hardware has one.
    #[must_use]
    pub const fn field_for(&self, operation: Operation) -> Option<Field> {
        match operation {
            Operation::Enable | Operation::Disable | Operation::ReadEnabled => self.enable,
            Operation::SetPending => self.set_pending,
            Operation::ClearPending => self.clear_pending,
            Operation::ReadPending => self.pending_status,
            Operation::SetPriority | Operation::ReadPriority => self.priority,
        }
    }

    /// Returns `true` when every operation allowed by `caps` has a backing field.
    #[must_use]
    pub const fn covers(&self, caps: Capabilities) -> bool {
        let mut i = 0;
        while i < Operation::ALL.len() {
            let operation = Operation::ALL[i];
            if caps.allows(operation) && self.field_for(operation).is_none() {
                return false;
            }
            i += 1;
        }
        true
    }
}
