//! Validated enable/disable/pending/priority control over interrupt lines.

use log::trace;

use crate::interrupt::{Backing, InterruptLine, InterruptTable, LineDescriptor, Operation, Priority};
use crate::regs::{modify_field, read_field, write_field_blind, Field, Register, RegisterBus};
use crate::InterruptError;

/// One resolved register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// Write-one-to-act bit, other bits written as zero.
    Strobe(Field),
    /// Read-modify-write of a field.
    Store(Field, u32),
    /// Field read.
    Load(Field),
}

/// Interrupt controller front end shared by NVIC lines and core exceptions.
///
/// Every call validates against the capability table before touching the
/// bus; a rejected call performs no register access at all.
#[derive(Debug, Clone, Copy)]
pub struct InterruptController<'t> {
    table: &'t InterruptTable,
}

impl<'t> InterruptController<'t> {
    /// Creates a controller over `table`.
    #[must_use]
    pub const fn new(table: &'t InterruptTable) -> Self {
        Self { table }
    }

    /// Capability table in use.
    #[must_use]
    pub const fn table(&self) -> &'t InterruptTable {
        self.table
    }

    /// Enables delivery of `line`.
    ///
    /// # Errors
    ///
    /// Returns an [`InterruptError`] when the line is invalid or cannot be enabled.
    pub fn enable<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        line: InterruptLine,
    ) -> Result<(), InterruptError> {
        self.apply(bus, line, Operation::Enable, 1).map(drop)
    }

    /// Disables delivery of `line`.
    ///
    /// # Errors
    ///
    /// Returns an [`InterruptError`] when the line is invalid or cannot be disabled.
    pub fn disable<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        line: InterruptLine,
    ) -> Result<(), InterruptError> {
        self.apply(bus, line, Operation::Disable, 0).map(drop)
    }

    /// Forces `line` pending.
    ///
    /// # Errors
    ///
    /// Returns an [`InterruptError`] when the line is invalid or cannot be pended.
    pub fn set_pending<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        line: InterruptLine,
    ) -> Result<(), InterruptError> {
        self.apply(bus, line, Operation::SetPending, 1).map(drop)
    }

    /// Clears a pending request on `line`.
    ///
    /// # Errors
    ///
    /// Returns an [`InterruptError`] when the line is invalid or its pending
    /// state cannot be cleared.
    pub fn clear_pending<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        line: InterruptLine,
    ) -> Result<(), InterruptError> {
        self.apply(bus, line, Operation::ClearPending, 1).map(drop)
    }

    /// Reads the pending state of `line`.
    ///
    /// # Errors
    ///
    /// Returns an [`InterruptError`] when the line is invalid or has no
    /// pending controls.
    pub fn read_pending<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        line: InterruptLine,
    ) -> Result<bool, InterruptError> {
        self.apply(bus, line, Operation::ReadPending, 0)
            .map(|bit| bit != 0)
    }

    /// Reads whether `line` is enabled.
    ///
    /// # Errors
    ///
    /// Returns an [`InterruptError`] when the line is invalid or has no
    /// enable control.
    pub fn is_enabled<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        line: InterruptLine,
    ) -> Result<bool, InterruptError> {
        self.apply(bus, line, Operation::ReadEnabled, 0)
            .map(|bit| bit != 0)
    }

    /// Programs the priority of `line`.
    ///
    /// # Errors
    ///
    /// Returns an [`InterruptError`] when the line is invalid or has a fixed
    /// priority.
    pub fn set_priority<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        line: InterruptLine,
        priority: Priority,
    ) -> Result<(), InterruptError> {
        self.apply(
            bus,
            line,
            Operation::SetPriority,
            u32::from(priority.encoded()),
        )
        .map(drop)
    }

    /// Programs the priority of `line` from a raw value.
    ///
    /// # Errors
    ///
    /// Returns [`InterruptError::PriorityOutOfRange`] for values above 3, or
    /// the line rejection from [`Self::set_priority`].
    pub fn set_priority_raw<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        line: InterruptLine,
        priority: u8,
    ) -> Result<(), InterruptError> {
        self.set_priority(bus, line, Priority::new(priority)?)
    }

    /// Reads back the programmed priority of `line`.
    ///
    /// # Errors
    ///
    /// Returns an [`InterruptError`] when the line is invalid or has a fixed
    /// priority.
    pub fn priority<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        line: InterruptLine,
    ) -> Result<Priority, InterruptError> {
        let lane = self.apply(bus, line, Operation::ReadPriority, 0)?;
        Ok(Priority::from_encoded(lane.to_le_bytes()[0]))
    }

    fn apply<B: RegisterBus + ?Sized>(
        &self,
        bus: &mut B,
        line: InterruptLine,
        operation: Operation,
        value: u32,
    ) -> Result<u32, InterruptError> {
        let descriptor = self.table.check(line, operation)?;
        let access = resolve(&descriptor, operation, value)
            .ok_or(InterruptError::Unsupported { line, operation })?;
        trace!("{operation} {line}: {access:?}");
        Ok(match access {
            Access::Strobe(field) => {
                write_field_blind(bus, field, 1);
                0
            }
            Access::Store(field, value) => {
                modify_field(bus, field, value);
                0
            }
            Access::Load(field) => read_field(bus, field),
        })
    }
}

fn resolve(descriptor: &LineDescriptor, operation: Operation, value: u32) -> Option<Access> {
    match descriptor.backing {
        Backing::Nvic(slot) => {
            let bit = |register| Field::bit(register, slot.bit);
            Some(match operation {
                Operation::Enable => Access::Strobe(bit(Register::Iser)),
                Operation::Disable => Access::Strobe(bit(Register::Icer)),
                Operation::SetPending => Access::Strobe(bit(Register::Ispr)),
                Operation::ClearPending => Access::Strobe(bit(Register::Icpr)),
                Operation::ReadPending => Access::Load(bit(Register::Ispr)),
                Operation::ReadEnabled => Access::Load(bit(Register::Iser)),
                Operation::SetPriority => Access::Store(slot.priority, value),
                Operation::ReadPriority => Access::Load(slot.priority),
            })
        }
        Backing::SystemControl(entry) => {
            let field = entry.field_for(operation)?;
            Some(match operation {
                Operation::Enable | Operation::Disable | Operation::SetPriority => {
                    Access::Store(field, value)
                }
                Operation::SetPending | Operation::ClearPending => Access::Strobe(field),
                Operation::ReadPending | Operation::ReadEnabled | Operation::ReadPriority => {
                    Access::Load(field)
                }
            })
        }
        Backing::Fixed => None,
    }
}

#[cfg(test)]
mod tests {
    use super::InterruptController;
    use crate::interrupt::{InterruptLine, Priority, CORTEX_M0PLUS};
    use crate::regs::{Register, RegisterBus};
    use crate::InterruptError;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<(Register, u32)>,
        reads: Vec<Register>,
    }

    impl RegisterBus for Recorder {
        fn read(&mut self, register: Register) -> u32 {
            self.reads.push(register);
            0
        }

        fn write(&mut self, register: Register, value: u32) {
            self.writes.push((register, value));
        }
    }

    #[test]
    fn nvic_enable_is_a_blind_single_bit_write() {
        let nvic = InterruptController::new(&CORTEX_M0PLUS);
        let mut bus = Recorder::default();
        nvic.enable(&mut bus, InterruptLine::peripheral(5))
            .expect("line 5 can be enabled");
        assert_eq!(bus.writes, vec![(Register::Iser, 1 << 5)]);
        assert!(bus.reads.is_empty());
    }

    #[test]
    fn nvic_disable_targets_clear_enable_register() {
        let nvic = InterruptController::new(&CORTEX_M0PLUS);
        let mut bus = Recorder::default();
        nvic.disable(&mut bus, InterruptLine::peripheral(31))
            .expect("line 31 can be disabled");
        assert_eq!(bus.writes, vec![(Register::Icer, 1 << 31)]);
    }

    #[test]
    fn systick_disable_clears_tickint_with_read_modify_write() {
        let nvic = InterruptController::new(&CORTEX_M0PLUS);
        let mut bus = Recorder::default();
        nvic.disable(&mut bus, InterruptLine::SYSTICK)
            .expect("systick can be disabled");
        assert_eq!(bus.reads, vec![Register::SystCsr]);
        assert_eq!(bus.writes, vec![(Register::SystCsr, 0)]);
    }

    #[test]
    fn svcall_priority_lands_in_shpr2_top_byte() {
        let nvic = InterruptController::new(&CORTEX_M0PLUS);
        let mut bus = Recorder::default();
        nvic.set_priority(&mut bus, InterruptLine::SV_CALL, Priority::LOWEST)
            .expect("svcall priority is programmable");
        assert_eq!(bus.writes, vec![(Register::Shpr2, 0xC000_0000)]);
    }

    #[test]
    fn rejected_calls_touch_no_register() {
        let nvic = InterruptController::new(&CORTEX_M0PLUS);
        let mut bus = Recorder::default();
        assert!(nvic.enable(&mut bus, InterruptLine::HARD_FAULT).is_err());
        assert!(nvic.clear_pending(&mut bus, InterruptLine::NON_MASKABLE_INT).is_err());
        assert!(nvic.read_pending(&mut bus, InterruptLine::SV_CALL).is_err());
        assert_eq!(
            nvic.set_priority_raw(&mut bus, InterruptLine::peripheral(0), 4),
            Err(InterruptError::PriorityOutOfRange { value: 4 })
        );
        assert!(bus.writes.is_empty());
        assert!(bus.reads.is_empty());
    }
}
