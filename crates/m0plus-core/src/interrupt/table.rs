//! Per-chip capability table: which lines exist and what each one supports.

use crate::interrupt::overrides::{CoreOverride, CORE_EXCEPTION_OVERRIDES};
use crate::interrupt::{Capabilities, InterruptLine, Operation};
use crate::regs::{Field, Register};
use crate::InterruptError;

/// Number of interrupt inputs covered by the single ARMv6-M `ISER` word.
pub const NVIC_LINE_LIMIT: i16 = 32;
/// Lowest core exception index (`-16` is the initial stack pointer slot).
pub const CORE_EXCEPTION_FLOOR: i16 = -15;

/// Immutable description of a chip's interrupt index space.
///
/// Lines outside `[begin, end)` or listed in `reserved` are never valid.
/// The `no_*` lists remove individual operations from otherwise valid lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptTable {
    /// Inclusive lowest valid index.
    pub begin: i16,
    /// Exclusive highest valid index.
    pub end: i16,
    /// Indices inside the range that do not exist on this chip.
    pub reserved: &'static [InterruptLine],
    /// Lines that cannot be enabled.
    pub no_enable: &'static [InterruptLine],
    /// Lines that cannot be disabled.
    pub no_disable: &'static [InterruptLine],
    /// Lines that cannot be forced pending.
    pub no_set_pending: &'static [InterruptLine],
    /// Lines whose pending state cannot be cleared.
    pub no_clear_pending: &'static [InterruptLine],
    /// Lines with a fixed priority.
    pub no_set_priority: &'static [InterruptLine],
    /// System control block routing for core exceptions.
    pub overrides: &'static [CoreOverride],
}

/// Cortex-M0+ with 32 NVIC inputs.
pub const CORTEX_M0PLUS: InterruptTable = InterruptTable {
    begin: -14,
    end: NVIC_LINE_LIMIT,
    reserved: &[
        InterruptLine::new(-12),
        InterruptLine::new(-11),
        InterruptLine::new(-10),
        InterruptLine::new(-9),
        InterruptLine::new(-8),
        InterruptLine::new(-7),
        InterruptLine::new(-6),
        InterruptLine::new(-4),
        InterruptLine::new(-3),
    ],
    no_enable: &[
        InterruptLine::NON_MASKABLE_INT,
        InterruptLine::HARD_FAULT,
        InterruptLine::SV_CALL,
        InterruptLine::PEND_SV,
    ],
    no_disable: &[
        InterruptLine::NON_MASKABLE_INT,
        InterruptLine::HARD_FAULT,
        InterruptLine::SV_CALL,
        InterruptLine::PEND_SV,
    ],
    no_set_pending: &[InterruptLine::HARD_FAULT, InterruptLine::SV_CALL],
    no_clear_pending: &[
        InterruptLine::NON_MASKABLE_INT,
        InterruptLine::HARD_FAULT,
        InterruptLine::SV_CALL,
    ],
    no_set_priority: &[InterruptLine::NON_MASKABLE_INT, InterruptLine::HARD_FAULT],
    overrides: &CORE_EXCEPTION_OVERRIDES,
};

const _: () = assert!(CORTEX_M0PLUS.is_consistent(), "cortex-m0+ table is inconsistent");
const _: () = assert!(CORTEX_M0PLUS.permits(InterruptLine::SYSTICK, Operation::Enable));
const _: () = assert!(CORTEX_M0PLUS.permits(InterruptLine::SYSTICK, Operation::Disable));
const _: () = assert!(CORTEX_M0PLUS.permits(InterruptLine::SYSTICK, Operation::SetPriority));
const _: () = assert!(CORTEX_M0PLUS.permits(InterruptLine::SYSTICK, Operation::ClearPending));
const _: () = assert!(!CORTEX_M0PLUS.permits(InterruptLine::HARD_FAULT, Operation::SetPending));

/// Where a line's controls live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    /// Peripheral line in the NVIC register block.
    Nvic(NvicSlot),
    /// Core exception controlled through the system control block.
    SystemControl(CoreOverride),
    /// Core exception with no programmable controls.
    Fixed,
}

/// Bit and priority lane of a peripheral line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NvicSlot {
    /// Bit position in `ISER`/`ICER`/`ISPR`/`ICPR`.
    pub bit: u8,
    /// Priority byte lane: register `IPR[index / 4]`, lane `index % 4`.
    pub priority: Field,
}

impl NvicSlot {
    const fn for_index(index: u8) -> Self {
        Self {
            bit: index,
            priority: Field::new(Register::Ipr(index / 4), (index % 4) * 8, 8),
        }
    }
}

/// Validated view of one line: its capabilities and backing registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDescriptor {
    /// Described line.
    pub line: InterruptLine,
    /// Operations the line supports.
    pub capabilities: Capabilities,
    /// Register block selector.
    pub backing: Backing,
}

const fn listed(list: &[InterruptLine], line: InterruptLine) -> bool {
    let mut i = 0;
    while i < list.len() {
        if list[i].index() == line.index() {
            return true;
        }
        i += 1;
    }
    false
}

impl InterruptTable {
    /// Checks range and reserved-slot membership.
    ///
    /// Indices the hardware cannot address are out of range even when the
    /// table's `[begin, end)` claims them.
    ///
    /// # Errors
    ///
    /// Returns [`InterruptError::OutOfRange`] or [`InterruptError::Reserved`].
    pub const fn validate_index(&self, line: InterruptLine) -> Result<(), InterruptError> {
        let index = line.index();
        if index < self.begin
            || index >= self.end
            || index < CORE_EXCEPTION_FLOOR
            || index >= NVIC_LINE_LIMIT
        {
            return Err(InterruptError::OutOfRange { line });
        }
        if listed(self.reserved, line) {
            return Err(InterruptError::Reserved { line });
        }
        Ok(())
    }

    /// Derives the capability set of a valid line from the exclusion lists.
    ///
    /// # Errors
    ///
    /// Returns the index rejection from [`Self::validate_index`].
    pub const fn capabilities(&self, line: InterruptLine) -> Result<Capabilities, InterruptError> {
        if let Err(err) = self.validate_index(line) {
            return Err(err);
        }
        let mut caps = Capabilities::empty();
        if !listed(self.no_enable, line) {
            caps = caps.union(Capabilities::ENABLE);
        }
        if !listed(self.no_disable, line) {
            caps = caps.union(Capabilities::DISABLE);
        }
        if !listed(self.no_set_pending, line) {
            caps = caps.union(Capabilities::SET_PENDING);
        }
        if !listed(self.no_clear_pending, line) {
            caps = caps.union(Capabilities::CLEAR_PENDING);
        }
        if !listed(self.no_set_priority, line) {
            caps = caps.union(Capabilities::SET_PRIORITY);
        }
        Ok(caps)
    }

    /// Compile-time friendly check that `operation` is legal on `line`.
    ///
    /// Intended for statically known lines:
    /// `const _: () = assert!(TABLE.permits(LINE, Operation::Enable));`
    #[must_use]
    pub const fn permits(&self, line: InterruptLine, operation: Operation) -> bool {
        match self.capabilities(line) {
            Ok(caps) => caps.allows(operation),
            Err(_) => false,
        }
    }

    /// Runtime rejection path: validates `line` for `operation` and resolves its backing.
    ///
    /// # Errors
    ///
    /// Returns [`InterruptError::OutOfRange`], [`InterruptError::Reserved`] or
    /// [`InterruptError::Unsupported`].
    pub fn check(
        &self,
        line: InterruptLine,
        operation: Operation,
    ) -> Result<LineDescriptor, InterruptError> {
        let descriptor = self.describe(line)?;
        if descriptor.capabilities.allows(operation) {
            Ok(descriptor)
        } else {
            Err(InterruptError::Unsupported { line, operation })
        }
    }

    /// Resolves capabilities and backing registers of a valid line.
    ///
    /// # Errors
    ///
    /// Returns the index rejection from [`Self::validate_index`].
    pub fn describe(&self, line: InterruptLine) -> Result<LineDescriptor, InterruptError> {
        let capabilities = self.capabilities(line)?;
        let backing = match u8::try_from(line.index()) {
            Ok(index) => Backing::Nvic(NvicSlot::for_index(index)),
            Err(_) => self
                .overrides
                .iter()
                .find(|entry| entry.line == line)
                .map_or(Backing::Fixed, |entry| Backing::SystemControl(*entry)),
        };
        Ok(LineDescriptor {
            line,
            capabilities,
            backing,
        })
    }

    /// Every valid line in ascending index order.
    pub fn lines(&self) -> impl Iterator<Item = InterruptLine> + '_ {
        (self.begin..self.end)
            .map(InterruptLine::new)
            .filter(|line| self.validate_index(*line).is_ok())
    }

    /// Structural checks: range fits the hardware, and every core exception
    /// with a capability has a matching override entry.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        if self.begin < CORE_EXCEPTION_FLOOR || self.end > NVIC_LINE_LIMIT || self.begin >= self.end
        {
            return false;
        }
        let mut index = self.begin;
        while index < 0 {
            let line = InterruptLine::new(index);
            if let Ok(caps) = self.capabilities(line) {
                if !caps.is_empty() {
                    match find_override(self.overrides, line) {
                        Some(entry) => {
                            if !entry.covers(caps) {
                                return false;
                            }
                        }
                        None => return false,
                    }
                }
            }
            index += 1;
        }
        true
    }
}

const fn find_override(overrides: &[CoreOverride], line: InterruptLine) -> Option<&CoreOverride> {
    let mut i = 0;
    while i < overrides.len() {
        if overrides[i].line.index() == line.index() {
            return Some(&overrides[i]);
        }
        i += 1;
    }
    None
}
