//! Line identities, priorities, operations and capability sets.

use core::fmt;

use bitflags::bitflags;

use crate::InterruptError;

/// Signed interrupt index: negative values are core exceptions, the rest are
/// peripheral lines routed through the NVIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterruptLine(i16);

impl InterruptLine {
    /// Non-maskable interrupt.
    pub const NON_MASKABLE_INT: Self = Self(-14);
    /// HardFault exception.
    pub const HARD_FAULT: Self = Self(-13);
    /// Supervisor call.
    pub const SV_CALL: Self = Self(-5);
    /// Pendable service call.
    pub const PEND_SV: Self = Self(-2);
    /// System tick timer.
    pub const SYSTICK: Self = Self(-1);

    /// Wraps a raw signed index without validating it.
    #[must_use]
    pub const fn new(index: i16) -> Self {
        Self(index)
    }

    /// Peripheral interrupt line `n` (NVIC input `n`).
    #[must_use]
    pub const fn peripheral(n: u8) -> Self {
        Self(n as i16)
    }

    /// Raw signed index.
    #[must_use]
    pub const fn index(self) -> i16 {
        self.0
    }

    /// Returns `true` for core exceptions (negative indices).
    #[must_use]
    pub const fn is_core_exception(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for InterruptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NON_MASKABLE_INT => f.write_str("NonMaskableInt(-14)"),
            Self::HARD_FAULT => f.write_str("HardFault(-13)"),
            Self::SV_CALL => f.write_str("SVCall(-5)"),
            Self::PEND_SV => f.write_str("PendSV(-2)"),
            Self::SYSTICK => f.write_str("SysTick(-1)"),
            Self(index) => write!(f, "IRQ{index}"),
        }
    }
}

/// Two-bit interrupt priority, `0` is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Priority(u8);

impl Priority {
    /// Most urgent priority level.
    pub const HIGHEST: Self = Self(0);
    /// Least urgent priority level.
    pub const LOWEST: Self = Self(Self::MAX);
    /// Largest raw value accepted by the 2-bit field.
    pub const MAX: u8 = 3;

    /// Validates a raw priority.
    ///
    /// # Errors
    ///
    /// Returns [`InterruptError::PriorityOutOfRange`] when `value > 3`.
    pub const fn new(value: u8) -> Result<Self, InterruptError> {
        if value > Self::MAX {
            Err(InterruptError::PriorityOutOfRange { value })
        } else {
            Ok(Self(value))
        }
    }

    /// Raw priority level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Byte-lane encoding: only the top two bits of the lane are implemented.
    #[must_use]
    pub const fn encoded(self) -> u8 {
        self.0 << 6
    }

    /// Decodes a priority byte lane, ignoring unimplemented low bits.
    #[must_use]
    pub const fn from_encoded(lane: u8) -> Self {
        Self(lane >> 6)
    }
}

impl TryFrom<u8> for Priority {
    type Error = InterruptError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

/// Operations exposed by the interrupt controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Enable delivery of the line.
    Enable,
    /// Disable delivery of the line.
    Disable,
    /// Force the line pending.
    SetPending,
    /// Clear a pending request.
    ClearPending,
    /// Read the pending state.
    ReadPending,
    /// Program the line priority.
    SetPriority,
    /// Read whether the line is enabled.
    ReadEnabled,
    /// Read back the programmed priority.
    ReadPriority,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Enable,
        Self::Disable,
        Self::SetPending,
        Self::ClearPending,
        Self::ReadPending,
        Self::SetPriority,
        Self::ReadEnabled,
        Self::ReadPriority,
    ];

    /// Capabilities of which at least one must be present for this operation.
    #[must_use]
    pub const fn requires(self) -> Capabilities {
        match self {
            Self::Enable | Self::ReadEnabled => Capabilities::ENABLE,
            Self::Disable => Capabilities::DISABLE,
            Self::SetPending => Capabilities::SET_PENDING,
            Self::ClearPending => Capabilities::CLEAR_PENDING,
            Self::ReadPending => Capabilities::SET_PENDING.union(Capabilities::CLEAR_PENDING),
            Self::SetPriority | Self::ReadPriority => Capabilities::SET_PRIORITY,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::SetPending => "set-pending",
            Self::ClearPending => "clear-pending",
            Self::ReadPending => "read-pending",
            Self::SetPriority => "set-priority",
            Self::ReadEnabled => "read-enabled",
            Self::ReadPriority => "read-priority",
        })
    }
}

bitflags! {
    /// Operations a line supports, derived from the chip's exclusion lists.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Line can be enabled.
        const ENABLE = 1 << 0;
        /// Line can be disabled.
        const DISABLE = 1 << 1;
        /// Line can be forced pending.
        const SET_PENDING = 1 << 2;
        /// Line pending state can be cleared.
        const CLEAR_PENDING = 1 << 3;
        /// Line priority is programmable.
        const SET_PRIORITY = 1 << 4;
    }
}

impl Capabilities {
    /// Returns `true` when `operation` is allowed by this capability set.
    #[must_use]
    pub const fn allows(self, operation: Operation) -> bool {
        self.intersects(operation.requires())
    }
}
