//! Rejection types for interrupt-control misuse and clock configuration.

use thiserror::Error;

use crate::interrupt::{InterruptLine, Operation};

/// Misuse of the interrupt-control API, detected before any register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum InterruptError {
    /// Index lies outside the table's valid `[begin, end)` range.
    #[error("interrupt line {line} is outside the valid index range")]
    OutOfRange {
        /// Rejected line.
        line: InterruptLine,
    },
    /// Index is inside the range but reserved on this chip.
    #[error("interrupt line {line} is reserved")]
    Reserved {
        /// Rejected line.
        line: InterruptLine,
    },
    /// Line exists but does not support the requested operation.
    #[error("interrupt line {line} does not support {operation}")]
    Unsupported {
        /// Rejected line.
        line: InterruptLine,
        /// Operation that the capability table excludes for this line.
        operation: Operation,
    },
    /// Priority value does not fit the 2-bit hardware field.
    #[error("priority {value} is outside 0..=3")]
    PriorityOutOfRange {
        /// Rejected raw priority.
        value: u8,
    },
}

/// Invalid SysTick clock configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// Clock frequency is zero.
    #[error("clock frequency must be non-zero")]
    ZeroClock,
    /// Clock frequency is too high for nanosecond conversions in 64 bits.
    #[error("clock frequency {clock_hz} Hz is too high")]
    ClockTooFast {
        /// Rejected frequency.
        clock_hz: u64,
    },
    /// Reload value is zero or wider than the 24-bit counter.
    #[error("reload value {reload:#x} is outside 1..=0xFFFFFF")]
    ReloadOutOfRange {
        /// Rejected reload value.
        reload: u32,
    },
    /// The requested overrun-tolerant window needs more than 32 bits of overruns.
    #[error("overrun window needs {required} overruns, more than the 32-bit counter holds")]
    OverrunWindowTooLong {
        /// Overruns needed to cover the window.
        required: u64,
    },
    /// The interrupt table does not allow an operation the SysTick init sequence needs.
    #[error("interrupt table rejects systick setup: {0}")]
    SysTickLine(#[from] InterruptError),
}
