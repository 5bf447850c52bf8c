//! Interrupt lines, capability gating and register dispatch.

/// Validated interrupt controller operations.
pub mod controller;
/// Line identities, priorities and capability sets.
pub mod line;
/// System control block routing for core exceptions.
pub mod overrides;
/// Per-chip capability tables.
pub mod table;

pub use controller::InterruptController;
pub use line::{Capabilities, InterruptLine, Operation, Priority};
pub use overrides::{CoreOverride, CORE_EXCEPTION_OVERRIDES};
pub use table::{
    Backing, InterruptTable, LineDescriptor, NvicSlot, CORE_EXCEPTION_FLOOR, CORTEX_M0PLUS,
    NVIC_LINE_LIMIT,
};
