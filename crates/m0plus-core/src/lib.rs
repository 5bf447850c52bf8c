//! Interrupt control, monotonic SysTick timekeeping and HardFault diagnosis
//! for ARMv6-M (Cortex-M0+) cores.
//!
//! All hardware access goes through [`regs::RegisterBus`]. Firmware supplies
//! a memory-mapped implementation; host tests use `sim::SimulatedCore`
//! from the default `sim` feature, which firmware builds turn off with
//! `default-features = false`.

#![cfg_attr(not(test), no_std)]

/// Named registers, bit fields and the bus contract.
pub mod regs;
pub use regs::{Field, Register, RegisterBus};

/// Interrupt lines, capability tables and the interrupt controller.
pub mod interrupt;
pub use interrupt::{
    Capabilities, InterruptController, InterruptLine, InterruptTable, Operation, Priority,
    CORTEX_M0PLUS,
};

/// SysTick-backed monotonic clock.
pub mod clock;
pub use clock::{ClockConfig, ClockSource, InitStage, Instant, SysTickClock};

/// HardFault capture, classification and reporting.
pub mod fault;
pub use fault::{
    FaultAnalyzer, FaultCause, FaultClassification, FaultContext, FaultRecord, FaultSink, LogSink,
};

/// System reset request and active exception query.
pub mod system;
pub use system::{active_vector, request_system_reset, HARD_FAULT_VECTOR};

/// Host-side simulation of the core peripherals.
#[cfg(any(test, feature = "sim"))]
pub mod sim;
#[cfg(any(test, feature = "sim"))]
pub use sim::{IsrDelivery, SimulatedCore};

mod error;
pub use error::{ConfigError, InterruptError};

#[cfg(test)]
use proptest as _;
