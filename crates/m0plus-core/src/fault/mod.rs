//! HardFault capture, classification and reporting.

/// Fault classification from debug status and active vector.
pub mod classify;
/// Stacked register context at fault entry.
pub mod context;
/// Structured fault records and sinks.
pub mod report;

pub use classify::{
    classify, classify_status, DebugFaultStatus, FaultCause, FaultClassification, FaultKind,
    CAPTURES_FAULT_ADDRESS,
};
pub use context::{FaultContext, EXCEPTION_FRAME_WORDS, EXC_RETURN_PROCESS_STACK};
pub use report::{FaultAnalyzer, FaultRecord, FaultSink, LogSink, FAULT_LOG_TARGET};
