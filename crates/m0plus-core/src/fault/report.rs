//! Terminal fault reporting.

use core::convert::Infallible;
use core::fmt;

use log::error;

use crate::fault::{classify, FaultClassification, FaultContext, EXCEPTION_FRAME_WORDS};
use crate::regs::RegisterBus;

/// Log target used by [`LogSink`].
pub const FAULT_LOG_TARGET: &str = "corefault";

/// One structured fault diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaultRecord {
    /// Classification of the fault.
    pub classification: FaultClassification,
    /// Registers stacked at fault entry.
    pub context: FaultContext,
}

impl fmt::Display for FaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.classification;
        let r = &self.context;
        write!(
            f,
            "COREFAULT type({}) info({}: {}) flags({:#010x}) ",
            c.kind,
            c.cause,
            c.cause.description(),
            c.status_bits
        )?;
        match c.fault_address {
            Some(address) => write!(f, "address({address:#010x}) ")?,
            None => f.write_str("address(none) ")?,
        }
        write!(
            f,
            "registers: PC={:#010x} R0={:#010x} R1={:#010x} R2={:#010x} R3={:#010x} \
             R12={:#010x} LR={:#010x} xPSR={:#010x} EXC_RETURN={:#010x} SP={:#010x}",
            r.pc(),
            r.r0(),
            r.r1(),
            r.r2(),
            r.r3(),
            r.r12(),
            r.lr(),
            r.xpsr(),
            r.exc_return(),
            r.stack_pointer()
        )
    }
}

/// Consumer of fault records; transport and storage are up to the implementor.
pub trait FaultSink {
    /// Receives the record of a fault that will not be resumed.
    fn record(&mut self, record: &FaultRecord);
}

/// Forwards fault records to the `log` facade at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl FaultSink for LogSink {
    fn record(&mut self, record: &FaultRecord) {
        error!(target: FAULT_LOG_TARGET, "{record}");
    }
}

/// Entry points for the HardFault path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultAnalyzer;

impl FaultAnalyzer {
    /// Copies the stacked frame; see [`FaultContext::capture`].
    #[must_use]
    pub const fn capture_context(
        stack_pointer: u32,
        frame: &[u32; EXCEPTION_FRAME_WORDS],
        exc_return: u32,
    ) -> FaultContext {
        FaultContext::capture(stack_pointer, frame, exc_return)
    }

    /// Classifies the current fault from the status registers.
    pub fn classify<B: RegisterBus + ?Sized>(bus: &mut B) -> FaultClassification {
        classify(bus)
    }

    /// Classifies the current fault and emits one record for `context`.
    pub fn report<B, S>(bus: &mut B, sink: &mut S, context: FaultContext) -> FaultRecord
    where
        B: RegisterBus + ?Sized,
        S: FaultSink + ?Sized,
    {
        let classification = Self::classify(bus);
        Self::emit(sink, context, classification)
    }

    /// Emits one record to `sink` and hands it back.
    pub fn emit<S: FaultSink + ?Sized>(
        sink: &mut S,
        context: FaultContext,
        classification: FaultClassification,
    ) -> FaultRecord {
        let record = FaultRecord {
            classification,
            context,
        };
        sink.record(&record);
        record
    }

    /// Full fault path: capture, classify, log, then hand over to `terminate`.
    ///
    /// Called from the exception-entry trampoline with the stacked frame.
    /// Reset or halt policy belongs to `terminate`, which cannot return:
    /// [`Infallible`] has no values.
    pub fn handle<B, S, T>(
        bus: &mut B,
        sink: &mut S,
        stack_pointer: u32,
        frame: &[u32; EXCEPTION_FRAME_WORDS],
        exc_return: u32,
        terminate: T,
    ) -> !
    where
        B: RegisterBus + ?Sized,
        S: FaultSink + ?Sized,
        T: FnOnce(&FaultRecord) -> Infallible,
    {
        let context = Self::capture_context(stack_pointer, frame, exc_return);
        let record = Self::report(bus, sink, context);
        match terminate(&record) {}
    }
}
