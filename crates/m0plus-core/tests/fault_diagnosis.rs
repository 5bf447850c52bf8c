//! HardFault capture, classification and reporting on the simulated core.

#![allow(clippy::pedantic, clippy::nursery)]

use std::convert::Infallible;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use bitflags as _;
use log::{Level, LevelFilter, Log, Metadata, Record};
use m0plus_core::fault::{
    DebugFaultStatus, FaultKind, CAPTURES_FAULT_ADDRESS, EXCEPTION_FRAME_WORDS, FAULT_LOG_TARGET,
};
use m0plus_core::{
    active_vector, request_system_reset, FaultAnalyzer, FaultCause, FaultRecord, FaultSink,
    LogSink, SimulatedCore, HARD_FAULT_VECTOR,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const FRAME: [u32; EXCEPTION_FRAME_WORDS] = [
    0xA0A0_A0A0,
    0xA1A1_A1A1,
    0xA2A2_A2A2,
    0xA3A3_A3A3,
    0xACAC_ACAC,
    0x0800_1235,
    0x0800_2468,
    0x2100_0003,
];
const STACK_POINTER: u32 = 0x2000_3FE0;
const EXC_RETURN: u32 = 0xFFFF_FFF9;

struct Capture(Mutex<Vec<(Level, String, String)>>);

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.0.lock().unwrap().push((
            record.level(),
            record.target().to_owned(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

static LOGGER: Capture = Capture(Mutex::new(Vec::new()));

#[derive(Default)]
struct Collect(Vec<FaultRecord>);

impl FaultSink for Collect {
    fn record(&mut self, record: &FaultRecord) {
        self.0.push(*record);
    }
}

fn faulted(raw_status: u32) -> SimulatedCore<'static> {
    let mut core = SimulatedCore::new();
    core.set_debug_status(DebugFaultStatus::from_raw(raw_status));
    core.set_active_vector(HARD_FAULT_VECTOR);
    core
}

fn expected_cause(raw: u32) -> FaultCause {
    if raw & 0b1_0000 != 0 {
        FaultCause::ExternalDebug
    } else if raw & 0b0_1000 != 0 {
        FaultCause::VectorCatch
    } else if raw & 0b0_0100 != 0 {
        FaultCause::DwtTrap
    } else if raw & 0b0_0010 != 0 {
        FaultCause::Breakpoint
    } else if raw & 0b0_0001 != 0 {
        FaultCause::HaltRequest
    } else {
        FaultCause::EscalatedFault
    }
}

#[test]
fn every_status_combination_resolves_by_priority() {
    for raw in 0..32 {
        let mut core = faulted(raw);
        let info = FaultAnalyzer::classify(&mut core);
        assert_eq!(info.kind, FaultKind::Hard);
        assert_eq!(info.cause, expected_cause(raw), "status {raw:#07b}");
        let status = if raw == 0 {
            u32::from(HARD_FAULT_VECTOR)
        } else {
            raw
        };
        assert_eq!(info.status_bits, status);
        assert_eq!(info.fault_address.is_some(), CAPTURES_FAULT_ADDRESS);
    }
}

#[rstest]
#[case(3)]
#[case(11)]
#[case(47)]
fn escalated_fault_reports_the_active_vector(#[case] vector: u8) {
    let mut core = SimulatedCore::new();
    core.set_active_vector(vector);
    assert_eq!(active_vector(&mut core), vector);
    let info = FaultAnalyzer::classify(&mut core);
    assert_eq!(info.cause, FaultCause::EscalatedFault);
    assert_eq!(info.status_bits, u32::from(vector));
}

#[test]
fn captured_context_keeps_every_stacked_register() {
    let context = FaultAnalyzer::capture_context(STACK_POINTER, &FRAME, EXC_RETURN);
    assert_eq!(
        [
            context.r0(),
            context.r1(),
            context.r2(),
            context.r3(),
            context.r12(),
            context.lr(),
            context.pc(),
            context.xpsr(),
        ],
        FRAME
    );
    assert_eq!(context.exc_return(), EXC_RETURN);
    assert_eq!(context.stack_pointer(), STACK_POINTER);
    assert!(!context.used_process_stack());
}

#[test]
fn handle_reports_once_then_terminates() {
    let mut core = faulted(0b0_0110);
    let mut sink = Collect::default();
    let mut handed_over = None;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        FaultAnalyzer::handle(
            &mut core,
            &mut sink,
            STACK_POINTER,
            &FRAME,
            EXC_RETURN,
            |record: &FaultRecord| -> Infallible {
                handed_over = Some(*record);
                panic!("terminated")
            },
        )
    }));

    assert!(outcome.is_err());
    let record = handed_over.expect("terminate policy ran");
    assert_eq!(sink.0, vec![record]);
    assert_eq!(record.classification.cause, FaultCause::DwtTrap);
    assert_eq!(record.classification.status_bits, 0b0_0110);
    assert_eq!(record.context.pc(), 0x0800_2468);
}

#[test]
fn log_sink_emits_one_error_line() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Trace);

    let mut core = faulted(0b0_0001);
    let context = FaultAnalyzer::capture_context(STACK_POINTER, &FRAME, EXC_RETURN);
    let record = FaultAnalyzer::report(&mut core, &mut LogSink, context);
    assert_eq!(record.classification.cause, FaultCause::HaltRequest);

    let lines = LOGGER.0.lock().unwrap();
    let faults: Vec<_> = lines
        .iter()
        .filter(|(_, target, _)| target == FAULT_LOG_TARGET)
        .collect();
    assert_eq!(faults.len(), 1);
    let (level, _, text) = faults[0];
    assert_eq!(*level, Level::Error);
    assert!(text.starts_with("COREFAULT type(HardFault) info(HaltRequest: halt request)"));
    assert!(text.contains("flags(0x00000001)"));
    assert!(text.contains("address(none)"));
    assert!(text.contains("PC=0x08002468"));
    assert!(text.contains("LR=0x08001235"));
}

#[test]
fn reset_request_reaches_aircr() {
    let mut core = SimulatedCore::new();
    request_system_reset(&mut core);
    assert_eq!(core.reset_requests(), 1);
}
