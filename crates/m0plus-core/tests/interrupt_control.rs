//! Interrupt controller behaviour against the simulated core.

#![allow(clippy::pedantic, clippy::nursery)]

use bitflags as _;
use log as _;
use m0plus_core::interrupt::CORE_EXCEPTION_OVERRIDES;
use m0plus_core::regs::fields;
use m0plus_core::{
    InterruptController, InterruptError, InterruptLine, InterruptTable, Operation, Priority,
    SimulatedCore, CORTEX_M0PLUS,
};
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn controller() -> InterruptController<'static> {
    InterruptController::new(&CORTEX_M0PLUS)
}

fn attempt(
    nvic: &InterruptController<'_>,
    core: &mut SimulatedCore<'_>,
    line: InterruptLine,
    operation: Operation,
) -> Result<(), InterruptError> {
    match operation {
        Operation::Enable => nvic.enable(core, line),
        Operation::Disable => nvic.disable(core, line),
        Operation::SetPending => nvic.set_pending(core, line),
        Operation::ClearPending => nvic.clear_pending(core, line),
        Operation::ReadPending => nvic.read_pending(core, line).map(drop),
        Operation::SetPriority => nvic.set_priority(core, line, Priority::LOWEST),
        Operation::ReadEnabled => nvic.is_enabled(core, line).map(drop),
        Operation::ReadPriority => nvic.priority(core, line).map(drop),
    }
}

#[test]
fn every_line_and_operation_follows_the_table() {
    let nvic = controller();
    for index in -16..40 {
        let line = InterruptLine::new(index);
        for operation in Operation::ALL {
            let mut core = SimulatedCore::new();
            let before = core.registers();
            let result = attempt(&nvic, &mut core, line, operation);
            if CORTEX_M0PLUS.permits(line, operation) {
                assert_eq!(result, Ok(()), "{operation} {line}");
            } else {
                assert!(result.is_err(), "{operation} {line} should be rejected");
                assert_eq!(core.registers(), before);
                assert_eq!(core.reads(), 0);
                assert_eq!(core.writes(), 0);
            }
        }
    }
}

#[rstest]
#[case(-15, InterruptError::OutOfRange { line: InterruptLine::new(-15) })]
#[case(32, InterruptError::OutOfRange { line: InterruptLine::new(32) })]
#[case(-12, InterruptError::Reserved { line: InterruptLine::new(-12) })]
#[case(-3, InterruptError::Reserved { line: InterruptLine::new(-3) })]
#[case(-13, InterruptError::Unsupported { line: InterruptLine::HARD_FAULT, operation: Operation::Enable })]
#[case(-2, InterruptError::Unsupported { line: InterruptLine::PEND_SV, operation: Operation::Enable })]
fn enable_rejections_name_the_reason(#[case] index: i16, #[case] expected: InterruptError) {
    let mut core = SimulatedCore::new();
    assert_eq!(
        controller().enable(&mut core, InterruptLine::new(index)),
        Err(expected)
    );
}

static WIDE: InterruptTable = InterruptTable {
    end: 40,
    ..CORTEX_M0PLUS
};

#[test]
fn wide_table_never_addresses_lines_past_the_nvic() {
    let nvic = InterruptController::new(&WIDE);
    let mut core = SimulatedCore::new();
    for index in 32..40 {
        let line = InterruptLine::peripheral(index);
        assert_eq!(
            nvic.enable(&mut core, line),
            Err(InterruptError::OutOfRange { line })
        );
    }
    assert_eq!(core.writes(), 0);
    assert_eq!(core.reads(), 0);
    assert_eq!(core.registers().enabled, 0);
}

#[test]
fn peripheral_enable_pending_round_trip() {
    let nvic = controller();
    let mut core = SimulatedCore::new();
    let line = InterruptLine::peripheral(9);

    nvic.enable(&mut core, line).unwrap();
    assert!(nvic.is_enabled(&mut core, line).unwrap());
    assert_eq!(core.registers().enabled, 1 << 9);

    nvic.set_pending(&mut core, line).unwrap();
    assert!(nvic.read_pending(&mut core, line).unwrap());
    nvic.clear_pending(&mut core, line).unwrap();
    assert!(!nvic.read_pending(&mut core, line).unwrap());

    nvic.disable(&mut core, line).unwrap();
    assert_eq!(core.registers().enabled, 0);
}

#[test]
fn systick_controls_land_in_csr_icsr_and_shpr3() {
    let nvic = controller();
    let mut core = SimulatedCore::new();
    let line = InterruptLine::SYSTICK;

    nvic.enable(&mut core, line).unwrap();
    assert_ne!(core.registers().csr & fields::CSR_TICKINT.mask(), 0);
    assert!(nvic.is_enabled(&mut core, line).unwrap());

    nvic.set_pending(&mut core, line).unwrap();
    assert!(nvic.read_pending(&mut core, line).unwrap());
    nvic.clear_pending(&mut core, line).unwrap();
    assert!(!nvic.read_pending(&mut core, line).unwrap());

    nvic.set_priority(&mut core, line, Priority::new(2).unwrap())
        .unwrap();
    assert_eq!(core.registers().shpr3, 0x8000_0000);
    assert_eq!(nvic.priority(&mut core, line).unwrap().value(), 2);

    nvic.disable(&mut core, line).unwrap();
    assert!(!nvic.is_enabled(&mut core, line).unwrap());
}

#[test]
fn pendsv_and_nmi_pend_through_icsr() {
    let nvic = controller();
    let mut core = SimulatedCore::new();

    nvic.set_pending(&mut core, InterruptLine::PEND_SV).unwrap();
    assert_ne!(core.registers().icsr & (1 << 28), 0);
    nvic.clear_pending(&mut core, InterruptLine::PEND_SV).unwrap();
    assert_eq!(core.registers().icsr & (1 << 28), 0);

    nvic.set_pending(&mut core, InterruptLine::NON_MASKABLE_INT)
        .unwrap();
    assert!(nvic
        .read_pending(&mut core, InterruptLine::NON_MASKABLE_INT)
        .unwrap());
    assert_eq!(
        nvic.clear_pending(&mut core, InterruptLine::NON_MASKABLE_INT),
        Err(InterruptError::Unsupported {
            line: InterruptLine::NON_MASKABLE_INT,
            operation: Operation::ClearPending,
        })
    );
}

#[test]
fn pendsv_and_svcall_priorities_share_no_lane() {
    let nvic = controller();
    let mut core = SimulatedCore::new();
    nvic.set_priority(&mut core, InterruptLine::PEND_SV, Priority::LOWEST)
        .unwrap();
    nvic.set_priority(&mut core, InterruptLine::SV_CALL, Priority::new(1).unwrap())
        .unwrap();
    nvic.set_priority(&mut core, InterruptLine::SYSTICK, Priority::HIGHEST)
        .unwrap();
    assert_eq!(core.registers().shpr3, 0x00C0_0000);
    assert_eq!(core.registers().shpr2, 0x4000_0000);
}

#[test]
fn every_override_line_is_programmable_in_the_table() {
    for entry in &CORE_EXCEPTION_OVERRIDES {
        let caps = CORTEX_M0PLUS.capabilities(entry.line).unwrap();
        assert!(!caps.is_empty(), "{} has no controls", entry.line);
    }
}

proptest! {
    #[test]
    fn priority_write_reads_back_and_spares_neighbours(
        index in 0u8..32,
        value in 0u8..=3,
        noise in any::<[u8; 32]>(),
    ) {
        let nvic = controller();
        let mut core = SimulatedCore::new();
        for (other, raw) in noise.iter().enumerate() {
            let other = InterruptLine::peripheral(other as u8);
            nvic.set_priority(&mut core, other, Priority::new(raw % 4).unwrap()).unwrap();
        }
        let before = core.registers().ipr;

        let line = InterruptLine::peripheral(index);
        nvic.set_priority(&mut core, line, Priority::new(value).unwrap()).unwrap();

        prop_assert_eq!(nvic.priority(&mut core, line).unwrap().value(), value);
        let after = core.registers().ipr;
        let lane = 0xFFu32 << ((index % 4) * 8);
        for register in 0..8 {
            let keep = if register == usize::from(index / 4) { !lane } else { u32::MAX };
            prop_assert_eq!(after[register] & keep, before[register] & keep);
        }
    }

    #[test]
    fn raw_priorities_above_three_never_reach_the_bus(index in 0u8..32, raw in 4u8..=u8::MAX) {
        let mut core = SimulatedCore::new();
        let result = controller().set_priority_raw(&mut core, InterruptLine::peripheral(index), raw);
        prop_assert_eq!(result, Err(InterruptError::PriorityOutOfRange { value: raw }));
        prop_assert_eq!(core.writes(), 0);
        prop_assert_eq!(core.reads(), 0);
    }
}
