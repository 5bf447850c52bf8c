//! System control block primitives that do not belong to a single line.

use log::debug;

use crate::regs::{fields, read_field, Register, RegisterBus, AIRCR_VECTKEY};

/// Exception number of the HardFault handler as reported by `ICSR.VECTACTIVE`.
pub const HARD_FAULT_VECTOR: u8 = 3;

/// Requests a system reset through `AIRCR.SYSRESETREQ`.
///
/// Whether and when to reset is the caller's policy; this only issues the
/// request. The write carries the mandatory `VECTKEY`.
pub fn request_system_reset<B: RegisterBus + ?Sized>(bus: &mut B) {
    debug!("requesting system reset");
    bus.write(
        Register::Aircr,
        fields::AIRCR_VECTKEY.place(AIRCR_VECTKEY) | fields::AIRCR_SYSRESETREQ.place(1),
    );
}

/// Number of the exception currently being handled, `0` in thread mode.
pub fn active_vector<B: RegisterBus + ?Sized>(bus: &mut B) -> u8 {
    // VECTACTIVE is six bits wide.
    read_field(bus, fields::ICSR_VECTACTIVE).to_le_bytes()[0]
}
