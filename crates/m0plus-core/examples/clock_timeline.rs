//! Walks the SysTick clock through several counter wraps on the simulated
//! core, then renders a fault record.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p m0plus-core --example clock_timeline
//! ```

use core::time::Duration;

use bitflags as _;
use log as _;
use m0plus_core::fault::DebugFaultStatus;
use m0plus_core::{
    ClockConfig, FaultAnalyzer, FaultRecord, FaultSink, InterruptController, IsrDelivery,
    SimulatedCore, SysTickClock, CORTEX_M0PLUS, HARD_FAULT_VECTOR,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

struct Stdout;

impl FaultSink for Stdout {
    fn record(&mut self, record: &FaultRecord) {
        println!("{record}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClockConfig {
        clock_hz: 1_000_000,
        reload: 999,
        ..ClockConfig::default()
    };
    let clock = SysTickClock::new(config, &CORTEX_M0PLUS)?;
    let nvic = InterruptController::new(&CORTEX_M0PLUS);
    let mut core = SimulatedCore::new()
        .with_clock(&clock)
        .with_access_pattern(&[3, 7, 2])
        .with_isr_delivery(IsrDelivery::Deferred);
    clock.init_all(&mut core, &nvic)?;

    for step in 0..5 {
        clock.delay(&mut core, Duration::from_micros(730));
        let now = clock.now(&mut core);
        println!(
            "step {step}: now={} ticks ({:?}) overruns={} simulated={}",
            now.ticks(),
            clock.ticks_to_duration(now.ticks()),
            clock.overruns(),
            core.elapsed_ticks()
        );
    }

    core.set_debug_status(DebugFaultStatus::from_raw(0b0_0010));
    core.set_active_vector(HARD_FAULT_VECTOR);
    let context = FaultAnalyzer::capture_context(
        0x2000_3FE0,
        &[0, 1, 2, 3, 12, 0x0800_0101, 0x0800_0200, 0x0100_0003],
        0xFFFF_FFF9,
    );
    FaultAnalyzer::report(&mut core, &mut Stdout, context);
    Ok(())
}
