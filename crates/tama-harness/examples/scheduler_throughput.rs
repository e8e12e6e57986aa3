//! Scheduler throughput harness.
//!
//! Measures how many emulated steps per second the catch-up scheduler and
//! HAL bridge can dispatch when the core itself does no work.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p tama-harness --release --example scheduler_throughput
//! ```
//!
//! ## Metrics
//!
//! - Steps per second
//! - Real-time factor (emulated seconds replayed per wall second)
//!
//! A core running at 1 MHz with an average instruction of ~7 clocks needs
//! roughly 140K steps per emulated second, so any real-time factor above 1
//! leaves headroom for the instruction semantics.

#![allow(clippy::pedantic)]

use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use tama_harness::{
    Button, ButtonState, CatchUpScheduler, CoreError, CpuCore, Hal, HalBridge, MachineState,
    ManualClock, NoVibrator, Timestamp, LCD_WIDTH,
};
use thiserror as _;

use std::time::{Duration, Instant};

const TICK_US: u32 = 1_000;
const STEP_QUANTUM_US: u32 = 7;

#[derive(Default)]
struct IdleCore {
    state: MachineState,
    emulated_us: Timestamp,
    column: u8,
}

impl CpuCore for IdleCore {
    fn init(
        &mut self,
        _rom: &[u16],
        _state: Option<&MachineState>,
        _clock_rate_hz: u32,
    ) -> Result<(), CoreError> {
        Ok(())
    }

    fn step(&mut self, hal: &mut dyn Hal) {
        self.column = (self.column + 1) % LCD_WIDTH as u8;
        hal.set_lcd_matrix(self.column, 0, self.column % 2 == 0);
        self.emulated_us = self.emulated_us.wrapping_add(STEP_QUANTUM_US);
        hal.sleep_until(self.emulated_us);
    }

    fn state(&self) -> &MachineState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    fn set_button(&mut self, _button: Button, _state: ButtonState) {}

    fn release(&mut self) {}
}

#[derive(Debug, Clone, Copy)]
struct BenchmarkResult {
    name: &'static str,
    steps_per_second: f64,
    realtime_factor: f64,
    capped_ticks: u64,
}

fn run_scenario(
    name: &'static str,
    duration: Duration,
    wall_advance_us: u32,
    max_steps_per_tick: u32,
) -> BenchmarkResult {
    let clock = ManualClock::starting_at(0);
    let mut bridge = HalBridge::new(clock.clone(), NoVibrator);
    let mut core = IdleCore::default();
    let mut scheduler = CatchUpScheduler::new(max_steps_per_tick);

    let mut emulated_us = 0_u64;
    let mut capped_ticks = 0_u64;
    let start = Instant::now();

    while start.elapsed() < duration {
        clock.advance(wall_advance_us);
        emulated_us += u64::from(wall_advance_us);
        if scheduler.tick(&mut core, &mut bridge).is_capped() {
            capped_ticks += 1;
        }
    }

    let elapsed_secs = start.elapsed().as_secs_f64();
    BenchmarkResult {
        name,
        steps_per_second: scheduler.total_steps() as f64 / elapsed_secs,
        realtime_factor: (emulated_us as f64 / 1_000_000.0) / elapsed_secs,
        capped_ticks,
    }
}

fn format_number(n: f64) -> String {
    if n >= 1_000_000.0 {
        format!("{:.2}M", n / 1_000_000.0)
    } else if n >= 1_000.0 {
        format!("{:.2}K", n / 1_000.0)
    } else {
        format!("{:.2}", n)
    }
}

fn print_results(results: &[BenchmarkResult]) {
    println!();
    println!("tama-harness scheduler throughput");
    println!("  tick period: {TICK_US} us, step quantum: {STEP_QUANTUM_US} us");
    println!();
    println!(
        "{:16} {:>14} {:>12} {:>10}",
        "Scenario", "Steps/sec", "Realtime x", "Capped"
    );
    for result in results {
        println!(
            "{:16} {:>14} {:>12.1} {:>10}",
            result.name,
            format_number(result.steps_per_second),
            result.realtime_factor,
            result.capped_ticks
        );
    }
}

fn main() {
    let duration = Duration::from_secs(2);
    let results = [
        run_scenario("steady_1ms", duration, TICK_US, u32::MAX),
        run_scenario("suspended_1s", duration, 1_000_000, 50_000),
        run_scenario("tight_ceiling", duration, TICK_US, 64),
    ];
    print_results(&results);
}
