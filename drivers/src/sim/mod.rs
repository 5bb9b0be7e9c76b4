//! Host-side in-memory driver set.
//!
//! Implements every collaborator trait against plain process state so the
//! whole shell can be driven end-to-end on the host: tasks are threads,
//! timers are worker threads, GPIO edges are injected by tests and dispatch
//! the installed ISR synchronously on the injecting thread (the "ISR
//! context" of the host rig).

mod console;
mod gpio;
mod periph;
mod storage;
mod task;
mod timer;
mod uart;

pub use console::ScriptedConsole;
pub use gpio::SimGpio;
pub use periph::{RmtTransmission, SimPcnt, SimPwm, SimRmt, TxMode};
pub use storage::MemStorage;
pub use task::SimTaskService;
pub use timer::SimTimerService;
pub use uart::SimUart;

use std::sync::OnceLock;
use std::time::Instant;

static START: OnceLock<Instant> = OnceLock::new();

fn host_micros() -> u64 {
    START.get_or_init(Instant::now).elapsed().as_micros() as u64
}

/// Register the host clock and yield hooks. Call once before starting the
/// shell; calling again is harmless.
pub fn install_host_hooks() {
    let _ = START.get_or_init(Instant::now);
    espshell_lib::register_time_source(host_micros);
    espshell_lib::register_yield_hook(std::thread::yield_now);
}
