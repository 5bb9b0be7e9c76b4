#![no_std]

//! Peripheral and OS collaborator interfaces.
//!
//! The shell core never calls a vendor HAL directly: every peripheral and
//! kernel facility it needs (GPIO, PWM, RMT, pulse counter, timers, tasks,
//! the console byte stream, persistent storage) is reached through one of the
//! traits in this crate. A port provides implementations for its platform;
//! the `sim` feature provides in-memory implementations for the host test
//! rig.

extern crate alloc;

#[cfg(any(test, feature = "sim"))]
extern crate std;

pub mod console;
pub mod error;
pub mod gpio;
pub mod pcnt;
pub mod pwm;
pub mod rmt;
pub mod storage;
pub mod task;
pub mod timer;
pub mod uart;

#[cfg(feature = "sim")]
pub mod sim;

pub use console::ConsoleDevice;
pub use error::{HalError, HalResult};
pub use gpio::{BusKind, EdgeIsr, GpioDriver, PinFlags};
pub use pcnt::PcntDriver;
pub use pwm::{PWM_MAX_FREQUENCY, PwmDriver};
pub use rmt::{RmtDriver, RmtSymbol};
pub use storage::Storage;
pub use task::{
    DELAY_INFINITE, MAX_TASK_PRIORITY, SIGNAL_GPIO, SIGNAL_HUP, SIGNAL_KILL, SIGNAL_TERM, TaskId,
    TaskService,
};
pub use timer::{TimerDispatch, TimerId, TimerService};
pub use uart::{UART_DEF_BAUDRATE, UartDriver};
