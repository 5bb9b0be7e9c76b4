#![no_std]

//! An interactive Cisco-style shell embedded into firmware.
//!
//! The shell runs as one dedicated task next to the host application,
//! reads commands from a serial console, and pokes at the hardware through
//! the collaborator traits in `espshell-drivers`: drive and probe GPIOs,
//! generate PWM, count pulses, compile and transmit RMT pulse trains, record
//! command aliases and fire them on GPIO edges or timers, and read or write
//! registered application variables while the application keeps running.
//!
//! Entry point: build a [`Shell`] from a [`ShellServices`] bundle, then call
//! [`Shell::start`].

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod alias;
pub mod config;
pub mod convar;
pub mod count;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod event;
pub mod exec;
pub mod help;
pub mod input;
pub mod keywords;
pub mod misc;
pub mod pin;
pub mod pwm;
pub mod repl;
pub mod sequence;
pub mod shell;
pub mod show;
pub mod taskctl;
pub mod uart;

#[cfg(test)]
mod convar_tests;
#[cfg(test)]
mod dispatch_tests;
#[cfg(test)]
mod input_tests;
#[cfg(test)]
mod sequence_tests;
#[cfg(test)]
pub mod testutil;

pub use env::Env;
pub use error::{CmdError, CmdResult};
pub use input::InputRecord;
pub use shell::{Shell, ShellServices};
