#![no_std]

//! Terminal layer: console byte-stream mux, inline color markup, command
//! history and the line editor.

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod console;
pub mod editor;
pub mod history;
pub mod markup;

#[cfg(test)]
mod console_tests;
#[cfg(test)]
mod editor_tests;
#[cfg(test)]
mod history_tests;
#[cfg(test)]
mod markup_tests;

pub use console::{ColorMode, Console, EchoMode};
pub use editor::{Editor, HelpHook};
pub use history::{HIST_SIZE, History};
