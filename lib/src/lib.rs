#![no_std]

//! Shared runtime support for the shell: blocking primitives, the platform
//! clock/yield hooks, a tiny logging facility and string/number helpers.
//!
//! Nothing in this crate talks to hardware. Anything that needs the outside
//! world (time, rescheduling, log output) goes through a registered function
//! pointer so the same code runs on the target and under the host test rig.

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod clock;
pub mod fault;
pub mod log;
pub mod numparse;
pub mod pipe;
pub mod rwlock;
pub mod sched;
pub mod string;

#[cfg(test)]
mod fault_tests;
#[cfg(test)]
mod numparse_tests;
#[cfg(test)]
mod pipe_tests;
#[cfg(test)]
mod rwlock_tests;
#[cfg(test)]
mod string_tests;

pub use clock::{micros, millis, register_time_source};
pub use fault::{register_fatal_hook, run_fatal_hook};
pub use log::{LogLevel, log_args, register_log_backend, set_log_level};
pub use pipe::MessagePipe;
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard, Semaphore};
pub use sched::{register_yield_hook, yield_now};
pub use string::{ordinal_suffix, plural_suffix, prefix_match};

/// Marks states that are reachable only through a programming error.
///
/// Logs the file and line through the active log backend, runs the fatal
/// hook (which resumes a suspended host task, see [`fault`]), then panics.
/// The shell runs handlers on tasks whose panic unwinds terminate only the
/// offending task.
#[macro_export]
macro_rules! must_not_happen {
    ($cond:expr) => {
        if $cond {
            $crate::log_error!("invariant violated at {}:{}", file!(), line!());
            $crate::fault::run_fatal_hook();
            panic!("must-not-happen condition at {}:{}", file!(), line!());
        }
    };
}
