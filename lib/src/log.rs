//! Diagnostic logging.
//!
//! All diagnostic output funnels through a single **backend** function
//! pointer. Until the terminal console registers itself the output is
//! silently dropped: there is nowhere to print to before the console device
//! is up, and the shell never logs anything a user must not lose.
//!
//! Log lines are diagnostics (driver failures, pool exhaustion, invariant
//! reports) — command output itself goes straight to the console and is
//! never routed through here.

use core::fmt;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

#[inline]
fn is_enabled(level: LogLevel) -> bool {
    level as u8 <= CURRENT_LEVEL.load(Ordering::Relaxed)
}

/// Signature of a log backend. The backend appends the trailing newline.
pub type LogBackend = fn(fmt::Arguments<'_>);

static BACKEND: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

/// Register the backend. Called once by the console during startup.
pub fn register_log_backend(backend: LogBackend) {
    BACKEND.store(backend as *mut (), Ordering::Release);
}

pub fn set_log_level(level: LogLevel) {
    CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Emit one formatted log line at the given level.
pub fn log_args(level: LogLevel, args: fmt::Arguments<'_>) {
    if !is_enabled(level) {
        return;
    }
    let ptr = BACKEND.load(Ordering::Acquire);
    if ptr.is_null() {
        return;
    }
    // SAFETY: only `register_log_backend` stores into BACKEND, and it stores
    // a valid `LogBackend` fn pointer.
    let backend: LogBackend = unsafe { core::mem::transmute(ptr) };
    backend(args);
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::log::log_args($crate::log::LogLevel::Error, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::log::log_args($crate::log::LogLevel::Warn, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::log::log_args($crate::log::LogLevel::Info, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::log::log_args($crate::log::LogLevel::Debug, ::core::format_args!($($arg)*))
    };
}
