//! Monotonic time since boot.
//!
//! The platform registers a microsecond time source once at startup (the
//! hardware timer on the target, a host monotonic clock under the test rig).
//! If nothing is registered yet, a bump counter stands in so that callers
//! measuring intervals never see time stand completely still.

use core::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

/// Signature of a time source: microseconds since an arbitrary epoch.
pub type TimeSource = fn() -> u64;

static TIME_SOURCE: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());
static FALLBACK_TICK: AtomicU64 = AtomicU64::new(0);

/// Register the platform time source. Called once during startup.
pub fn register_time_source(source: TimeSource) {
    TIME_SOURCE.store(source as *mut (), Ordering::Release);
}

/// Microseconds since boot.
#[inline]
pub fn micros() -> u64 {
    let ptr = TIME_SOURCE.load(Ordering::Acquire);
    if ptr.is_null() {
        FALLBACK_TICK.fetch_add(1, Ordering::Relaxed)
    } else {
        // SAFETY: only `register_time_source` stores into TIME_SOURCE, and it
        // stores a valid `TimeSource` fn pointer.
        let source: TimeSource = unsafe { core::mem::transmute(ptr) };
        source()
    }
}

/// Milliseconds since boot.
#[inline]
pub fn millis() -> u64 {
    micros() / 1000
}
