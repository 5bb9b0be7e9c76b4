//! Process-wide yield hook.
//!
//! Blocking primitives in this crate give up the CPU by calling
//! [`yield_now`]. What that means depends on where the shell runs: on the
//! target it is a scheduler yield, under the host test rig it is a thread
//! yield. The platform registers the appropriate function once at startup;
//! until then `yield_now` degrades to a PAUSE-style spin hint.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicPtr, Ordering};

/// Signature of a yield hook.
pub type YieldHook = fn();

static YIELD_HOOK: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

/// Register the platform yield function. Typically called once during
/// startup, before any task blocks.
pub fn register_yield_hook(hook: YieldHook) {
    YIELD_HOOK.store(hook as *mut (), Ordering::Release);
}

/// Give up the CPU to let another task make progress.
#[inline]
pub fn yield_now() {
    let ptr = YIELD_HOOK.load(Ordering::Acquire);
    if ptr.is_null() {
        spin_loop();
    } else {
        // SAFETY: only `register_yield_hook` stores into YIELD_HOOK, and it
        // stores a valid `YieldHook` fn pointer.
        let hook: YieldHook = unsafe { core::mem::transmute(ptr) };
        hook();
    }
}
