//! Invariant-violation support.
//!
//! A `must_not_happen!` condition is a programming error: the macro reports
//! the failing file and line, runs the registered fatal hook, and panics,
//! taking the offending task down. The hook exists for one job — the shell
//! coordinator uses it to resume the host application task, so a sketch
//! paused by `suspend` is not left frozen by a dying shell.

use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// Signature of the fatal hook. `ctx` is the value given at registration.
pub type FatalHook = fn(ctx: usize);

static FATAL_HOOK: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());
static FATAL_CTX: AtomicUsize = AtomicUsize::new(0);

/// Register the fatal hook. Called by the coordinator at startup; a later
/// registration replaces the earlier one.
pub fn register_fatal_hook(hook: FatalHook, ctx: usize) {
    // Context first: a reader that sees the new hook must see its context.
    FATAL_CTX.store(ctx, Ordering::Release);
    FATAL_HOOK.store(hook as *mut (), Ordering::Release);
}

/// Run the hook, if any. Called by `must_not_happen!` on its way down.
pub fn run_fatal_hook() {
    let ptr = FATAL_HOOK.load(Ordering::Acquire);
    if ptr.is_null() {
        return;
    }
    // SAFETY: only `register_fatal_hook` stores into FATAL_HOOK, and it
    // stores a valid `FatalHook` fn pointer.
    let hook: FatalHook = unsafe { core::mem::transmute(ptr) };
    hook(FATAL_CTX.load(Ordering::Acquire));
}
