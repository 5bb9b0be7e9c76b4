use core::sync::atomic::{AtomicUsize, Ordering};

use crate::fault::register_fatal_hook;

static HOOK_CTX_SUM: AtomicUsize = AtomicUsize::new(0);

fn counting_hook(ctx: usize) {
    HOOK_CTX_SUM.fetch_add(ctx, Ordering::Relaxed);
}

// One test for everything touching the process-wide hook slot.
#[test]
fn must_not_happen_runs_hook_before_panicking() {
    register_fatal_hook(counting_hook, 5);

    let result = std::panic::catch_unwind(|| {
        crate::must_not_happen!(true);
    });
    assert!(result.is_err(), "the macro must panic");
    assert_eq!(HOOK_CTX_SUM.load(Ordering::Relaxed), 5);

    // A false condition touches nothing.
    crate::must_not_happen!(false);
    assert_eq!(HOOK_CTX_SUM.load(Ordering::Relaxed), 5);
}
