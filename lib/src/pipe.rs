//! Message pipes: fixed-capacity channels carrying small `Copy` payloads
//! from an ISR (or another task) to a long-lived receiver task.
//!
//! The typical payload is a pointer: the GPIO ISR matches an event condition
//! and sends the entry's address to the daemon task, which does the real
//! work at task priority.
//!
//! `send_from_isr` never blocks. If the ring is full — or the ring lock is
//! momentarily held by the receiver — the message is counted in the pipe's
//! drop counter and lost. Receivers that care can read `drops()`.

use alloc::collections::VecDeque;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use spin::Mutex;

use crate::sched::yield_now;

/// `send_from_isr` lock-retry bound (hosted builds only, see there).
const PIPE_SEND_RETRIES: u32 = 256;

pub struct MessagePipe<T: Copy> {
    ring: Mutex<VecDeque<T>>,
    capacity: usize,
    drops: AtomicU32,
    /// Set while a receiver is blocked in `recv`; lets senders report that a
    /// reschedule would unblock someone.
    waiting: AtomicBool,
}

impl<T: Copy> MessagePipe<T> {
    /// Create a pipe holding at most `capacity` pending messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            drops: AtomicU32::new(0),
            waiting: AtomicBool::new(false),
        }
    }

    /// Send from ISR context. Returns `true` if a blocked receiver should
    /// be rescheduled.
    ///
    /// On the target this cannot contend: task-side pipe users run with the
    /// relevant interrupt masked, so the ISR always finds the lock free.
    /// Under a hosted build the "ISR" is an ordinary thread, so a short
    /// bounded retry covers the receiver's few-instruction critical
    /// section. A genuinely full pipe drops the message either way.
    pub fn send_from_isr(&self, value: T) -> bool {
        for attempt in 0..PIPE_SEND_RETRIES {
            if let Some(mut ring) = self.ring.try_lock() {
                if ring.len() < self.capacity {
                    ring.push_back(value);
                    return self.waiting.load(Ordering::Acquire);
                }
                break;
            }
            if attempt % 64 == 63 {
                yield_now();
            } else {
                core::hint::spin_loop();
            }
        }
        self.drops.fetch_add(1, Ordering::Relaxed);
        false
    }

    /// Send from task context. Retries once after a yield before giving up.
    ///
    /// Returns `true` if the message was queued.
    pub fn send(&self, value: T) -> bool {
        for _ in 0..2 {
            {
                let mut ring = self.ring.lock();
                if ring.len() < self.capacity {
                    ring.push_back(value);
                    return true;
                }
            }
            yield_now();
        }
        self.drops.fetch_add(1, Ordering::Relaxed);
        false
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<T> {
        self.ring.lock().pop_front()
    }

    /// Blocking receive. Not usable from ISR context.
    pub fn recv(&self) -> T {
        loop {
            if let Some(value) = self.try_recv() {
                self.waiting.store(false, Ordering::Release);
                return value;
            }
            self.waiting.store(true, Ordering::Release);
            yield_now();
        }
    }

    /// Messages lost to overflow since creation (or last [`clear_drops`]).
    ///
    /// [`clear_drops`]: MessagePipe::clear_drops
    pub fn drops(&self) -> u32 {
        self.drops.load(Ordering::Relaxed)
    }

    pub fn clear_drops(&self) {
        self.drops.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
