//! Write-preferring readers/writer lock.
//!
//! Classic "many readers, one writer" scheme. Queued write requests prevent
//! new readers from acquiring the lock; queued writers block on a binary
//! semaphore while readers drain; queued readers yield while a writer is
//! active.
//!
//! These locks protect lists: the alias line lists, and the event-condition
//! table which is additionally traversed from ISR context (the ISR takes no
//! lock at all — writers mask the affected GPIO interrupt instead, see the
//! event engine).

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use crate::sched::yield_now;

/// Binary semaphore: the blocking object underneath [`RwLock`].
///
/// `acquire` spins through the platform yield hook, which makes it usable
/// from any task context but never from an ISR.
pub struct Semaphore {
    taken: AtomicBool,
}

impl Semaphore {
    pub const fn new() -> Self {
        Self {
            taken: AtomicBool::new(false),
        }
    }

    pub fn acquire(&self) {
        while self
            .taken
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            yield_now();
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.taken
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    pub fn release(&self) {
        self.taken.store(false, Ordering::Release);
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

/// Write-preferring readers/writer lock.
///
/// State encoding in `cnt`: `< 0` — write-locked, `0` — idle, `> 0` — number
/// of active readers. `pending` counts queued writers; while it is non-zero
/// new readers stand back.
pub struct RwLock<T: ?Sized> {
    /// `< 0`: write lock, `0`: unlocked, `> 0`: reader count.
    cnt: AtomicI32,
    /// Number of queued write requests.
    pending: AtomicU32,
    sem: Semaphore,
    data: UnsafeCell<T>,
}

// SAFETY: the lock protocol guarantees exclusive access for writers and
// shared access for readers.
unsafe impl<T: ?Sized + Send> Send for RwLock<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for RwLock<T> {}

pub struct RwLockReadGuard<'a, T: ?Sized> {
    lock: &'a RwLock<T>,
}

pub struct RwLockWriteGuard<'a, T: ?Sized> {
    lock: &'a RwLock<T>,
}

impl<T> RwLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            cnt: AtomicI32::new(0),
            pending: AtomicU32::new(0),
            sem: Semaphore::new(),
            data: UnsafeCell::new(data),
        }
    }
}

impl<T: ?Sized> RwLock<T> {
    /// Obtain exclusive ("writer") access.
    ///
    /// The pending counter is raised *before* taking the semaphore so new
    /// readers stop entering; if a reader still sneaked in between those two
    /// steps the semaphore is released and the whole procedure retried.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        loop {
            self.sem.acquire();
            if self.cnt.load(Ordering::Acquire) != 0 {
                self.sem.release();
                yield_now();
                continue;
            }
            break;
        }
        self.cnt.store(-1, Ordering::Release);
        self.pending.fetch_sub(1, Ordering::AcqRel);
        RwLockWriteGuard { lock: self }
    }

    /// Obtain shared ("reader") access. The dominant lock type.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        loop {
            // Let queued writers go first.
            while self.cnt.load(Ordering::Acquire) < 0 || self.pending.load(Ordering::Acquire) > 0
            {
                yield_now();
            }

            let prev = self.cnt.fetch_add(1, Ordering::AcqRel);
            if prev < 0 {
                // A writer slipped in between the check and the increment.
                self.cnt.fetch_sub(1, Ordering::AcqRel);
                yield_now();
                continue;
            }
            // The first reader grabs the semaphore so a subsequent writer
            // blocks immediately.
            if prev == 0 {
                self.sem.acquire();
            }
            return RwLockReadGuard { lock: self };
        }
    }

    /// Number of active readers, or -1 when write-locked. Diagnostics only.
    pub fn reader_count(&self) -> i32 {
        self.cnt.load(Ordering::Relaxed)
    }
}

impl<T: ?Sized> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: read guard guarantees no concurrent writer.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        // The last reader releases the semaphore.
        if self.lock.cnt.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.lock.sem.release();
        }
    }
}

impl<T: ?Sized> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: write guard guarantees exclusive access.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: write guard guarantees exclusive access.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.cnt.store(0, Ordering::Release);
        self.lock.sem.release();
    }
}
