use std::sync::Arc;
use std::thread;
use std::vec::Vec;

use crate::rwlock::{RwLock, Semaphore};
use crate::sched::register_yield_hook;

fn yield_thread() {
    std::thread::yield_now();
}

#[test]
fn semaphore_basics() {
    let sem = Semaphore::new();
    assert!(sem.try_acquire());
    assert!(!sem.try_acquire());
    sem.release();
    assert!(sem.try_acquire());
}

#[test]
fn writer_excludes_readers() {
    register_yield_hook(yield_thread);
    let lock = Arc::new(RwLock::new(0u32));

    let mut writers = Vec::new();
    for _ in 0..4 {
        let lock = Arc::clone(&lock);
        writers.push(thread::spawn(move || {
            for _ in 0..1000 {
                let mut g = lock.write();
                let v = *g;
                // A torn increment would show up as a lost update.
                *g = v + 1;
            }
        }));
    }

    let mut readers = Vec::new();
    for _ in 0..4 {
        let lock = Arc::clone(&lock);
        readers.push(thread::spawn(move || {
            for _ in 0..1000 {
                let g = lock.read();
                assert!(*g <= 4000);
            }
        }));
    }

    for t in writers {
        t.join().unwrap();
    }
    for t in readers {
        t.join().unwrap();
    }
    assert_eq!(*lock.read(), 4000);
}

#[test]
fn readers_share() {
    register_yield_hook(yield_thread);
    let lock = Arc::new(RwLock::new(7u32));
    let a = lock.read();
    let b = lock.read();
    assert_eq!(*a, 7);
    assert_eq!(*b, 7);
    assert_eq!(lock.reader_count(), 2);
    drop(a);
    drop(b);
    // A writer can take over once the last reader is gone.
    let mut g = lock.write();
    *g = 8;
    drop(g);
    assert_eq!(*lock.read(), 8);
}
