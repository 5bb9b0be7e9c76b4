//! Simulated timer service backed by worker threads.
//!
//! Each `start_*` call spawns a worker tagged with the timer's current
//! generation; `stop`/`delete`/restart bump the generation so stale workers
//! exit at their next tick. A callback already in flight when the timer is
//! stopped may still complete — the same caveat the real timer service has,
//! which the event engine tolerates via its `alive` flags.

use alloc::sync::Arc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::error::{HalError, HalResult};
use crate::timer::{TimerCallback, TimerDispatch, TimerId, TimerService};

struct TimerRec {
    cb: TimerCallback,
    generation: AtomicU32,
    active: AtomicBool,
}

pub struct SimTimerService {
    timers: Mutex<HashMap<TimerId, Arc<TimerRec>>>,
    next_id: AtomicU32,
}

impl SimTimerService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            timers: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        })
    }

    fn rec(&self, id: TimerId) -> Option<Arc<TimerRec>> {
        self.timers.lock().unwrap().get(&id).cloned()
    }
}

impl TimerService for SimTimerService {
    fn create(
        &self,
        _name: &str,
        _dispatch: TimerDispatch,
        cb: TimerCallback,
    ) -> HalResult<TimerId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.timers.lock().unwrap().insert(
            id,
            Arc::new(TimerRec {
                cb,
                generation: AtomicU32::new(0),
                active: AtomicBool::new(false),
            }),
        );
        Ok(id)
    }

    fn start_once(&self, id: TimerId, delay_us: u64) -> HalResult<()> {
        let rec = self.rec(id).ok_or(HalError::InvalidArg)?;
        let generation = rec.generation.fetch_add(1, Ordering::AcqRel) + 1;
        rec.active.store(true, Ordering::Release);
        thread::spawn(move || {
            thread::sleep(Duration::from_micros(delay_us));
            if rec.active.load(Ordering::Acquire)
                && rec.generation.load(Ordering::Acquire) == generation
            {
                (rec.cb)();
            }
        });
        Ok(())
    }

    fn start_periodic(&self, id: TimerId, period_us: u64) -> HalResult<()> {
        let rec = self.rec(id).ok_or(HalError::InvalidArg)?;
        let generation = rec.generation.fetch_add(1, Ordering::AcqRel) + 1;
        rec.active.store(true, Ordering::Release);
        thread::spawn(move || {
            loop {
                thread::sleep(Duration::from_micros(period_us));
                if !rec.active.load(Ordering::Acquire)
                    || rec.generation.load(Ordering::Acquire) != generation
                {
                    break;
                }
                (rec.cb)();
            }
        });
        Ok(())
    }

    fn stop(&self, id: TimerId) -> HalResult<()> {
        let rec = self.rec(id).ok_or(HalError::InvalidArg)?;
        rec.active.store(false, Ordering::Release);
        rec.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn delete(&self, id: TimerId) -> HalResult<()> {
        if let Some(rec) = self.timers.lock().unwrap().remove(&id) {
            rec.active.store(false, Ordering::Release);
            rec.generation.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }
}
