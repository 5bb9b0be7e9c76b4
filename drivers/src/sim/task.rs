//! Simulated task service: one OS thread per task, a per-task notification
//! slot, and a condvar to block on.
//!
//! Deviations from a real RTOS, by necessity:
//! - `delete` cannot destroy a thread; it marks the task killed and wakes
//!   it, so the next `wait_notify` reports `SIGNAL_TERM` and well-behaved
//!   handlers unwind on their own.
//! - `suspend` takes effect at the task's next blocking point.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{HalError, HalResult};
use crate::task::{DELAY_INFINITE, SIGNAL_TERM, TaskEntry, TaskId, TaskService};

struct TaskState {
    pending: Option<u32>,
    suspended: bool,
    killed: bool,
}

struct TaskCtrl {
    state: Mutex<TaskState>,
    cv: Condvar,
}

impl TaskCtrl {
    fn new() -> Self {
        Self {
            state: Mutex::new(TaskState {
                pending: None,
                suspended: false,
                killed: false,
            }),
            cv: Condvar::new(),
        }
    }
}

pub struct SimTaskService {
    tasks: Arc<Mutex<HashMap<u32, Arc<TaskCtrl>>>>,
    names: Mutex<HashMap<u32, String>>,
    next_id: AtomicU32,
}

std::thread_local! {
    static CURRENT: Cell<u32> = const { Cell::new(0) };
}

impl SimTaskService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            names: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        })
    }

    fn register_thread(&self, name: &str) -> u32 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tasks
            .lock()
            .unwrap()
            .insert(id, Arc::new(TaskCtrl::new()));
        self.names.lock().unwrap().insert(id, String::from(name));
        id
    }

    fn current_id(&self) -> u32 {
        CURRENT.with(|c| {
            if c.get() == 0 {
                c.set(self.register_thread("host"));
            }
            c.get()
        })
    }

    fn ctrl(&self, id: u32) -> Option<Arc<TaskCtrl>> {
        self.tasks.lock().unwrap().get(&id).cloned()
    }

    pub fn task_name(&self, id: TaskId) -> Option<String> {
        self.names.lock().unwrap().get(&id.0).cloned()
    }
}

impl TaskService for SimTaskService {
    fn spawn(
        &self,
        name: &str,
        _core: u8,
        _priority: Option<u8>,
        entry: TaskEntry,
    ) -> HalResult<TaskId> {
        let id = self.register_thread(name);
        let tasks = Arc::clone(&self.tasks);
        let boxed: Box<dyn FnOnce() + Send> = entry;
        thread::Builder::new()
            .name(String::from(name))
            .spawn(move || {
                CURRENT.with(|c| c.set(id));
                boxed();
                tasks.lock().unwrap().remove(&id);
            })
            .map_err(|_| HalError::NoResources)?;
        Ok(TaskId(id))
    }

    fn delete(&self, id: TaskId) -> HalResult<()> {
        let ctrl = self.ctrl(id.0).ok_or(HalError::InvalidArg)?;
        let mut st = ctrl.state.lock().unwrap();
        st.killed = true;
        st.suspended = false;
        ctrl.cv.notify_all();
        Ok(())
    }

    fn suspend(&self, id: TaskId) -> HalResult<()> {
        let ctrl = self.ctrl(id.0).ok_or(HalError::InvalidArg)?;
        ctrl.state.lock().unwrap().suspended = true;
        Ok(())
    }

    fn resume(&self, id: TaskId) -> HalResult<()> {
        let ctrl = self.ctrl(id.0).ok_or(HalError::InvalidArg)?;
        let mut st = ctrl.state.lock().unwrap();
        st.suspended = false;
        ctrl.cv.notify_all();
        Ok(())
    }

    fn set_priority(&self, _id: TaskId, _priority: u8) -> HalResult<()> {
        Ok(())
    }

    fn current(&self) -> TaskId {
        TaskId(self.current_id())
    }

    fn exists(&self, id: TaskId) -> bool {
        self.tasks.lock().unwrap().contains_key(&id.0)
    }

    fn notify(&self, id: TaskId, value: u32) -> HalResult<()> {
        let ctrl = self.ctrl(id.0).ok_or(HalError::InvalidArg)?;
        let mut st = ctrl.state.lock().unwrap();
        st.pending = Some(value);
        ctrl.cv.notify_all();
        Ok(())
    }

    fn notify_from_isr(&self, id: TaskId, value: u32) {
        let _ = self.notify(id, value);
    }

    fn wait_notify(&self, timeout_ms: u32) -> Option<u32> {
        let id = self.current_id();
        let ctrl = self.ctrl(id)?;
        let deadline = if timeout_ms == DELAY_INFINITE {
            None
        } else {
            Some(Instant::now() + Duration::from_millis(timeout_ms as u64))
        };
        let mut st = ctrl.state.lock().unwrap();
        loop {
            if st.killed {
                return Some(SIGNAL_TERM);
            }
            if !st.suspended {
                if let Some(v) = st.pending.take() {
                    return Some(v);
                }
            }
            match deadline {
                None => {
                    st = ctrl.cv.wait(st).unwrap();
                }
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        return None;
                    }
                    let (guard, _) = ctrl.cv.wait_timeout(st, d - now).unwrap();
                    st = guard;
                }
            }
        }
    }

    fn sleep_ms(&self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}
