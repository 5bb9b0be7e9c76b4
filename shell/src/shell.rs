//! The shell coordinator: owns the console, the collaborator handles and
//! every subsystem store, and starts the shell task.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use espshell_drivers::{
    ConsoleDevice, GpioDriver, PcntDriver, PwmDriver, RmtDriver, Storage, TaskId, TaskService,
    TimerService, UartDriver,
};
use espshell_term::Console;
use spin::Mutex;

use crate::alias::AliasStore;
use crate::config;
use crate::convar::ConvarRegistry;
use crate::count::CounterLog;
use crate::event::EventEngine;
use crate::pin::SavedPins;
use crate::sequence::SequenceStore;
use crate::{keywords, repl};

/// Everything the shell needs from the platform, bundled for construction.
pub struct ShellServices {
    /// Console devices selectable with `tty N`. The first one whose index
    /// equals [`config::STARTUP_PORT`] (or simply the first one) starts
    /// active.
    pub console_devices: Vec<(u8, Arc<dyn ConsoleDevice>)>,
    pub gpio: Arc<dyn GpioDriver>,
    pub pwm: Arc<dyn PwmDriver>,
    pub rmt: Arc<dyn RmtDriver>,
    pub pcnt: Arc<dyn PcntDriver>,
    pub uart: Arc<dyn UartDriver>,
    pub timers: Arc<dyn TimerService>,
    pub tasks: Arc<dyn TaskService>,
    pub storage: Arc<dyn Storage>,
}

pub struct Shell {
    pub con: Arc<Console>,
    pub gpio: Arc<dyn GpioDriver>,
    pub pwm: Arc<dyn PwmDriver>,
    pub rmt: Arc<dyn RmtDriver>,
    pub pcnt: Arc<dyn PcntDriver>,
    pub uart: Arc<dyn UartDriver>,
    pub timers: Arc<dyn TimerService>,
    pub tasks: Arc<dyn TaskService>,
    pub storage: Arc<dyn Storage>,

    pub aliases: AliasStore,
    pub events: Arc<EventEngine>,
    pub sequences: SequenceStore,
    pub convars: ConvarRegistry,
    pub pins: SavedPins,
    pub counters: CounterLog,

    /// The main shell task, once started.
    pub shell_task: Mutex<Option<TaskId>>,
    /// The host application's task, target of bare `suspend`/`resume`.
    pub sketch_task: Mutex<Option<TaskId>>,
    pub exit_requested: AtomicBool,
    start_ms: u64,
}

impl Shell {
    pub fn new(services: ShellServices) -> Arc<Self> {
        let mut devices = services.console_devices;
        assert!(!devices.is_empty(), "at least one console device required");
        let initial = devices
            .iter()
            .position(|(i, _)| *i == config::STARTUP_PORT)
            .unwrap_or(0);
        let (idx, dev) = devices.swap_remove(initial);
        let con = Console::new(idx, dev);
        for (i, d) in devices {
            con.register_device(i, d);
        }
        espshell_term::console::install_log_backend(&con);

        keywords::register_builtin();

        let events = EventEngine::new(
            Arc::clone(&services.gpio),
            Arc::clone(&services.timers),
            Arc::clone(&services.tasks),
        );

        let sh = Arc::new(Self {
            con,
            gpio: services.gpio,
            pwm: services.pwm,
            rmt: services.rmt,
            pcnt: services.pcnt,
            uart: services.uart,
            timers: services.timers,
            tasks: services.tasks,
            storage: services.storage,
            aliases: AliasStore::new(),
            events,
            sequences: SequenceStore::new(),
            convars: ConvarRegistry::new(),
            pins: SavedPins::new(),
            counters: CounterLog::new(),
            shell_task: Mutex::new(None),
            sketch_task: Mutex::new(None),
            exit_requested: AtomicBool::new(false),
            start_ms: espshell_lib::millis(),
        });

        sh.convars.register_builtin();

        // An invariant violation terminates the offending task; before that
        // happens, a sketch paused by `suspend` must be resumed or it stays
        // frozen forever. The leak keeps the context valid for the lifetime
        // of the hook slot.
        let weak: &'static Weak<Shell> = Box::leak(Box::new(Arc::downgrade(&sh)));
        espshell_lib::register_fatal_hook(
            fatal_resume_sketch,
            weak as *const Weak<Shell> as usize,
        );

        EventEngine::start(&sh);
        sh
    }

    /// Start the shell task. Safe to call again after `exit exit`.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut slot = self.shell_task.lock();
        if slot.is_some() {
            self.con.print("% ESPShell is started already\r\n");
            return false;
        }
        self.exit_requested.store(false, Ordering::Release);
        let sh = Arc::clone(self);
        match self.tasks.spawn(
            "ESPShell",
            config::SHELL_CORE,
            None,
            Box::new(move || repl::shell_task(sh)),
        ) {
            Ok(id) => {
                *slot = Some(id);
                true
            }
            Err(_) => {
                self.con.print("% ESPShell failed to start its task\r\n");
                false
            }
        }
    }

    /// Record the host application's task for `suspend`/`resume`.
    pub fn remember_sketch_task(&self, id: TaskId) {
        *self.sketch_task.lock() = Some(id);
    }

    pub fn uptime_ms(&self) -> u64 {
        espshell_lib::millis().saturating_sub(self.start_ms)
    }

    /// Host identifier from persistent storage, empty when unset.
    pub fn hostid(&self) -> String {
        self.storage
            .kv_get(config::HOSTID_KEY)
            .unwrap_or_default()
    }

    pub(crate) fn clear_shell_task(&self) {
        *self.shell_task.lock() = None;
    }
}

/// Fatal hook body: runs while `must_not_happen!` is going down. Resumes
/// the host application task unconditionally, mirroring what an operator
/// would need most after the shell dies mid-`suspend`.
fn fatal_resume_sketch(ctx: usize) {
    // SAFETY: ctx is the leaked `Weak<Shell>` registered in `Shell::new`.
    let weak = unsafe { &*(ctx as *const Weak<Shell>) };
    if let Some(sh) = weak.upgrade() {
        if let Some(id) = *sh.sketch_task.lock() {
            let _ = sh.tasks.resume(id);
        }
    }
}
