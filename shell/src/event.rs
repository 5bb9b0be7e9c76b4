//! The `if` / `every` event engine.
//!
//! An *event condition* binds a trigger — a GPIO edge, a polled pin-level
//! condition, or a plain timer — to the execution of a command alias.
//! Conditions live in an array of intrusive lists indexed by "trigger
//! index": `0..NUM_PINS-1` hold rising/falling conditions for that pin,
//! `NUM_PINS` holds polled conditions, `NUM_PINS + 1` holds `every` rules.
//!
//! Locking: one write-preferring readers/writer lock protects every list.
//! Writers (create/delete) additionally mask the affected pin's GPIO
//! interrupt while they relink, because the ISR takes **no lock at all** —
//! it walks the list with plain atomic loads. Entries come from a pool of
//! leaked allocations and are never freed, so a pointer captured by an ISR
//! or a timer callback stays dereferenceable forever; a recycled entry is
//! recognizable by its `alive` flag. This is a single-core model: a
//! multi-core port would need a cross-core sync step after unlinking.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU8, AtomicU16, AtomicU32, AtomicU64, Ordering};

use espshell_drivers::{GpioDriver, TaskService, TimerDispatch, TimerId, TimerService};
use espshell_lib::{MessagePipe, RwLock, micros, prefix_match};
use espshell_term::cprintf;

use crate::alias::{self, Alias};
use crate::config::{MPIPE_CAPACITY, NUM_PINS};
use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::input::ArgView;
use crate::shell::Shell;

/// Trigger index of polled (`if low|high … poll …`) conditions.
pub const NO_TRIGGER: usize = NUM_PINS;
/// Trigger index of periodic (`every …`) conditions.
pub const EVERY_IDX: usize = NUM_PINS + 1;

const FLAG_HAS_HIGH: u8 = 1 << 0;
const FLAG_HAS_LOW: u8 = 1 << 1;
const FLAG_HAS_LIMIT: u8 = 1 << 2;
const FLAG_HAS_RLIMIT: u8 = 1 << 3;
const FLAG_HAS_DELAY: u8 = 1 << 4;
const FLAG_ALIVE: u8 = 1 << 5;
const FLAG_DISABLED: u8 = 1 << 6;
const FLAG_RISING: u8 = 1 << 7;

/// One event condition. Every field the ISR or a timer callback can touch
/// is atomic; the list link is relinked only under the writer lock with the
/// pin's interrupt masked.
pub struct IfCond {
    next: AtomicPtr<IfCond>,
    exec: AtomicPtr<Alias>,
    trigger: AtomicU32,
    flags: AtomicU8,
    id: AtomicU16,
    /// Rate limit, milliseconds. 16-bit range by design (65.535 s max).
    rlimit: AtomicU16,
    poll_ms: AtomicU32,
    delay_ms: AtomicU32,
    limit: AtomicU32,
    high_lo: AtomicU32,
    high_hi: AtomicU32,
    low_lo: AtomicU32,
    low_hi: AtomicU32,
    hits: AtomicU32,
    drops: AtomicU32,
    /// Last condition match, µs.
    tsta: AtomicU64,
    /// Last alias execution, µs.
    tsta0: AtomicU64,
    timer: spin::Mutex<Option<TimerId>>,
}

impl IfCond {
    fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            exec: AtomicPtr::new(ptr::null_mut()),
            trigger: AtomicU32::new(0),
            flags: AtomicU8::new(0),
            id: AtomicU16::new(0),
            rlimit: AtomicU16::new(0),
            poll_ms: AtomicU32::new(0),
            delay_ms: AtomicU32::new(0),
            limit: AtomicU32::new(0),
            high_lo: AtomicU32::new(0),
            high_hi: AtomicU32::new(0),
            low_lo: AtomicU32::new(0),
            low_hi: AtomicU32::new(0),
            hits: AtomicU32::new(0),
            drops: AtomicU32::new(0),
            tsta: AtomicU64::new(0),
            tsta0: AtomicU64::new(0),
            timer: spin::Mutex::new(None),
        }
    }

    fn flag(&self, bit: u8) -> bool {
        self.flags.load(Ordering::Acquire) & bit != 0
    }

    fn set_flag(&self, bit: u8, on: bool) {
        if on {
            self.flags.fetch_or(bit, Ordering::AcqRel);
        } else {
            self.flags.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    pub fn id(&self) -> u16 {
        self.id.load(Ordering::Relaxed)
    }

    /// Trigger index this entry is filed under.
    pub fn trigger_index(&self) -> usize {
        self.trigger.load(Ordering::Relaxed) as usize
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn drops(&self) -> u32 {
        self.drops.load(Ordering::Relaxed)
    }

    pub fn is_alive(&self) -> bool {
        self.flag(FLAG_ALIVE)
    }

    pub fn is_disabled(&self) -> bool {
        self.flag(FLAG_DISABLED)
    }

    fn alias(&self) -> Option<&'static Alias> {
        let p = self.exec.load(Ordering::Acquire);
        // SAFETY: aliases are persistent; the pointer is either null or was
        // stored from a &'static Alias.
        unsafe { p.as_ref() }
    }

    /// Expired entries (execution cap reached) and disabled entries skip
    /// dispatch.
    fn not_expired(&self) -> bool {
        !self.flag(FLAG_DISABLED)
            && (!self.flag(FLAG_HAS_LIMIT)
                || self.hits.load(Ordering::Relaxed) < self.limit.load(Ordering::Relaxed))
    }

    /// Level-condition check over both input registers:
    /// every must-be-high pin reads high, every must-be-low pin reads low.
    fn masks_match(&self, lo: u32, hi: u32) -> bool {
        if self.flag(FLAG_HAS_HIGH) {
            let want_lo = self.high_lo.load(Ordering::Relaxed);
            let want_hi = self.high_hi.load(Ordering::Relaxed);
            if (want_lo & lo) != want_lo || (want_hi & hi) != want_hi {
                return false;
            }
        }
        if self.flag(FLAG_HAS_LOW) {
            let want_lo = self.low_lo.load(Ordering::Relaxed);
            let want_hi = self.low_hi.load(Ordering::Relaxed);
            if (want_lo & !lo) != want_lo || (want_hi & !hi) != want_hi {
                return false;
            }
        }
        true
    }

    /// Flood protection: has this entry executed less than `rlimit` ms ago?
    /// `tsta0 == 0` means "never executed" — the first match always passes.
    fn too_fast(&self) -> bool {
        let t0 = self.tsta0.load(Ordering::Relaxed);
        t0 != 0
            && self.flag(FLAG_HAS_RLIMIT)
            && self.tsta.load(Ordering::Relaxed) - t0
                < 1000 * self.rlimit.load(Ordering::Relaxed) as u64
    }

    fn clear_counters(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.drops.store(0, Ordering::Relaxed);
        self.tsta0.store(0, Ordering::Relaxed);
        self.tsta.store(micros(), Ordering::Relaxed);
    }
}

/// Per-pin ISR context, leaked at install time so the vector can outlive
/// everything.
struct IsrCtx {
    engine: Arc<EventEngine>,
    pin: u8,
}

fn anyedge_trampoline(ctx: usize) {
    // SAFETY: ctx is a leaked &'static IsrCtx installed by claim_interrupt.
    let ctx = unsafe { &*(ctx as *const IsrCtx) };
    ctx.engine.on_edge(ctx.pin);
}

pub struct EventEngine {
    heads: [AtomicPtr<IfCond>; NUM_PINS + 2],
    /// Protects list structure. The ISR never takes it; see module docs.
    lock: RwLock<()>,
    pipe: MessagePipe<usize>,
    pool: spin::Mutex<Vec<&'static IfCond>>,
    next_id: AtomicU16,
    /// Bit per pin: an any-edge ISR is installed.
    isr_installed: spin::Mutex<u64>,
    isr_ctxs: spin::Mutex<Vec<(u8, usize)>>,
    gpio: Arc<dyn GpioDriver>,
    timers: Arc<dyn TimerService>,
    tasks: Arc<dyn TaskService>,
}

impl EventEngine {
    pub fn new(
        gpio: Arc<dyn GpioDriver>,
        timers: Arc<dyn TimerService>,
        tasks: Arc<dyn TaskService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            heads: core::array::from_fn(|_| AtomicPtr::new(ptr::null_mut())),
            lock: RwLock::new(()),
            pipe: MessagePipe::new(MPIPE_CAPACITY),
            pool: spin::Mutex::new(Vec::new()),
            next_id: AtomicU16::new(1),
            isr_installed: spin::Mutex::new(0),
            isr_ctxs: spin::Mutex::new(Vec::new()),
            gpio,
            timers,
            tasks,
        })
    }

    /// Spawn the daemon task that drains the event pipe and fires aliases.
    pub fn start(sh: &Arc<Shell>) {
        let engine = Arc::clone(&sh.events);
        let sh = Arc::clone(sh);
        let _ = engine.tasks.clone().spawn(
            "ifcond",
            crate::config::SHELL_CORE,
            None,
            Box::new(move || {
                loop {
                    let raw = sh.events.pipe.recv();
                    // SAFETY: pipe carries pointers to pool entries, which
                    // are never freed.
                    let ifc = unsafe { &*(raw as *const IfCond) };
                    if !ifc.is_alive() {
                        // Deleted while the pointer sat in the pipe.
                        continue;
                    }
                    ifc.tsta.store(micros(), Ordering::Relaxed);
                    if ifc.too_fast() {
                        ifc.drops.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    ifc.tsta0
                        .store(ifc.tsta.load(Ordering::Relaxed), Ordering::Relaxed);
                    if let Some(al) = ifc.alias() {
                        // The alias runs on its own task: several events can
                        // arrive back to back and the daemon must not block.
                        alias::exec_in_background(&sh, al);
                    }
                    ifc.hits.fetch_add(1, Ordering::Relaxed);
                }
            }),
        );
    }

    /// Messages lost because the pipe was full.
    pub fn pipe_drops(&self) -> u32 {
        self.pipe.drops()
    }

    // -- ISR path ------------------------------------------------------

    /// The any-edge interrupt: classify the edge from the current level,
    /// walk the pin's list and forward full matches to the daemon. Lockless
    /// by design.
    fn on_edge(&self, pin: u8) {
        let (lo, hi) = self.gpio.levels();
        let rising = if pin < 32 {
            lo & (1 << pin) != 0
        } else {
            hi & (1 << (pin - 32)) != 0
        };

        let mut p = self.heads[pin as usize].load(Ordering::Acquire);
        while !p.is_null() {
            // SAFETY: entries are pool-allocated and never freed.
            let ifc = unsafe { &*p };
            if ifc.flag(FLAG_RISING) == rising {
                if ifc.not_expired() {
                    if ifc.masks_match(lo, hi) {
                        self.pipe.send_from_isr(p as usize);
                    }
                } else {
                    ifc.drops.fetch_add(1, Ordering::Relaxed);
                }
            }
            p = ifc.next.load(Ordering::Acquire);
        }
    }

    /// Timer callback body for polled and periodic entries. Runs at task
    /// priority (timer service dispatch).
    fn evaluate_polled(&self, ifc: &IfCond) {
        if !ifc.is_alive() {
            // The entry was deleted after the callback was already in
            // flight; executing a dead entry is worse than dropping it.
            return;
        }
        let (lo, hi) = self.gpio.levels();
        if ifc.not_expired() {
            if !ifc.masks_match(lo, hi) {
                return;
            }
            if self.pipe.send(ifc as *const IfCond as usize) {
                return;
            }
        }
        ifc.drops.fetch_add(1, Ordering::Relaxed);
    }

    // -- pool ----------------------------------------------------------

    fn get_entry(&self) -> &'static IfCond {
        let recycled = self.pool.lock().pop();
        let ifc: &'static IfCond = match recycled {
            Some(e) => e,
            None => Box::leak(Box::new(IfCond::new())),
        };
        let mut id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if id == 0 {
            id = self.next_id.fetch_add(1, Ordering::Relaxed);
        }
        ifc.id.store(id, Ordering::Relaxed);
        ifc.flags.store(FLAG_ALIVE, Ordering::Release);
        ifc.next.store(ptr::null_mut(), Ordering::Release);
        ifc.exec.store(ptr::null_mut(), Ordering::Release);
        ifc.clear_counters();
        ifc
    }

    fn put_entry(&self, ifc: &'static IfCond) {
        // Callbacks check `alive`; a stale pointer sees a dead entry, not
        // freed memory.
        ifc.set_flag(FLAG_ALIVE, false);
        ifc.set_flag(FLAG_DISABLED, true);
        self.pool.lock().push(ifc);
    }

    // -- interrupts and timers ----------------------------------------

    fn claim_interrupt(self: &Arc<Self>, pin: u8) {
        let mut installed = self.isr_installed.lock();
        if *installed & (1u64 << pin) != 0 {
            return;
        }
        *installed |= 1u64 << pin;

        let mut ctxs = self.isr_ctxs.lock();
        let ctx = match ctxs.iter().find(|(p, _)| *p == pin) {
            Some((_, ctx)) => *ctx,
            None => {
                let leaked: &'static IsrCtx = Box::leak(Box::new(IsrCtx {
                    engine: Arc::clone(self),
                    pin,
                }));
                let addr = leaked as *const IsrCtx as usize;
                ctxs.push((pin, addr));
                addr
            }
        };
        let _ = self.gpio.install_anyedge_isr(pin, anyedge_trampoline, ctx);
        let _ = self.gpio.enable_interrupt(pin);
    }

    fn claim_timer(self: &Arc<Self>, ifc: &'static IfCond, delayed_already: bool) {
        let engine = Arc::clone(self);
        let delayed = ifc.flag(FLAG_HAS_DELAY) && !delayed_already;
        let name = ifc.alias().map(|a| a.name.clone()).unwrap_or_default();

        let cb: espshell_drivers::timer::TimerCallback = if delayed {
            // Two-stage setup: the one-shot fires once, then re-claims a
            // periodic timer in its place.
            let engine2 = Arc::clone(self);
            Box::new(move || {
                if !ifc.is_alive() {
                    return;
                }
                if !ifc.is_disabled() {
                    engine2.evaluate_polled(ifc);
                } else {
                    ifc.drops.fetch_add(1, Ordering::Relaxed);
                }
                engine2.release_timer(ifc);
                engine2.claim_timer(ifc, true);
            })
        } else {
            Box::new(move || engine.evaluate_polled(ifc))
        };

        match self.timers.create(&name, TimerDispatch::Task, cb) {
            Ok(id) => {
                *ifc.timer.lock() = Some(id);
                if delayed {
                    let _ = self
                        .timers
                        .start_once(id, 1000 * ifc.delay_ms.load(Ordering::Relaxed) as u64);
                } else {
                    // First evaluation happens right away, the rest on the
                    // period.
                    if !delayed_already {
                        self.evaluate_polled(ifc);
                    }
                    let _ = self
                        .timers
                        .start_periodic(id, 1000 * ifc.poll_ms.load(Ordering::Relaxed) as u64);
                }
            }
            Err(_) => {
                espshell_lib::log_warn!("event engine failed to create a timer");
            }
        }
    }

    fn release_timer(&self, ifc: &IfCond) {
        if let Some(id) = ifc.timer.lock().take() {
            let _ = self.timers.stop(id);
            let _ = self.timers.delete(id);
        }
    }

    // -- list management ----------------------------------------------

    /// Create and link a condition. Returns the entry (already live).
    #[allow(clippy::too_many_arguments)]
    fn create(
        self: &Arc<Self>,
        sh: &Shell,
        trigger: usize,
        rising: bool,
        high: u64,
        low: u64,
        limit: u32,
        exec: &str,
    ) -> &'static IfCond {
        let al = sh.aliases.find_or_create(exec);

        let ifc = self.get_entry();
        ifc.trigger.store(trigger as u32, Ordering::Relaxed);
        ifc.set_flag(FLAG_RISING, rising);
        ifc.exec
            .store(al as *const Alias as *mut Alias, Ordering::Release);
        ifc.high_lo.store(high as u32, Ordering::Relaxed);
        ifc.high_hi.store((high >> 32) as u32, Ordering::Relaxed);
        ifc.low_lo.store(low as u32, Ordering::Relaxed);
        ifc.low_hi.store((low >> 32) as u32, Ordering::Relaxed);
        ifc.set_flag(FLAG_HAS_HIGH, high != 0);
        ifc.set_flag(FLAG_HAS_LOW, low != 0);
        ifc.set_flag(FLAG_HAS_LIMIT, limit > 0);
        ifc.limit.store(limit, Ordering::Relaxed);

        // Mask the pin's interrupt while the list changes shape; the writer
        // lock alone does not stop the ISR.
        if trigger < NO_TRIGGER {
            let _ = self.gpio.disable_interrupt(trigger as u8);
        }
        {
            let _guard = self.lock.write();
            ifc.next
                .store(self.heads[trigger].load(Ordering::Acquire), Ordering::Release);
            self.heads[trigger].store(ifc as *const IfCond as *mut IfCond, Ordering::Release);
        }
        if trigger < NO_TRIGGER {
            let installed = *self.isr_installed.lock() & (1u64 << trigger) != 0;
            if installed {
                let _ = self.gpio.enable_interrupt(trigger as u8);
            }
        }
        ifc
    }

    /// Delete conditions: one by id, a whole trigger list, or everything.
    pub fn delete(&self, selector: Selector) {
        let _guard = self.lock.write();
        let range = selector.trigger_range();
        for t in range {
            if self.heads[t].load(Ordering::Acquire).is_null() {
                continue;
            }
            if t < NO_TRIGGER {
                let _ = self.gpio.disable_interrupt(t as u8);
            }

            let mut prev: Option<&'static IfCond> = None;
            let mut p = self.heads[t].load(Ordering::Acquire);
            while !p.is_null() {
                // SAFETY: pool entries are never freed.
                let ifc: &'static IfCond = unsafe { &*p };
                let next = ifc.next.load(Ordering::Acquire);
                if selector.matches(ifc, t) {
                    match prev {
                        None => self.heads[t].store(next, Ordering::Release),
                        Some(pr) => pr.next.store(next, Ordering::Release),
                    }
                    if t < NO_TRIGGER {
                        self.release_interrupt_locked(t as u8);
                    } else {
                        self.release_timer(ifc);
                    }
                    self.put_entry(ifc);
                } else {
                    prev = Some(ifc);
                }
                p = next;
            }

            if t < NO_TRIGGER && *self.isr_installed.lock() & (1u64 << t) != 0 {
                let _ = self.gpio.enable_interrupt(t as u8);
            }
        }
    }

    /// `release_interrupt` body for use while already holding the writer
    /// lock (checks the just-updated head).
    fn release_interrupt_locked(&self, pin: u8) {
        if self.heads[pin as usize].load(Ordering::Acquire).is_null() {
            let mut installed = self.isr_installed.lock();
            if *installed & (1u64 << pin) != 0 {
                let _ = self.gpio.disable_interrupt(pin);
                let _ = self.gpio.remove_isr(pin);
                *installed &= !(1u64 << pin);
            }
        }
    }

    /// Reset counters. Re-enables expired entries. A readers operation:
    /// the list itself does not change.
    pub fn clear(&self, selector: Selector) {
        let _guard = self.lock.read();
        if matches!(selector, Selector::All) {
            self.pipe.clear_drops();
        }
        self.for_each_unlocked(|ifc, t| {
            if selector.matches(ifc, t) {
                ifc.clear_counters();
            }
        });
    }

    pub fn set_disabled(&self, selector: Selector, disabled: bool) {
        let _guard = self.lock.read();
        self.for_each_unlocked(|ifc, t| {
            if selector.matches(ifc, t) {
                ifc.set_flag(FLAG_DISABLED, disabled);
            }
        });
    }

    /// Walk every linked entry under the reader lock.
    pub fn for_each(&self, f: impl FnMut(&'static IfCond, usize)) {
        let _guard = self.lock.read();
        self.for_each_unlocked(f);
    }

    fn for_each_unlocked(&self, mut f: impl FnMut(&'static IfCond, usize)) {
        for t in 0..NUM_PINS + 2 {
            let mut p = self.heads[t].load(Ordering::Acquire);
            while !p.is_null() {
                // SAFETY: pool entries are never freed.
                let ifc: &'static IfCond = unsafe { &*p };
                f(ifc, t);
                p = ifc.next.load(Ordering::Acquire);
            }
        }
    }

    pub fn find_by_id(&self, id: u16) -> Option<(&'static IfCond, usize)> {
        let _guard = self.lock.read();
        let mut found = None;
        self.for_each_unlocked(|ifc, t| {
            if found.is_none() && ifc.id() == id {
                found = Some((ifc, t));
            }
        });
        found
    }
}

/// What a delete/clear/enable/disable applies to.
#[derive(Clone, Copy)]
pub enum Selector {
    Id(u16),
    /// Everything on one trigger index.
    Trigger(usize),
    /// Every `if` rule (edge and polled), but not `every` rules.
    AllIf,
    All,
}

impl Selector {
    fn trigger_range(&self) -> core::ops::Range<usize> {
        match self {
            Selector::Trigger(t) => *t..*t + 1,
            Selector::AllIf => 0..NO_TRIGGER + 1,
            _ => 0..NUM_PINS + 2,
        }
    }

    fn matches(&self, ifc: &IfCond, trigger: usize) -> bool {
        match self {
            Selector::Id(id) => ifc.id() == *id,
            Selector::Trigger(t) => trigger == *t,
            Selector::AllIf => trigger <= NO_TRIGGER,
            Selector::All => true,
        }
    }
}

// ---------------------------------------------------------------------------
// The "if" / "every" command
// ---------------------------------------------------------------------------

/// Read `NUM [ms|sec|min|hour]` starting at `args[i]`. Returns milliseconds
/// and the index after the timespec. Bare numbers are milliseconds.
fn read_timespec(args: &ArgView<'_>, i: usize) -> Option<(u64, usize)> {
    let num: u64 = espshell_lib::numparse::parse_u32(args.get(i)?)? as u64;
    let Some(unit) = args.get(i + 1) else {
        return Some((num, i + 1));
    };
    let (mult, used) = if prefix_match(unit, "milliseconds") || unit == "ms" {
        (1, 2)
    } else if prefix_match(unit, "seconds") {
        (1000, 2)
    } else if prefix_match(unit, "minutes") {
        (60 * 1000, 2)
    } else if prefix_match(unit, "hours") {
        (60 * 60 * 1000, 2)
    } else {
        (1, 1)
    };
    Some((num * mult, i + used))
}

fn parse_selector(
    env: &Env,
    args: &ArgView<'_>,
    every: bool,
    deleting: bool,
) -> Result<Selector, CmdError> {
    match args.get(2) {
        None | Some("all") => Ok(if every {
            Selector::Trigger(EVERY_IDX)
        } else if deleting {
            // "if delete all" spares "every" rules, "if clear all" resets
            // everything.
            Selector::AllIf
        } else {
            Selector::All
        }),
        Some(tok) => match espshell_lib::numparse::parse_u32(tok) {
            Some(id) if id > 0 && id <= u16::MAX as u32 => {
                if env.sh.events.find_by_id(id as u16).is_none() {
                    cprintf!(env.sh.con, "% No rule with id {} (\"show ifs\" to list)\r\n", id);
                    return Err(CmdError::Failed);
                }
                Ok(Selector::Id(id as u16))
            }
            _ => Err(CmdError::BadArg(2)),
        },
    }
}

fn pin_usable(env: &Env, pin: u32) -> bool {
    pin < env.sh.gpio.pin_count() as u32
}

// Handles both "if ..." and "every ..." (argv[0] distinguishes).
pub fn cmd_if(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let every = args.arg(0).starts_with('e');

    if args.argc() < 2 {
        return Err(CmdError::MissingArg);
    }

    let sub = args.arg(1);
    if prefix_match(sub, "save") {
        return cmd_if_save(env, args);
    }
    if prefix_match(sub, "disable") || prefix_match(sub, "enable") {
        let selector = parse_selector(env, args, every, false)?;
        env.sh.events.set_disabled(selector, sub.starts_with('d'));
        return Ok(());
    }
    if prefix_match(sub, "delete") || prefix_match(sub, "clear") {
        let deleting = sub.starts_with('d');
        let selector = parse_selector(env, args, every, deleting)?;
        if deleting {
            env.sh.events.delete(selector);
        } else {
            env.sh.events.clear(selector);
        }
        return Ok(());
    }

    // Creation path.
    let mut trigger = NO_TRIGGER;
    let mut rising = false;
    let mut high: u64 = 0;
    let mut low: u64 = 0;
    let mut poll_ms: u64 = 0;
    let mut delay_ms: u64 = 0;
    let mut max_exec: u32 = 0;
    let mut rate_limit: u64 = 0;
    let mut exec: Option<&str> = None;
    let mut i;

    if every {
        // "every TIMESPEC ..."
        trigger = EVERY_IDX;
        let Some((ms, next)) = read_timespec(args, 1) else {
            env.sh.con.print("% Numeric value expected (interval)\r\n");
            return Err(CmdError::BadArg(1));
        };
        if ms == 0 {
            return Err(CmdError::BadArg(1));
        }
        poll_ms = ms;
        i = next;
    } else {
        i = 1;
        // Optional edge trigger.
        if prefix_match(sub, "rising") || prefix_match(sub, "falling") {
            rising = sub.starts_with('r');
            let Some(pin) = args.get(2).and_then(espshell_lib::numparse::parse_u32) else {
                return Err(CmdError::BadArg(2));
            };
            if !pin_usable(env, pin) {
                return Err(CmdError::BadArg(2));
            }
            trigger = pin as usize;
            i = 3;
        }

        // Level conditions: pairs of "low PIN" / "high PIN".
        while i + 1 < args.argc()
            && (prefix_match(args.arg(i), "low") || prefix_match(args.arg(i), "high"))
        {
            let Some(pin) = espshell_lib::numparse::parse_u32(args.arg(i + 1)) else {
                return Err(CmdError::BadArg(i + 1));
            };
            if !pin_usable(env, pin) {
                return Err(CmdError::BadArg(i + 1));
            }
            // Condition pins must be readable even while driven.
            let _ = env.sh.gpio.input_enable(pin as u8);
            if args.arg(i).starts_with('l') {
                low |= 1u64 << pin;
            } else {
                high |= 1u64 << pin;
            }
            i += 2;
        }
    }

    // Common tail: "poll MS", "delay MS", "max-exec N", "rate-limit MS",
    // "exec ALIAS".
    while i + 1 < args.argc() {
        let key = args.arg(i);
        let val = args.arg(i + 1);
        if prefix_match(key, "poll") {
            let Some(v) = espshell_lib::numparse::parse_u32(val).filter(|v| *v > 0) else {
                env.sh
                    .con
                    .print("% <e>Polling value (milliseconds) is expected</>\r\n");
                return Err(CmdError::BadArg(i + 1));
            };
            poll_ms = v as u64;
        } else if prefix_match(key, "delay") {
            let Some(v) = espshell_lib::numparse::parse_u32(val).filter(|v| *v > 0) else {
                env.sh
                    .con
                    .print("% <e>Delay value (milliseconds) is expected</>\r\n");
                return Err(CmdError::BadArg(i + 1));
            };
            delay_ms = v as u64;
        } else if prefix_match(key, "max-exec") {
            let Some(v) = espshell_lib::numparse::parse_u32(val).filter(|v| *v > 0) else {
                env.sh.con.print("% <e>Numeric value is expected</>\r\n");
                return Err(CmdError::BadArg(i + 1));
            };
            max_exec = v;
        } else if prefix_match(key, "rate-limit") {
            let Some(v) = espshell_lib::numparse::parse_u32(val).filter(|v| *v > 0) else {
                env.sh
                    .con
                    .print("% <e>Time interval (milliseconds) is expected</>\r\n");
                return Err(CmdError::BadArg(i + 1));
            };
            rate_limit = v as u64;
        } else if prefix_match(key, "exec") {
            exec = Some(val);
        } else {
            env.sh.con.print(
                "% <e>Expected \"max-exec\", \"poll\", \"rate-limit\", \"delay\" or \"exec\" keyword</>\r\n",
            );
            return Err(CmdError::BadArg(i));
        }
        i += 2;
    }

    let Some(exec) = exec else {
        env.sh
            .con
            .print("% <e>What should we execute? (\"exec\" keyword expected)</>\r\n");
        return Err(CmdError::Failed);
    };

    // An "if" with no edge and no conditions degrades to a periodic rule:
    // it is just an "every" spelled differently.
    if !every && trigger == NO_TRIGGER && high == 0 && low == 0 {
        trigger = EVERY_IDX;
    }

    // Typo protection: a missing alias is created empty, loudly.
    match env.sh.aliases.find(exec) {
        None => cprintf!(
            env.sh.con,
            "% <i>Warning</>: alias \"{}\" does not exist, will be created (empty)\r\n",
            exec
        ),
        Some(al) if al.is_empty() => cprintf!(
            env.sh.con,
            "% <i>Warning</>: alias \"{}\" exists but it is empty\r\n",
            exec
        ),
        _ => {}
    }

    // Keyword compatibility by trigger class.
    if trigger >= NO_TRIGGER {
        if poll_ms == 0 {
            poll_ms = 1000;
        }
        if rate_limit > 0 {
            env.sh.con.print(
                "% \"<i>rate-limit</>\" keyword is ignored for polling conditions:\r\n\
                 % rate is a constant which is defined by \"<i>poll</>\" keyword\r\n",
            );
            rate_limit = 0;
        }
    } else if poll_ms > 0 || delay_ms > 0 {
        env.sh
            .con
            .print("% \"poll\" and \"delay\" keywords are ignored for rising/falling conditions\r\n");
        poll_ms = 0;
        delay_ms = 0;
    }

    if rate_limit > u16::MAX as u64 {
        env.sh
            .con
            .print("% \"rate-limit\" is set to maximum of 65.5 seconds\r\n");
        rate_limit = u16::MAX as u64;
    }

    let engine = Arc::clone(&env.sh.events);
    let ifc = engine.create(&env.sh, trigger, rising, high, low, max_exec, exec);
    if rate_limit > 0 {
        ifc.set_flag(FLAG_HAS_RLIMIT, true);
        ifc.rlimit.store(rate_limit as u16, Ordering::Relaxed);
    }
    ifc.poll_ms.store(poll_ms as u32, Ordering::Relaxed);
    if delay_ms > 0 {
        ifc.set_flag(FLAG_HAS_DELAY, true);
        ifc.delay_ms.store(delay_ms as u32, Ordering::Relaxed);
    }

    if trigger < NO_TRIGGER {
        engine.claim_interrupt(trigger as u8);
    } else {
        engine.claim_timer(ifc, false);
    }
    Ok(())
}

// "if save ID|* PATH" / "every save ID|* PATH"
fn cmd_if_save(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    if args.argc() < 4 {
        return Err(CmdError::MissingArg);
    }
    let which = args.arg(2);
    let path = args.arg(3);
    let mut text = String::new();
    let mut count = 0;

    {
        let engine = &env.sh.events;
        let id = if which == "*" {
            None
        } else {
            match espshell_lib::numparse::parse_u32(which) {
                Some(v) if v <= u16::MAX as u32 => Some(v as u16),
                _ => return Err(CmdError::BadArg(2)),
            }
        };
        engine.for_each(|ifc, t| {
            if let Some(id) = id {
                if ifc.id() != id {
                    return;
                }
            }
            text.push_str(&canonical_form(ifc, t));
            count += 1;
        });
    }

    if count == 0 {
        env.sh.con.print("% Nothing to save\r\n");
        return Err(CmdError::Failed);
    }
    match env.sh.storage.append(path, text.as_bytes()) {
        Ok(()) => {
            cprintf!(env.sh.con, "% {} rule(s) appended to \"{}\"\r\n", count, path);
            Ok(())
        }
        Err(e) => {
            cprintf!(env.sh.con, "% <e>Failed to write \"{}\": {}</>\r\n", path, e);
            Err(CmdError::Failed)
        }
    }
}

/// The re-typeable form of one rule: loading a saved file is just executing
/// it line by line.
fn canonical_form(ifc: &IfCond, trigger: usize) -> String {
    let mut out = String::new();
    match trigger {
        EVERY_IDX => {
            out.push_str(&format!("every {}", ifc.poll_ms.load(Ordering::Relaxed)));
        }
        NO_TRIGGER => {
            out.push_str("if");
            push_masks(&mut out, ifc);
            out.push_str(&format!(" poll {}", ifc.poll_ms.load(Ordering::Relaxed)));
        }
        pin => {
            out.push_str(&format!(
                "if {} {}",
                if ifc.flag(FLAG_RISING) { "rising" } else { "falling" },
                pin
            ));
            push_masks(&mut out, ifc);
        }
    }
    if ifc.flag(FLAG_HAS_DELAY) {
        out.push_str(&format!(" delay {}", ifc.delay_ms.load(Ordering::Relaxed)));
    }
    if ifc.flag(FLAG_HAS_LIMIT) {
        out.push_str(&format!(" max-exec {}", ifc.limit.load(Ordering::Relaxed)));
    }
    if ifc.flag(FLAG_HAS_RLIMIT) {
        out.push_str(&format!(" rate-limit {}", ifc.rlimit.load(Ordering::Relaxed)));
    }
    if let Some(al) = ifc.alias() {
        out.push_str(&format!(" exec {}", al.name));
    }
    out.push_str("\r\n");
    out
}

fn push_masks(out: &mut String, ifc: &IfCond) {
    let high =
        ifc.high_lo.load(Ordering::Relaxed) as u64 | (ifc.high_hi.load(Ordering::Relaxed) as u64) << 32;
    let low =
        ifc.low_lo.load(Ordering::Relaxed) as u64 | (ifc.low_hi.load(Ordering::Relaxed) as u64) << 32;
    for pin in 0..NUM_PINS as u64 {
        if high & (1 << pin) != 0 {
            out.push_str(&format!(" high {pin}"));
        }
        if low & (1 << pin) != 0 {
            out.push_str(&format!(" low {pin}"));
        }
    }
}

// "show ifs"
pub fn cmd_show_ifs(env: &mut Env, _args: &ArgView<'_>) -> CmdResult {
    let engine = &env.sh.events;
    env.sh.con.print(
        "%  ID | Trigger        | Alias      | Hits/Drops | State    | Extras\r\n\
         % ----+----------------+------------+------------+----------+-------\r\n",
    );
    let now = micros();
    let mut any = false;
    engine.for_each(|ifc, t| {
        any = true;
        let trigger = match t {
            EVERY_IDX => format!("every {}ms", ifc.poll_ms.load(Ordering::Relaxed)),
            NO_TRIGGER => format!("poll {}ms", ifc.poll_ms.load(Ordering::Relaxed)),
            pin => format!(
                "{} pin {}",
                if ifc.flag(FLAG_RISING) { "rising" } else { "falling" },
                pin
            ),
        };
        let state = if !ifc.is_alive() {
            "dead"
        } else if ifc.is_disabled() {
            "disabled"
        } else if ifc.flag(FLAG_HAS_LIMIT)
            && ifc.hits.load(Ordering::Relaxed) >= ifc.limit.load(Ordering::Relaxed)
        {
            "expired"
        } else {
            "armed"
        };
        let mut extras = String::new();
        if ifc.flag(FLAG_HAS_RLIMIT) {
            extras.push_str(&format!("rate {}ms ", ifc.rlimit.load(Ordering::Relaxed)));
        }
        if ifc.flag(FLAG_HAS_LIMIT) {
            extras.push_str(&format!("max {} ", ifc.limit.load(Ordering::Relaxed)));
        }
        let tsta = ifc.tsta.load(Ordering::Relaxed);
        if tsta > 0 && tsta <= now {
            extras.push_str(&format!("seen {}s ago", (now - tsta) / 1_000_000));
        }
        cprintf!(
            env.sh.con,
            "% {:>3} | {:<14} | {:<10} | {:>4}/{:<5} | {:<8} | {}\r\n",
            ifc.id(),
            trigger,
            ifc.alias().map(|a| a.name.as_str()).unwrap_or("?"),
            ifc.hits(),
            ifc.drops(),
            state,
            extras
        );
    });
    if !any {
        env.sh.con.print("% No rules defined\r\n");
    }
    cprintf!(
        env.sh.con,
        "% Event pipe overflows: {}\r\n",
        engine.pipe_drops()
    );
    Ok(())
}
