//! The `count` command: pulse counting / frequency measurement on a GPIO,
//! backed by a hardware pulse-counter unit.

use alloc::string::String;
use alloc::vec::Vec;

use espshell_drivers::DELAY_INFINITE;
use espshell_drivers::pcnt::PCNT_OVERFLOW;
use espshell_lib::{millis, numparse, prefix_match};
use espshell_term::cprintf;

use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::exec;
use crate::input::ArgView;

/// Poll interval while waiting for a trigger or measuring an open-ended
/// interval, ms.
const TRIGGER_POLL: u32 = 1000;

/// Default measurement time, ms.
const PULSE_WAIT: u32 = 1000;

/// Bookkeeping for `show counters`.
#[derive(Clone)]
pub struct CounterRow {
    pub pin: u8,
    pub unit: u8,
    pub running: bool,
    pub pulses: u64,
    pub interval_ms: u32,
}

pub struct CounterLog {
    rows: spin::Mutex<Vec<CounterRow>>,
}

impl CounterLog {
    pub fn new() -> Self {
        Self {
            rows: spin::Mutex::new(Vec::new()),
        }
    }

    fn start(&self, pin: u8, unit: u8) -> usize {
        let mut rows = self.rows.lock();
        rows.push(CounterRow {
            pin,
            unit,
            running: true,
            pulses: 0,
            interval_ms: 0,
        });
        rows.len() - 1
    }

    fn finish(&self, slot: usize, pulses: u64, interval_ms: u32) {
        let mut rows = self.rows.lock();
        if let Some(row) = rows.get_mut(slot) {
            row.running = false;
            row.pulses = pulses;
            row.interval_ms = interval_ms;
        }
    }

    pub fn rows(&self) -> Vec<CounterRow> {
        self.rows.lock().clone()
    }
}

impl Default for CounterLog {
    fn default() -> Self {
        Self::new()
    }
}

fn read_total(env: &Env, unit: u8) -> u64 {
    let counter = env.sh.pcnt.read(unit).max(0) as u64;
    let overflows = env.sh.pcnt.overflows(unit) as u64;
    overflows * PCNT_OVERFLOW as u64 + counter
}

// "count PIN [TIME_MS|infinite] [trigger] [filter NS]"
pub fn cmd_count(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    if args.argc() < 2 {
        return Err(CmdError::MissingArg);
    }
    let Some(pin) = numparse::parse_u32(args.arg(1)) else {
        return Err(CmdError::BadArg(1));
    };
    if pin >= env.sh.gpio.pin_count() as u32 {
        return Err(CmdError::BadArg(1));
    }
    let pin = pin as u8;

    let mut duration = PULSE_WAIT;
    let mut trigger = false;
    let mut filter_ns = 0u32;

    let mut i = 2;
    while i < args.argc() {
        let tok = args.arg(i);
        if let Some(ms) = numparse::parse_u32(tok) {
            duration = ms;
        } else if prefix_match(tok, "infinite") {
            duration = DELAY_INFINITE;
        } else if prefix_match(tok, "trigger") {
            trigger = true;
        } else if prefix_match(tok, "filter") {
            let Some(ns) = args.get(i + 1).and_then(numparse::parse_u32) else {
                return Err(CmdError::BadArg(i + 1));
            };
            filter_ns = ns;
            i += 1;
        } else {
            return Err(CmdError::BadArg(i));
        }
        i += 1;
    }

    let unit = match env.sh.pcnt.claim_unit() {
        Ok(u) => u,
        Err(_) => {
            env.sh
                .con
                .print("% <e>No free pulse-counter unit available</>\r\n% Finish other \"count\" commands first\r\n");
            return Err(CmdError::Failed);
        }
    };
    let _ = env.sh.pcnt.bind(unit, pin);
    if filter_ns > 0 {
        let _ = env.sh.pcnt.set_filter(unit, filter_ns);
    }
    let _ = env.sh.pcnt.clear(unit);
    let _ = env.sh.pcnt.start(unit);
    let slot = env.sh.counters.start(pin, unit);

    let started = millis();
    let mut interrupted = false;

    if trigger {
        cprintf!(
            env.sh.con,
            "% Waiting for the first pulse on GPIO{} (press any key to abort)\r\n",
            pin
        );
        // The trigger wait polls in short slices so a keypress (or a kill
        // signal) gets through within one interval even for short waits.
        let slice = TRIGGER_POLL / 4;
        while read_total(env, unit) == 0 {
            if env.is_foreground {
                env.sh.tasks.sleep_ms(slice);
                if env.sh.con.anykey_pressed() {
                    interrupted = true;
                    break;
                }
            } else if exec::delay_interruptible(env, slice) != slice {
                interrupted = true;
                break;
            }
        }
    }

    if !interrupted {
        // The measurement window itself.
        if duration == DELAY_INFINITE {
            cprintf!(env.sh.con, "% Counting pulses on GPIO{}, press any key to stop\r\n", pin);
        }
        if exec::delay_interruptible(env, duration) != duration {
            interrupted = true;
        }
    }

    let _ = env.sh.pcnt.stop(unit);
    let elapsed = (millis() - started) as u32;
    let pulses = read_total(env, unit);
    let window = if interrupted || duration == DELAY_INFINITE {
        elapsed
    } else {
        duration
    };
    env.sh.counters.finish(slot, pulses, window);
    let _ = env.sh.pcnt.release_unit(unit);

    let freq = if window > 0 {
        pulses * 1000 / window as u64
    } else {
        0
    };
    if interrupted {
        env.sh.con.print("% Interrupted\r\n");
    }
    cprintf!(
        env.sh.con,
        "% GPIO{}: {} pulses in {} ms (~{} Hz)\r\n",
        pin,
        pulses,
        window,
        freq
    );
    Ok(())
}

// "show counters"
pub fn show_counters(env: &Env) -> CmdResult {
    let rows = env.sh.counters.rows();
    if rows.is_empty() {
        env.sh.con.print("% No pulse-counter activity yet\r\n");
        return Ok(());
    }
    env.sh.con.print(
        "%<r>  GPIO | Unit | State    | Pulses     | Window  </>\r\n\
         % ------+------+----------+------------+---------\r\n",
    );
    for row in rows {
        let state = if row.running { "counting" } else { "done" };
        let window = if row.running {
            String::from("-")
        } else {
            alloc::format!("{} ms", row.interval_ms)
        };
        cprintf!(
            env.sh.con,
            "%   {:>3} | {:>4} | {:<8} | {:>10} | {}\r\n",
            row.pin,
            row.unit,
            state,
            row.pulses,
            window
        );
    }
    Ok(())
}
