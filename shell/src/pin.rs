//! The `pin` command: a single-pass verb interpreter over one or more
//! GPIOs.
//!
//! `pin 2 out high delay 100 low` reads left to right with an implicit
//! "current pin" register — any decimal number switches it. A trailing
//! `loop N|inf` wraps the whole verb list in a counted repeat. Repetition
//! and delays are interruptible: a keypress aborts a foreground run, a
//! `kill` signal aborts a background one, and either way the command ends
//! with success so scripted lists can bail out early.

use espshell_drivers::{BusKind, PinFlags};
use espshell_lib::numparse;
use espshell_lib::prefix_match;
use espshell_term::cprintf;

use crate::config::NUM_PINS;
use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::exec::{self, TOO_LONG};
use crate::input::ArgView;
use crate::sequence;

/// One saved pin configuration, consumed by `pin N load`.
#[derive(Clone, Copy, Default)]
pub struct PinSnapshot {
    pub flags: PinFlags,
    pub level: bool,
    pub bus: BusKind,
    pub iomux: Option<u8>,
    pub matrix: (u32, u32),
}

/// Fixed table of snapshots, last-writer-wins by design: concurrent saves
/// of the same pin from two background commands are the operator's problem.
pub struct SavedPins {
    slots: spin::Mutex<[Option<PinSnapshot>; NUM_PINS]>,
}

impl SavedPins {
    pub fn new() -> Self {
        Self {
            slots: spin::Mutex::new([None; NUM_PINS]),
        }
    }

    pub fn save(&self, pin: u8, snapshot: PinSnapshot) {
        self.slots.lock()[pin as usize] = Some(snapshot);
    }

    pub fn load(&self, pin: u8) -> Option<PinSnapshot> {
        self.slots.lock()[pin as usize]
    }
}

impl Default for SavedPins {
    fn default() -> Self {
        Self::new()
    }
}

fn pin_exists(env: &Env, pin: u32) -> bool {
    pin < env.sh.gpio.pin_count() as u32
}

fn pin_exists_notice(env: &Env, pin: u32) -> bool {
    if pin_exists(env, pin) {
        if env.sh.gpio.is_reserved(pin as u8) {
            cprintf!(
                env.sh.con,
                "% <w>Warning: GPIO{} is reserved by the system</>\r\n",
                pin
            );
        }
        true
    } else {
        cprintf!(
            env.sh.con,
            "% Valid GPIO numbers are 0..{}\r\n",
            env.sh.gpio.pin_count() - 1
        );
        false
    }
}

fn pin_save(env: &Env, pin: u8) {
    let gpio = &env.sh.gpio;
    env.sh.pins.save(
        pin,
        PinSnapshot {
            flags: gpio.mode(pin),
            level: gpio.get_level(pin),
            bus: gpio.bus_kind(pin),
            iomux: gpio.iomux_function(pin),
            matrix: gpio.matrix_routing(pin),
        },
    );
}

fn pin_load(env: &Env, pin: u8) {
    let Some(snap) = env.sh.pins.load(pin) else {
        cprintf!(env.sh.con, "% No saved state for GPIO{} (use \"save\")\r\n", pin);
        return;
    };
    let gpio = &env.sh.gpio;
    let _ = gpio.set_mode(pin, snap.flags);
    let _ = gpio.iomux_select(pin, snap.iomux);
    let _ = gpio.matrix_in(pin, snap.matrix.0);
    let _ = gpio.matrix_out(pin, snap.matrix.1);
    if snap.flags.contains(PinFlags::OUTPUT) {
        let _ = gpio.set_level(pin, snap.level);
    }
}

// "pin NUM [VERB | NUM]..."
pub fn cmd_pin(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    if args.argc() < 2 {
        // Bare "pin" shows the valid range.
        let _ = pin_exists_notice(env, u32::MAX);
        return Ok(());
    }

    let Some(first) = numparse::parse_u32(args.arg(1)) else {
        return Err(CmdError::BadArg(1));
    };
    if !pin_exists_notice(env, first) {
        return Err(CmdError::BadArg(1));
    }
    let mut pin = first as u8;

    let mut flags = PinFlags::empty();
    let mut informed = false;
    // Repeat count for the whole verb list; `loop` rewrites it. Zero means
    // forever.
    let mut count: u32 = 1;
    // Verbs end here; `loop N` excludes itself from subsequent passes.
    let mut limit = args.argc();

    loop {
        let mut i = 2;
        while i < limit {
            let verb = args.arg(i);

            if prefix_match(verb, "pwm") {
                // "pwm FREQ DUTY": frequency 0 stops the generator.
                let Some(freq) = args.get(i + 1).and_then(numparse::parse_u32) else {
                    return Err(CmdError::BadArg(i + 1));
                };
                let duty = match args.get(i + 2).and_then(numparse::parse_f32) {
                    Some(d) if (0.0..=1.0).contains(&d) => d,
                    _ => return Err(CmdError::BadArg(i + 2)),
                };
                i += 2;
                if freq == 0 {
                    let _ = env.sh.pwm.detach(pin);
                } else if let Err(e) = env.sh.pwm.attach(pin, freq, duty) {
                    cprintf!(env.sh.con, "% <e>PWM failed: {}</>\r\n", e);
                    return Err(CmdError::Failed);
                }
            } else if prefix_match(verb, "delay") {
                let Some(ms) = args.get(i + 1).and_then(numparse::parse_u32) else {
                    env.sh
                        .con
                        .print("% <e>Delay value expected after keyword \"delay\"</>\r\n");
                    return Err(CmdError::BadArg(i + 1));
                };
                i += 1;
                if !informed && env.is_foreground && ms > TOO_LONG {
                    informed = true;
                    env.sh
                        .con
                        .print("% <g>Hint: Press [Enter] to interrupt the command</>\r\n");
                }
                if exec::delay_interruptible(env, ms) != ms {
                    // An interrupted delay ends the command, successfully.
                    cprintf!(env.sh.con, "% Command \"{}\" has been interrupted\r\n", args.arg(0));
                    return Ok(());
                }
            } else if prefix_match(verb, "save") {
                pin_save(env, pin);
            } else if prefix_match(verb, "up") {
                flags.insert(PinFlags::PULL_UP);
                let _ = env.sh.gpio.set_mode(pin, flags);
            } else if prefix_match(verb, "down") {
                flags.insert(PinFlags::PULL_DOWN);
                let _ = env.sh.gpio.set_mode(pin, flags);
            } else if prefix_match(verb, "in") {
                flags.insert(PinFlags::INPUT);
                let _ = env.sh.gpio.set_mode(pin, flags);
            } else if prefix_match(verb, "out") {
                flags.insert(PinFlags::OUTPUT);
                let _ = env.sh.gpio.set_mode(pin, flags);
            } else if prefix_match(verb, "open") {
                flags.insert(PinFlags::OPEN_DRAIN);
                let _ = env.sh.gpio.set_mode(pin, flags);
            } else if prefix_match(verb, "low")
                || prefix_match(verb, "high")
                || prefix_match(verb, "toggle")
            {
                if env.sh.gpio.is_input_only(pin) {
                    cprintf!(
                        env.sh.con,
                        "% <e>Pin {} is **INPUT-ONLY**</>, its OUTPUT can not be changed\r\n",
                        pin
                    );
                    return Err(CmdError::BadArg(i));
                }
                flags.insert(PinFlags::OUTPUT);
                let _ = env.sh.gpio.set_mode(pin, flags);
                let level = match verb.as_bytes()[0] {
                    b't' => !env.sh.gpio.get_level(pin),
                    b'h' => true,
                    _ => false,
                };
                let _ = env.sh.gpio.set_level(pin, level);
            } else if prefix_match(verb, "read") {
                cprintf!(
                    env.sh.con,
                    "% GPIO{} : logic {}\r\n",
                    pin,
                    env.sh.gpio.get_level(pin) as u8
                );
            } else if prefix_match(verb, "aread") {
                match env.sh.gpio.analog_read(pin) {
                    Ok(v) => cprintf!(env.sh.con, "% GPIO{} : analog {}\r\n", pin, v),
                    Err(e) => cprintf!(env.sh.con, "% <e>Analog read failed: {}</>\r\n", e),
                }
            } else if prefix_match(verb, "sequence") {
                let Some(n) = args.get(i + 1).and_then(numparse::parse_u32) else {
                    return Err(CmdError::BadArg(i + 1));
                };
                i += 1;
                sequence::seq_send(env, pin, n as usize)?;
            } else if prefix_match(verb, "hold") {
                let _ = env.sh.gpio.hold(pin);
            } else if prefix_match(verb, "release") {
                let _ = env.sh.gpio.release(pin);
            } else if prefix_match(verb, "load") {
                // Shortening stops at "loa": a bare "lo" is "low" above.
                pin_load(env, pin);
            } else if prefix_match(verb, "reset") {
                let _ = env.sh.gpio.reset(pin);
            } else if prefix_match(verb, "iomux") {
                // Optional argument: a function number, or "gpio" for the
                // pad-select-gpio special case. Default is function 0.
                let mut function = Some(0u8);
                if let Some(next) = args.get(i + 1) {
                    if let Some(f) = numparse::parse_u32(next) {
                        function = Some(f as u8);
                        i += 1;
                    } else if prefix_match(next, "gpio") {
                        function = None;
                        i += 1;
                    }
                }
                let _ = env.sh.gpio.iomux_select(pin, function);
            } else if prefix_match(verb, "matrix") {
                i += cmd_pin_matrix(env, args, pin, i)?;
            } else if prefix_match(verb, "loop") {
                // Must be the last verb; the count is consumed once and the
                // passes that follow stop before it.
                let Some(next) = args.get(i + 1) else {
                    return Err(CmdError::BadArg(i));
                };
                if i + 2 != limit {
                    env.sh
                        .con
                        .print("% <e>\"loop\" must be the last keyword</>\r\n");
                    return Err(CmdError::BadArg(i));
                }
                count = if prefix_match(next, "infinite") {
                    0
                } else {
                    match numparse::parse_u32(next) {
                        Some(n) if n > 0 => n,
                        _ => return Err(CmdError::BadArg(i + 1)),
                    }
                };
                if !informed && env.is_foreground {
                    informed = true;
                    env.sh
                        .con
                        .print("% <g>Hint: Press [Enter] to interrupt the command</>\r\n");
                }
                limit = i;
                break;
            } else if numparse::is_decimal(verb) && !verb.starts_with('-') {
                // A bare number switches the current pin.
                let Some(p) = numparse::parse_u32(verb) else {
                    return Err(CmdError::BadArg(i));
                };
                if !pin_exists(env, p) {
                    return Err(CmdError::BadArg(i));
                }
                pin = p as u8;
            } else {
                return Err(CmdError::BadArg(i));
            }

            i += 1;
        }

        // Give the user a way out of looped commands between passes.
        if env.is_foreground {
            if env.sh.con.anykey_pressed() {
                env.sh.con.print("% Key pressed, aborting..\r\n");
                break;
            }
        } else if env.sh.tasks.wait_notify(0).is_some() {
            break;
        }

        if count > 0 {
            count -= 1;
            if count == 0 {
                break;
            }
        }
    }
    Ok(())
}

// "matrix [in|out SIGNAL]" — returns how many extra arguments were used.
fn cmd_pin_matrix(
    env: &Env,
    args: &ArgView<'_>,
    pin: u8,
    i: usize,
) -> Result<usize, CmdError> {
    use espshell_drivers::gpio::{MATRIX_SIGNAL_GPIO, MATRIX_SIGNAL_ZERO};
    match args.get(i + 1) {
        Some(dir) if prefix_match(dir, "in") || prefix_match(dir, "out") => {
            let Some(signal) = args.get(i + 2).and_then(numparse::parse_u32) else {
                return Err(CmdError::BadArg(i + 2));
            };
            let r = if dir.starts_with('i') {
                env.sh.gpio.matrix_in(pin, signal)
            } else {
                env.sh.gpio.matrix_out(pin, signal)
            };
            if let Err(e) = r {
                cprintf!(env.sh.con, "% <e>Matrix routing failed: {}</>\r\n", e);
                return Err(CmdError::Failed);
            }
            Ok(2)
        }
        _ => {
            // No arguments: disconnect both directions — input signals go
            // to the constant-zero source, the output returns to the
            // simple-GPIO signal.
            let _ = env.sh.gpio.matrix_in(pin, MATRIX_SIGNAL_ZERO);
            let _ = env.sh.gpio.matrix_out(pin, MATRIX_SIGNAL_GPIO);
            Ok(0)
        }
    }
}

// "show pin NUM"
pub fn show_pin(env: &Env, pin: u8) -> CmdResult {
    if !pin_exists_notice(env, pin as u32) {
        return Err(CmdError::BadArg(2));
    }
    let gpio = &env.sh.gpio;
    let flags = gpio.mode(pin);
    let mut mode = alloc::string::String::new();
    for (bit, name) in [
        (PinFlags::INPUT, "input"),
        (PinFlags::OUTPUT, "output"),
        (PinFlags::PULL_UP, "pull-up"),
        (PinFlags::PULL_DOWN, "pull-down"),
        (PinFlags::OPEN_DRAIN, "open-drain"),
    ] {
        if flags.contains(bit) {
            if !mode.is_empty() {
                mode.push_str(", ");
            }
            mode.push_str(name);
        }
    }
    if mode.is_empty() {
        mode.push_str("not configured");
    }
    cprintf!(env.sh.con, "% GPIO{}: {}\r\n", pin, mode);
    cprintf!(
        env.sh.con,
        "% Level: {}, bus: {:?}\r\n",
        gpio.get_level(pin) as u8,
        gpio.bus_kind(pin)
    );
    if env.sh.pins.load(pin).is_some() {
        env.sh.con.print("% A saved snapshot exists for this pin\r\n");
    }
    Ok(())
}
