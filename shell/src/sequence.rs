//! RMT pulse sequences: a symbol-level signal description compiled down to
//! the hardware symbol array.
//!
//! A sequence is edited inside its own command directory (`sequence N`).
//! Three input forms produce a transmit buffer:
//!
//! 1. `levels L/D L/D …` — the signal spelled out directly;
//! 2. `bits STRING` with `zero`/`one` defined as single levels ("short
//!    form", two bits per hardware symbol);
//! 3. `bits STRING` with `zero`/`one` defined as pulses ("long form", one
//!    bit per symbol; `head`/`tail` framing symbols allowed).
//!
//! Any change to the inputs invalidates the compiled array; compilation is
//! re-run (and is idempotent) before transmission.

use alloc::string::String;
use alloc::vec::Vec;

use espshell_drivers::{HalError, RmtSymbol};
use espshell_lib::numparse;
use espshell_lib::prefix_match;
use espshell_term::cprintf;

use crate::config::SEQUENCES_NUM;
use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::input::ArgView;
use crate::keywords::KEYWORDS_SEQUENCE;

/// `loop_count` sentinel: transmit continuously.
pub const SEQ_LOOP_INFINITE: u32 = u32::MAX;
/// `loop_count` of one: a single transmission.
pub const SEQ_LOOP_NONE: u32 = 1;

pub const TICK_MIN_US: f32 = 0.0125;
pub const TICK_MAX_US: f32 = 3.2;

#[derive(Default)]
pub struct Sequence {
    /// Tick length, µs. 0 = unset.
    pub tick_us: f32,
    /// Alphabet: what a "0" and a "1" look like.
    alph: [RmtSymbol; 2],
    head: RmtSymbol,
    tail: RmtSymbol,
    bits: Option<String>,
    /// Compiled transmit buffer. Empty = not compiled.
    compiled: Vec<RmtSymbol>,
    /// The buffer came from `levels` and survives alphabet changes.
    direct_levels: bool,
    pub mod_freq: u32,
    pub mod_duty: f32,
    pub mod_high: bool,
    pub eot_high: bool,
    pub loop_count: u32,
}

pub enum CompileError {
    /// `head`/`tail` must be set together.
    LonelyHeadTail,
    /// `zero` and `one` disagree on form.
    MixedAlphabet { one_is_pulse: bool },
    /// Nothing to compile yet.
    NotReady,
}

impl Sequence {
    pub fn new() -> Self {
        Self {
            mod_duty: 0.5,
            mod_high: true,
            loop_count: SEQ_LOOP_NONE,
            ..Default::default()
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.compiled.is_empty() && self.tick_us > 0.0
    }

    pub fn compiled(&self) -> &[RmtSymbol] {
        &self.compiled
    }

    pub fn bits(&self) -> Option<&str> {
        self.bits.as_deref()
    }

    /// Derived RMT frequency, Hz.
    pub fn tick_freq(&self) -> u32 {
        if self.tick_us > 0.0 {
            (1_000_000.0 / self.tick_us) as u32
        } else {
            0
        }
    }

    /// Forget the compiled buffer after an input mutation.
    fn invalidate(&mut self) {
        if !self.direct_levels {
            self.compiled.clear();
        }
    }

    fn set_alphabet(&mut self, which: usize, sym: RmtSymbol) {
        self.alph[which] = sym;
        self.direct_levels = false;
        self.compiled.clear();
    }

    fn set_head_tail(&mut self, head: bool, sym: RmtSymbol) {
        if head {
            self.head = sym;
        } else {
            self.tail = sym;
        }
        self.direct_levels = false;
        self.compiled.clear();
    }

    fn set_bits(&mut self, bits: &str) {
        self.bits = Some(String::from(bits));
        self.direct_levels = false;
        self.compiled.clear();
    }

    /// Adopt a direct `levels` definition: halves packed two per symbol.
    fn set_levels(&mut self, halves: &[(bool, u16)]) {
        self.bits = None;
        self.compiled.clear();
        let mut iter = halves.chunks(2);
        for pair in &mut iter {
            let sym = if pair.len() == 2 {
                RmtSymbol::pulse(pair[0].0, pair[0].1, pair[1].0, pair[1].1)
            } else {
                RmtSymbol::level(pair[0].0, pair[0].1)
            };
            self.compiled.push(sym);
        }
        self.direct_levels = true;
    }

    /// Compile `bits` against the alphabet. Returns the number of bits that
    /// were padded in (short form, odd bit count), so the caller can inform
    /// the user.
    pub fn compile(&mut self) -> Result<usize, CompileError> {
        if !self.compiled.is_empty() {
            return Ok(0); // already compiled; idempotent by construction
        }

        // head and tail go together or not at all
        if self.head.is_unset() != self.tail.is_unset() {
            return Err(CompileError::LonelyHeadTail);
        }

        let (zero, one) = (self.alph[0], self.alph[1]);
        let Some(bits) = self.bits.clone() else {
            return Err(CompileError::NotReady);
        };
        if zero.is_unset() || one.is_unset() || bits.is_empty() {
            return Err(CompileError::NotReady);
        }

        if zero.is_pulse() != one.is_pulse() {
            return Err(CompileError::MixedAlphabet {
                one_is_pulse: one.is_pulse(),
            });
        }

        if zero.is_pulse() {
            // Long form: one symbol per bit, head/tail framing honored.
            let framing = !self.head.is_unset();
            if framing {
                self.compiled.push(self.head);
            }
            for b in bits.bytes() {
                self.compiled.push(if b == b'1' { one } else { zero });
            }
            if framing {
                self.compiled.push(self.tail);
            }
            Ok(0)
        } else {
            // Short form: two bits per symbol. Odd bit counts are padded
            // with a copy of the last bit.
            let mut bits = bits;
            let mut padded = 0;
            if bits.len() % 2 == 1 {
                let last = bits.as_bytes()[bits.len() - 1] as char;
                bits.push(last);
                self.bits = Some(bits.clone());
                padded = 1;
            }
            let bytes = bits.as_bytes();
            for pair in bytes.chunks(2) {
                let first = if pair[0] == b'1' { one } else { zero };
                let second = if pair[1] == b'1' { one } else { zero };
                self.compiled
                    .push(RmtSymbol::pulse(first.level0, first.duration0, second.level0, second.duration0));
            }
            Ok(padded)
        }
    }
}

/// The per-shell sequence slots.
pub struct SequenceStore {
    slots: Vec<spin::Mutex<Sequence>>,
}

impl SequenceStore {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(SEQUENCES_NUM);
        for _ in 0..SEQUENCES_NUM {
            slots.push(spin::Mutex::new(Sequence::new()));
        }
        Self { slots }
    }

    pub fn get(&self, n: usize) -> Option<&spin::Mutex<Sequence>> {
        self.slots.get(n)
    }
}

impl Default for SequenceStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Transmission
// ---------------------------------------------------------------------------

/// Transmit sequence `n` over `pin`. Used by the `pin … sequence N` verb.
pub fn seq_send(env: &Env, pin: u8, n: usize) -> CmdResult {
    let Some(slot) = env.sh.sequences.get(n) else {
        cprintf!(env.sh.con, "% Sequence number must be 0..{}\r\n", SEQUENCES_NUM - 1);
        return Err(CmdError::Failed);
    };
    let mut seq = slot.lock();
    try_compile(env, &mut seq);
    if !seq.is_ready() {
        cprintf!(
            env.sh.con,
            "% Sequence {} is not configured (set \"tick\" and data first)\r\n",
            n
        );
        return Err(CmdError::Failed);
    }

    let rmt = &env.sh.rmt;
    let freq = seq.tick_freq();
    let report = |e: HalError| {
        cprintf!(env.sh.con, "% <e>RMT driver error: {}</>\r\n", e);
        CmdError::Failed
    };
    rmt.init(pin, freq).map_err(report)?;
    if seq.mod_freq > 0 {
        rmt.set_carrier(pin, seq.mod_freq, seq.mod_duty, seq.mod_high)
            .map_err(report)?;
    }
    rmt.set_eot_level(pin, seq.eot_high).map_err(report)?;
    let result = match seq.loop_count {
        SEQ_LOOP_NONE => rmt.write(pin, seq.compiled()),
        SEQ_LOOP_INFINITE => rmt.write_looping(pin, seq.compiled()),
        count => rmt.write_repeated(pin, seq.compiled(), count),
    };
    result.map_err(report)
}

/// Compile if possible, reporting the user-visible consequences (padding,
/// alphabet mismatch). Missing inputs are not an error here — the sequence
/// is simply left uncompiled.
fn try_compile(env: &Env, seq: &mut Sequence) {
    match seq.compile() {
        Ok(0) | Err(CompileError::NotReady) => {}
        Ok(_) => {
            // The pad duplicates the last bit; protocols that care should
            // use the long form.
            cprintf!(
                env.sh.con,
                "% Bit string was padded with one extra \"{}\" (must be even number of bits)\r\n",
                seq.bits().map(|b| &b[b.len() - 1..]).unwrap_or("0")
            );
        }
        Err(CompileError::LonelyHeadTail) => {
            env.sh
                .con
                .print("% <e>\"head\" and \"tail\" must be set together</>\r\n");
        }
        Err(CompileError::MixedAlphabet { one_is_pulse }) => {
            if one_is_pulse {
                env.sh
                    .con
                    .print("% <e>\"One\" is defined as a pulse, but \"Zero\" is a level</>\r\n");
            } else {
                env.sh
                    .con
                    .print("% <e>\"One\" is defined as a level, but \"Zero\" is a pulse</>\r\n");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Commands (sequence directory)
// ---------------------------------------------------------------------------

/// The sequence being edited, out of the directory context.
fn with_current<R>(env: &Env, f: impl FnOnce(&Env, &mut Sequence) -> R) -> Option<R> {
    let n = env.context;
    let slot = env.sh.sequences.get(n)?;
    let mut seq = slot.lock();
    Some(f(env, &mut seq))
}

// "sequence N" — enter the sequence directory.
pub fn cmd_seq_if(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let Some(n) = numparse::parse_u32(args.arg(1)) else {
        return Err(CmdError::BadArg(1));
    };
    if n as usize >= SEQUENCES_NUM {
        cprintf!(env.sh.con, "% Sequence number must be 0..{}\r\n", SEQUENCES_NUM - 1);
        return Err(CmdError::BadArg(1));
    }
    env.change_directory(n as usize, &KEYWORDS_SEQUENCE, Some("pulse sequence"));
    Ok(())
}

/// Parse a `LEVEL/DURATION` half: "1/50".
fn parse_half(tok: &str) -> Option<(bool, u16)> {
    let (level, duration) = tok.split_once('/')?;
    let level = match level {
        "0" => false,
        "1" => true,
        _ => return None,
    };
    let duration = numparse::parse_u32(duration)?;
    if duration == 0 || duration > 0x7fff {
        return None;
    }
    Some((level, duration as u16))
}

// "zero L/D [L/D]", "one …", "head …", "tail …"
pub fn cmd_seq_zeroone(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let Some(first) = parse_half(args.arg(1)) else {
        return Err(CmdError::BadArg(1));
    };
    let sym = match args.get(2) {
        None => RmtSymbol::level(first.0, first.1),
        Some(tok) => {
            let Some(second) = parse_half(tok) else {
                return Err(CmdError::BadArg(2));
            };
            RmtSymbol::pulse(first.0, first.1, second.0, second.1)
        }
    };
    let name = args.arg(0);
    with_current(env, |env, seq| {
        if prefix_match(name, "zero") {
            seq.set_alphabet(0, sym);
        } else if prefix_match(name, "one") {
            seq.set_alphabet(1, sym);
        } else if prefix_match(name, "head") {
            seq.set_head_tail(true, sym);
        } else {
            seq.set_head_tail(false, sym);
        }
        try_compile(env, seq);
    });
    Ok(())
}

// "tick TIME"
pub fn cmd_seq_tick(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let text = args.arg(1);
    let tick = numparse::parse_f32(text)
        .or_else(|| numparse::parse_u32(text).map(|v| v as f32));
    let Some(tick) = tick else {
        return Err(CmdError::BadArg(1));
    };
    if !(TICK_MIN_US..=TICK_MAX_US).contains(&tick) {
        cprintf!(
            env.sh.con,
            "% Tick must be within {} .. {} microseconds\r\n",
            TICK_MIN_US,
            TICK_MAX_US
        );
        return Err(CmdError::BadArg(1));
    }
    with_current(env, |env, seq| {
        seq.tick_us = tick;
        seq.invalidate();
        cprintf!(
            env.sh.con,
            "% RMT resolution {} Hz ({} us per tick)\r\n",
            seq.tick_freq(),
            tick
        );
        try_compile(env, seq);
    });
    Ok(())
}

// "bits STRING"
pub fn cmd_seq_bits(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let bits = args.arg(1);
    if bits.is_empty() || !bits.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(CmdError::BadArg(1));
    }
    with_current(env, |env, seq| {
        seq.set_bits(bits);
        try_compile(env, seq);
    });
    Ok(())
}

// "levels L/D L/D …"
pub fn cmd_seq_levels(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    if args.argc() < 2 {
        return Err(CmdError::MissingArg);
    }
    let mut halves = Vec::new();
    for i in 1..args.argc() {
        let Some(half) = parse_half(args.arg(i)) else {
            return Err(CmdError::BadArg(i));
        };
        halves.push(half);
    }
    with_current(env, |_env, seq| seq.set_levels(&halves));
    Ok(())
}

// "modulation FREQ [DUTY [high|low]]"
pub fn cmd_seq_modulation(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let Some(freq) = args.get(1).and_then(numparse::parse_u32) else {
        return Err(CmdError::BadArg(1));
    };
    let duty = match args.get(2) {
        None => 0.5,
        Some(tok) => match numparse::parse_f32(tok) {
            Some(d) if (0.0..=1.0).contains(&d) => d,
            _ => return Err(CmdError::BadArg(2)),
        },
    };
    let on_high = match args.get(3) {
        None => true,
        Some(tok) if prefix_match(tok, "high") => true,
        Some(tok) if prefix_match(tok, "low") => false,
        Some(_) => return Err(CmdError::BadArg(3)),
    };
    with_current(env, |_env, seq| {
        seq.mod_freq = freq;
        seq.mod_duty = duty;
        seq.mod_high = on_high;
    });
    Ok(())
}

// "eot high|low"
pub fn cmd_seq_eot(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let high = match args.arg(1) {
        t if prefix_match(t, "high") => true,
        t if prefix_match(t, "low") => false,
        _ => return Err(CmdError::BadArg(1)),
    };
    with_current(env, |_env, seq| seq.eot_high = high);
    Ok(())
}

// "loop COUNT|infinite|off"
pub fn cmd_seq_loop(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let tok = args.arg(1);
    let count = if prefix_match(tok, "infinite") {
        SEQ_LOOP_INFINITE
    } else if prefix_match(tok, "off") {
        SEQ_LOOP_NONE
    } else {
        match numparse::parse_u32(tok) {
            Some(0) | Some(1) => SEQ_LOOP_NONE,
            Some(n) if n != SEQ_LOOP_INFINITE => n,
            _ => return Err(CmdError::BadArg(1)),
        }
    };
    with_current(env, |_env, seq| seq.loop_count = count);
    Ok(())
}

fn show_symbol(out: &mut String, sym: &RmtSymbol) {
    if sym.is_pulse() {
        out.push_str(&alloc::format!(
            "{}/{} {}/{}",
            sym.level0 as u8,
            sym.duration0,
            sym.level1 as u8,
            sym.duration1
        ));
    } else {
        out.push_str(&alloc::format!("{}/{}", sym.level0 as u8, sym.duration0));
    }
}

// "show" (inside the directory) and "show sequence N"
pub fn show_sequence(env: &Env, n: usize) -> CmdResult {
    let Some(slot) = env.sh.sequences.get(n) else {
        return Err(CmdError::BadArg(2));
    };
    let seq = slot.lock();
    cprintf!(env.sh.con, "% Sequence {}:\r\n", n);
    if seq.tick_us > 0.0 {
        cprintf!(
            env.sh.con,
            "% Tick: {} us ({} Hz)\r\n",
            seq.tick_us,
            seq.tick_freq()
        );
    } else {
        env.sh.con.print("% Tick: not set\r\n");
    }
    for (name, sym) in [
        ("Zero", &seq.alph[0]),
        ("One", &seq.alph[1]),
        ("Head", &seq.head),
        ("Tail", &seq.tail),
    ] {
        if !sym.is_unset() {
            let mut text = String::new();
            show_symbol(&mut text, sym);
            cprintf!(env.sh.con, "% {}: {}\r\n", name, text);
        }
    }
    if let Some(bits) = seq.bits() {
        cprintf!(env.sh.con, "% Bits: {}\r\n", bits);
    }
    if seq.mod_freq > 0 {
        cprintf!(
            env.sh.con,
            "% Modulation: {} Hz, duty {}, on \"{}\"\r\n",
            seq.mod_freq,
            seq.mod_duty,
            if seq.mod_high { "1" } else { "0" }
        );
    }
    cprintf!(
        env.sh.con,
        "% EOT level: {}, loop: {}\r\n",
        if seq.eot_high { "high" } else { "low" },
        match seq.loop_count {
            SEQ_LOOP_NONE => String::from("off"),
            SEQ_LOOP_INFINITE => String::from("infinite"),
            n => alloc::format!("{n} times"),
        }
    );
    if seq.is_ready() {
        let mut text = String::new();
        for (i, sym) in seq.compiled().iter().enumerate() {
            if i > 0 {
                text.push(' ');
            }
            show_symbol(&mut text, sym);
        }
        cprintf!(
            env.sh.con,
            "% Compiled, {} symbols: {}\r\n",
            seq.compiled().len(),
            text
        );
    } else {
        env.sh.con.print("% Not compiled yet\r\n");
    }
    Ok(())
}

pub fn cmd_seq_show(env: &mut Env, _args: &ArgView<'_>) -> CmdResult {
    let n = env.context;
    show_sequence(env, n)
}

// "save PATH" — canonical re-typeable form.
pub fn cmd_seq_save(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let path = args.arg(1);
    let n = env.context;
    let Some(slot) = env.sh.sequences.get(n) else {
        return Err(CmdError::Failed);
    };
    let text = {
        let seq = slot.lock();
        let mut out = String::new();
        out.push_str(&alloc::format!("sequence {n}\r\n"));
        if seq.tick_us > 0.0 {
            out.push_str(&alloc::format!(" tick {}\r\n", seq.tick_us));
        }
        for (name, sym) in [
            ("zero", &seq.alph[0]),
            ("one", &seq.alph[1]),
            ("head", &seq.head),
            ("tail", &seq.tail),
        ] {
            if !sym.is_unset() {
                let mut t = String::new();
                show_symbol(&mut t, sym);
                out.push_str(&alloc::format!(" {name} {t}\r\n"));
            }
        }
        if let Some(bits) = seq.bits() {
            out.push_str(&alloc::format!(" bits {bits}\r\n"));
        }
        if seq.mod_freq > 0 {
            out.push_str(&alloc::format!(
                " modulation {} {} {}\r\n",
                seq.mod_freq,
                seq.mod_duty,
                if seq.mod_high { "high" } else { "low" }
            ));
        }
        out.push_str(&alloc::format!(
            " eot {}\r\n",
            if seq.eot_high { "high" } else { "low" }
        ));
        match seq.loop_count {
            SEQ_LOOP_NONE => {}
            SEQ_LOOP_INFINITE => out.push_str(" loop infinite\r\n"),
            c => out.push_str(&alloc::format!(" loop {c}\r\n")),
        }
        out.push_str("exit\r\n");
        out
    };
    match env.sh.storage.append(path, text.as_bytes()) {
        Ok(()) => {
            cprintf!(env.sh.con, "% Sequence {} appended to \"{}\"\r\n", n, path);
            Ok(())
        }
        Err(e) => {
            cprintf!(env.sh.con, "% <e>Failed to write \"{}\": {}</>\r\n", path, e);
            Err(CmdError::Failed)
        }
    }
}
