//! Tokenized user input.
//!
//! Every submitted line becomes an [`InputRecord`]: the raw line plus token
//! positions, the background-execution marker, and a cached handler
//! resolution. Records are shared by reference counting (`Arc`): the
//! foreground dispatcher, background tasks and alias lists all hold
//! references, and the record is freed exactly when the last one lets go.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use spin::Mutex;

use crate::env::Env;
use crate::error::CmdResult;

/// Handler signature: environment plus an argument view over the record.
pub type CmdHandler = fn(&mut Env, &ArgView<'_>) -> CmdResult;

pub struct InputRecord {
    /// The user's line, unchanged after tokenization.
    line: String,
    /// Byte ranges of the tokens within `line` (quotes stripped).
    tokens: Vec<(u32, u32)>,
    /// Effective token count after the `&` marker was stripped.
    effective: AtomicUsize,
    /// The `&` detection ran (it must run once per record, not per replay).
    bg_checked: AtomicBool,
    has_background: AtomicBool,
    has_priority: AtomicBool,
    priority: AtomicU32,
    /// Cached handler so alias replays skip the lookup.
    resolved: Mutex<Option<CmdHandler>>,
}

impl InputRecord {
    /// Split `line` into tokens. Whitespace separates tokens; double quotes
    /// keep spaces inside a token (no escapes inside quotes, an unterminated
    /// quote closes at end of line). Returns `None` for a line with no
    /// tokens.
    pub fn tokenize(line: &str) -> Option<Arc<Self>> {
        let line = String::from(line.trim());
        let bytes = line.as_bytes();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                break;
            }
            if bytes[i] == b'"' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end] != b'"' {
                    end += 1;
                }
                tokens.push((start as u32, end as u32));
                i = end + 1;
            } else {
                let start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                tokens.push((start as u32, i as u32));
            }
        }
        if tokens.is_empty() {
            return None;
        }
        let count = tokens.len();
        Some(Arc::new(Self {
            line,
            tokens,
            effective: AtomicUsize::new(count),
            bg_checked: AtomicBool::new(false),
            has_background: AtomicBool::new(false),
            has_priority: AtomicBool::new(false),
            priority: AtomicU32::new(0),
            resolved: Mutex::new(None),
        }))
    }

    /// Raw token count, before the `&` marker was stripped.
    pub fn argc0(&self) -> usize {
        self.tokens.len()
    }

    /// Effective token count.
    pub fn argc(&self) -> usize {
        self.effective.load(Ordering::Acquire)
    }

    pub fn arg(&self, i: usize) -> &str {
        let (start, end) = self.tokens[i];
        &self.line[start as usize..end as usize]
    }

    /// Detect a trailing `&` / `&N` once per record. `N` outside
    /// `0..=max_priority` behaves as if no priority was given; the caller
    /// reports that.
    ///
    /// Returns `true` when a priority value was present but rejected.
    pub fn detect_background(&self, max_priority: u32) -> bool {
        if self.bg_checked.swap(true, Ordering::AcqRel) {
            return false;
        }
        let count = self.argc();
        let last = self.arg(count - 1);
        // A lone "&" is not a marker, it is a (bogus) command name.
        if count < 2 || !last.starts_with('&') {
            return false;
        }
        let mut bad_priority = false;
        if last.len() > 1 {
            match espshell_lib::numparse::parse_u32(&last[1..]) {
                Some(p) if p <= max_priority => {
                    self.has_priority.store(true, Ordering::Release);
                    self.priority.store(p, Ordering::Release);
                }
                _ => bad_priority = true,
            }
        }
        self.has_background.store(true, Ordering::Release);
        self.effective.store(count - 1, Ordering::Release);
        bad_priority
    }

    pub fn is_background(&self) -> bool {
        self.has_background.load(Ordering::Acquire)
    }

    pub fn priority(&self) -> Option<u8> {
        if self.has_priority.load(Ordering::Acquire) {
            Some(self.priority.load(Ordering::Acquire) as u8)
        } else {
            None
        }
    }

    pub fn handler(&self) -> Option<CmdHandler> {
        *self.resolved.lock()
    }

    pub fn set_handler(&self, h: Option<CmdHandler>) {
        *self.resolved.lock() = h;
    }

    /// The command as the user typed it (including a stripped `&`),
    /// single-space separated.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for i in 0..self.argc0() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(self.arg(i));
        }
        out
    }
}

/// Argument view handed to command handlers: `argv[0]` is the command name.
pub struct ArgView<'a> {
    rec: &'a Arc<InputRecord>,
}

impl<'a> ArgView<'a> {
    pub fn new(rec: &'a Arc<InputRecord>) -> Self {
        Self { rec }
    }

    pub fn record(&self) -> &Arc<InputRecord> {
        self.rec
    }

    pub fn argc(&self) -> usize {
        self.rec.argc()
    }

    pub fn arg(&self, i: usize) -> &str {
        self.rec.arg(i)
    }

    /// `argv[i]`, or `None` past the end. Most handlers use this instead of
    /// indexing.
    pub fn get(&self, i: usize) -> Option<&str> {
        if i < self.argc() { Some(self.arg(i)) } else { None }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        (0..self.argc()).map(move |i| self.arg(i))
    }
}

/// Join tokens `args[from..]` with single spaces and expand escapes in one
/// pass: `\n \r \t \v \" \\`, `\xHH` and bare `\HH` hex bytes. Unknown
/// escapes keep their backslash. Returns raw bytes: commands that accept
/// free-form text (`uart write`, file writes) put arbitrary values on the
/// wire.
pub fn join_unescape(args: &ArgView<'_>, from: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in from..args.argc() {
        if i > from {
            out.push(b' ');
        }
        let tok = args.arg(i);
        let bytes = tok.as_bytes();
        let mut j = 0;
        while j < bytes.len() {
            let c = bytes[j];
            if c != b'\\' || j + 1 >= bytes.len() {
                out.push(c);
                j += 1;
                continue;
            }
            match bytes[j + 1] {
                b'\\' => {
                    out.push(b'\\');
                    j += 2;
                }
                b'n' => {
                    out.push(b'\n');
                    j += 2;
                }
                b'r' => {
                    out.push(b'\r');
                    j += 2;
                }
                b't' => {
                    out.push(b'\t');
                    j += 2;
                }
                b'v' => {
                    out.push(0x0b);
                    j += 2;
                }
                b'"' => {
                    out.push(b'"');
                    j += 2;
                }
                _ => {
                    // \xHH or \HH hex forms.
                    let mut k = j + 1;
                    if bytes[k] == b'x' || bytes[k] == b'X' {
                        k += 1;
                    }
                    let hex_len = bytes[k..]
                        .iter()
                        .take(2)
                        .take_while(|b| b.is_ascii_hexdigit())
                        .count();
                    if hex_len > 0 {
                        let hex = &tok[k..k + hex_len];
                        if let Ok(v) = u8::from_str_radix(hex, 16) {
                            out.push(v);
                            j = k + hex_len;
                            continue;
                        }
                    }
                    out.push(b'\\');
                    j += 1;
                }
            }
        }
    }
    out
}
