//! Single-line editor.
//!
//! A compact descendant of the classic editline: one edit buffer, a cursor,
//! a keymap of byte-to-handler entries and an output buffer ("screen") that
//! batches echo bytes until the next blocking read. Key handlers return a
//! [`Status`] telling the read loop whether the line is finished.
//!
//! Control-key behavior is listed in the `? keys` help page; the tables at
//! the bottom of this file are the authoritative mapping.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use espshell_lib::log_error;

use crate::console::Console;

/// Maximum accepted input length; longer lines stop growing.
pub const MAX_INPUT_LENGTH: usize = 500;

/// Console read slice, milliseconds. Short enough to keep the failure
/// counter responsive, long enough not to spin.
const READ_SLICE_MS: u32 = 500;

/// Consecutive read failures tolerated before the editor gives up the
/// current line and lets the caller yield.
const MAX_READ_FAILURES: u32 = 10;

/// Non-zero disables the `?` context-help hotkey. Exposed as a console
/// variable by the shell.
pub static QM_BYPASS: AtomicU32 = AtomicU32::new(0);

/// Context-help hook: receives the current (partial) input line.
pub type HelpHook = fn(&str);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Keep editing.
    Stay,
    /// Line complete, return it.
    Done,
}

type Handler = fn(&mut Editor) -> Status;

const CTL_A: u8 = 0x01;
const CTL_B: u8 = 0x02;
const CTL_C: u8 = 0x03;
const CTL_D: u8 = 0x04;
const CTL_E: u8 = 0x05;
const CTL_F: u8 = 0x06;
const CTL_H: u8 = 0x08;
const TAB: u8 = 0x09;
const LF: u8 = 0x0a;
const CTL_K: u8 = 0x0b;
const CTL_L: u8 = 0x0c;
const CR: u8 = 0x0d;
const CTL_O: u8 = 0x0f;
const CTL_P: u8 = 0x10;
const CTL_R: u8 = 0x12;
const CTL_Z: u8 = 0x1a;
const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;

pub struct Editor {
    con: Arc<Console>,
    line: Vec<u8>,
    /// Cursor index into `line`.
    point: usize,
    /// Batched echo output, flushed before every blocking read.
    screen: Vec<u8>,
    prompt: String,
    /// Host-id tag drawn before the prompt ("myhost@").
    prompt_tag: heapless::String<24>,
    help_hook: Option<HelpHook>,
    read_failures: u32,
    /// Swallow one LF after a CR submitted the line (CR+LF terminals).
    swallow_lf: bool,
    /// Echo was pushed off by a leading '@'.
    echo_pushed: bool,
}

impl Editor {
    pub fn new(con: Arc<Console>) -> Self {
        Self {
            con,
            line: Vec::new(),
            point: 0,
            screen: Vec::new(),
            prompt: String::new(),
            prompt_tag: heapless::String::new(),
            help_hook: None,
            read_failures: 0,
            swallow_lf: false,
            echo_pushed: false,
        }
    }

    pub fn set_help_hook(&mut self, hook: HelpHook) {
        self.help_hook = Some(hook);
    }

    pub fn console(&self) -> &Arc<Console> {
        &self.con
    }

    /// Set the host-id prefix drawn before the prompt.
    pub fn set_prompt_tag(&mut self, tag: &str) {
        self.prompt_tag.clear();
        let _ = self.prompt_tag.push_str(tag);
    }

    /// Read one line. Returns `None` when the console read path keeps
    /// failing; the caller should yield and retry.
    pub fn readline(&mut self, prompt: &str) -> Option<String> {
        self.prompt.clear();
        self.prompt.push_str(prompt);
        self.line.clear();
        self.point = 0;
        self.echo_pushed = false;
        self.con.history().lock().reset_cursor();
        self.draw_prompt();

        loop {
            let b = self.read_byte()?;
            if b == LF && self.swallow_lf {
                self.swallow_lf = false;
                continue;
            }
            self.swallow_lf = false;
            if self.dispatch(b) == Status::Done {
                break;
            }
        }

        if self.echo_pushed {
            self.con.pop_echo();
            self.echo_pushed = false;
        }
        Some(String::from_utf8_lossy(&self.line).into_owned())
    }

    // -- byte input ----------------------------------------------------

    fn read_byte(&mut self) -> Option<u8> {
        self.flush();
        loop {
            let mut b = [0u8; 1];
            let n = self.con.read_bytes(&mut b, READ_SLICE_MS);
            if n > 0 {
                self.read_failures = 0;
                self.con.note_user_byte(b[0]);
                return Some(b[0]);
            }
            if n < 0 {
                self.read_failures += 1;
                if self.read_failures == MAX_READ_FAILURES {
                    log_error!("console read keeps failing, giving up the line");
                }
                if self.read_failures >= MAX_READ_FAILURES {
                    return None;
                }
                espshell_lib::yield_now();
            }
        }
    }

    fn dispatch(&mut self, b: u8) -> Status {
        for (key, handler) in KEYMAP {
            if *key == b {
                return handler(self);
            }
        }
        if b == b'?' {
            return self.question_pressed();
        }
        if b >= 0x20 && b != DEL {
            self.insert_byte(b);
        }
        Status::Stay
    }

    // -- screen output -------------------------------------------------

    fn flush(&mut self) {
        if !self.screen.is_empty() {
            if self.con.echo_mode() == crate::console::EchoMode::On {
                self.con.write_raw(&self.screen);
            }
            self.screen.clear();
        }
    }

    fn put(&mut self, b: u8) {
        self.screen.push(b);
    }

    fn put_str(&mut self, s: &str) {
        self.screen.extend_from_slice(s.as_bytes());
    }

    /// Echo a character; control characters render as `^X`.
    fn echo_char(&mut self, b: u8) {
        if b < 0x20 {
            self.put(b'^');
            self.put(b + 64);
        } else {
            self.put(b);
        }
    }

    fn display_width(b: u8) -> usize {
        if b < 0x20 { 2 } else { 1 }
    }

    fn back_over(&mut self, b: u8) {
        for _ in 0..Self::display_width(b) {
            self.put(0x08);
        }
    }

    fn draw_prompt(&mut self) {
        if !self.prompt_tag.is_empty() {
            let tag = self.prompt_tag.clone();
            self.put_str(&tag);
        }
        let prompt = self.prompt.clone();
        self.put_str(&prompt);
    }

    /// Redraw `line[from..]` and park the cursor back at `point`.
    fn redraw_tail(&mut self, from: usize, erase: usize) {
        for i in from..self.line.len() {
            let b = self.line[i];
            self.echo_char(b);
        }
        for _ in 0..erase {
            self.put(b' ');
        }
        for _ in 0..erase {
            self.put(0x08);
        }
        for i in (self.point..self.line.len()).rev() {
            let b = self.line[i];
            self.back_over(b);
        }
    }

    /// Full redraw on a fresh terminal row.
    fn redisplay(&mut self) {
        self.put_str("\r\n");
        self.draw_prompt();
        self.redraw_tail(0, 0);
    }

    // -- editing primitives --------------------------------------------

    fn insert_byte(&mut self, b: u8) {
        if self.line.len() >= MAX_INPUT_LENGTH {
            return;
        }
        if self.line.is_empty() && b == b'@' && !self.echo_pushed {
            // Password entry: suppress echo until the line is submitted.
            self.flush();
            self.con.push_echo_off();
            self.echo_pushed = true;
        }
        self.line.insert(self.point, b);
        self.point += 1;
        self.redraw_tail(self.point - 1, 0);
    }

    /// Insert an arbitrary character produced by the Esc-digits-Esc escape.
    fn insert_code(&mut self, code: u8) {
        if code != 0 {
            self.insert_byte(code);
        }
    }

    fn load_line(&mut self, text: &str) {
        // Erase the old line from the screen, then adopt the new one.
        self.move_to(0);
        let erase: usize = self.line.iter().map(|&b| Self::display_width(b)).sum();
        self.line.clear();
        self.line.extend_from_slice(text.as_bytes());
        if self.line.len() > MAX_INPUT_LENGTH {
            self.line.truncate(MAX_INPUT_LENGTH);
        }
        self.point = self.line.len();
        for i in 0..self.line.len() {
            let b = self.line[i];
            self.echo_char(b);
        }
        let drawn: usize = self.line.iter().map(|&b| Self::display_width(b)).sum();
        if erase > drawn {
            for _ in 0..erase - drawn {
                self.put(b' ');
            }
            for _ in 0..erase - drawn {
                self.put(0x08);
            }
        }
    }

    fn move_to(&mut self, target: usize) {
        while self.point > target {
            self.point -= 1;
            let b = self.line[self.point];
            self.back_over(b);
        }
        while self.point < target {
            let b = self.line[self.point];
            self.echo_char(b);
            self.point += 1;
        }
    }

    // -- key handlers --------------------------------------------------

    fn enter_cr(&mut self) -> Status {
        self.con.note_cr();
        self.swallow_lf = true;
        self.submit()
    }

    fn enter_lf(&mut self) -> Status {
        self.submit()
    }

    fn submit(&mut self) -> Status {
        self.flush();
        self.con.write_raw(b"\r\n");
        Status::Done
    }

    fn ctrlc_pressed(&mut self) -> Status {
        // Inject the `suspend` command as if the user typed it.
        self.line.clear();
        self.line.extend_from_slice(b"suspend");
        self.point = self.line.len();
        self.submit()
    }

    fn ctrlz_pressed(&mut self) -> Status {
        self.line.clear();
        self.line.extend_from_slice(b"exit");
        self.point = self.line.len();
        self.submit()
    }

    fn home_pressed(&mut self) -> Status {
        self.move_to(0);
        Status::Stay
    }

    fn end_pressed(&mut self) -> Status {
        self.move_to(self.line.len());
        Status::Stay
    }

    fn left_pressed(&mut self) -> Status {
        if self.point > 0 {
            self.move_to(self.point - 1);
        }
        Status::Stay
    }

    fn right_pressed(&mut self) -> Status {
        if self.point < self.line.len() {
            self.move_to(self.point + 1);
        }
        Status::Stay
    }

    fn del_pressed(&mut self) -> Status {
        if self.point < self.line.len() {
            let b = self.line.remove(self.point);
            self.redraw_tail(self.point, Self::display_width(b));
        }
        Status::Stay
    }

    fn backspace_pressed(&mut self) -> Status {
        if self.point > 0 {
            self.move_to(self.point - 1);
            return self.del_pressed();
        }
        Status::Stay
    }

    fn kill_line(&mut self) -> Status {
        let erase: usize = self.line[self.point..]
            .iter()
            .map(|&b| Self::display_width(b))
            .sum();
        self.line.truncate(self.point);
        self.redraw_tail(self.point, erase);
        Status::Stay
    }

    /// Esc-Backspace: delete the word before the cursor.
    fn bk_kill_word(&mut self) -> Status {
        let end = self.point;
        let mut start = end;
        while start > 0 && !self.line[start - 1].is_ascii_alphanumeric() {
            start -= 1;
        }
        while start > 0 && self.line[start - 1].is_ascii_alphanumeric() {
            start -= 1;
        }
        if start == end {
            return Status::Stay;
        }
        let removed: usize = self.line[start..end]
            .iter()
            .map(|&b| Self::display_width(b))
            .sum();
        self.move_to(start);
        self.line.drain(start..end);
        self.redraw_tail(self.point, removed);
        Status::Stay
    }

    fn clear_screen(&mut self) -> Status {
        self.flush();
        // Clearing the screen implies a capable terminal: turn colors on.
        self.con.set_color_mode(crate::console::ColorMode::On);
        self.con.write_raw(b"\x1b[H\x1b[2J");
        self.con.print(random_hint());
        self.put_str("\r\n");
        self.draw_prompt();
        self.redraw_tail(0, 0);
        Status::Stay
    }

    /// TAB: hop the cursor to the next token boundary, wrapping to the
    /// start of the line once the end is reached.
    fn tab_pressed(&mut self) -> Status {
        if self.point < self.line.len() {
            let mut i = self.point;
            while i < self.line.len() && !self.line[i].is_ascii_alphanumeric() {
                i += 1;
            }
            while i < self.line.len() && self.line[i].is_ascii_alphanumeric() {
                i += 1;
            }
            self.move_to(i);
        } else if self.point > 0 {
            self.move_to(0);
        }
        Status::Stay
    }

    fn h_prev(&mut self) -> Status {
        let entry = self.con.history().lock().prev().map(String::from);
        if let Some(entry) = entry {
            self.load_line(&entry);
        }
        Status::Stay
    }

    fn h_next(&mut self) -> Status {
        let entry = self.con.history().lock().next().map(String::from);
        match entry {
            Some(entry) => self.load_line(&entry),
            None => self.load_line(""),
        }
        Status::Stay
    }

    /// Ctrl-R: prompt for a pattern, then pull the newest matching history
    /// entry into the edit buffer.
    fn h_search(&mut self) -> Status {
        self.flush();
        self.con.write_raw(b"\r\nSearch: ");
        let mut pattern = Vec::new();
        loop {
            let Some(b) = self.read_byte() else {
                break;
            };
            match b {
                CR | LF => break,
                ESC | CTL_C => {
                    pattern.clear();
                    break;
                }
                CTL_H | DEL => {
                    if pattern.pop().is_some() {
                        self.con.write_raw(b"\x08 \x08");
                    }
                }
                _ if b >= 0x20 => {
                    pattern.push(b);
                    self.con.write_raw(&[b]);
                }
                _ => {}
            }
        }
        // The CR that ended the search line must not terminate the command
        // line that follows it on CR+LF terminals.
        self.swallow_lf = true;
        let pattern = String::from_utf8_lossy(&pattern).into_owned();
        let found = self.con.history().lock().search(&pattern).map(String::from);
        self.put_str("\r\n");
        self.draw_prompt();
        let current = String::from_utf8_lossy(&self.line).into_owned();
        self.redraw_tail(0, 0);
        match found {
            Some(hit) => self.load_line(&hit),
            None => self.load_line(&current),
        }
        Status::Stay
    }

    /// ESC: arrows, Esc-digits-Esc character codes, Esc-Backspace.
    fn meta(&mut self) -> Status {
        let Some(b) = self.read_byte() else {
            return Status::Stay;
        };
        match b {
            b'[' => {
                let Some(c) = self.read_byte() else {
                    return Status::Stay;
                };
                match c {
                    b'A' => self.h_prev(),
                    b'B' => self.h_next(),
                    b'C' => self.right_pressed(),
                    b'D' => self.left_pressed(),
                    b'3' => {
                        // ESC [ 3 ~ : forward delete
                        let _ = self.read_byte();
                        self.del_pressed()
                    }
                    _ => Status::Stay,
                }
            }
            CTL_H | DEL => self.bk_kill_word(),
            b'0'..=b'9' => {
                let mut code: u32 = (b - b'0') as u32;
                loop {
                    let Some(d) = self.read_byte() else {
                        return Status::Stay;
                    };
                    match d {
                        b'0'..=b'9' => code = code * 10 + (d - b'0') as u32,
                        ESC => {
                            self.insert_code((code & 0xff) as u8);
                            return Status::Stay;
                        }
                        _ => return Status::Stay,
                    }
                }
            }
            _ => Status::Stay,
        }
    }

    fn question_pressed(&mut self) -> Status {
        if self.point == 0 || QM_BYPASS.load(Ordering::Relaxed) != 0 {
            self.insert_byte(b'?');
            return Status::Stay;
        }
        if let Some(hook) = self.help_hook {
            self.flush();
            self.con.write_raw(b"\r\n");
            let current = String::from_utf8_lossy(&self.line).into_owned();
            hook(&current);
            self.redisplay();
        } else {
            self.insert_byte(b'?');
        }
        Status::Stay
    }
}

static KEYMAP: &[(u8, Handler)] = &[
    (CTL_C, Editor::ctrlc_pressed),
    (CTL_Z, Editor::ctrlz_pressed),
    (CTL_A, Editor::home_pressed),
    (CTL_E, Editor::end_pressed),
    (CTL_B, Editor::left_pressed),
    (CTL_F, Editor::right_pressed),
    (CTL_D, Editor::del_pressed),
    (CTL_H, Editor::backspace_pressed),
    (DEL, Editor::backspace_pressed),
    (LF, Editor::enter_lf),
    (CR, Editor::enter_cr),
    (CTL_K, Editor::kill_line),
    (CTL_L, Editor::clear_screen),
    (CTL_O, Editor::h_prev),
    (CTL_P, Editor::h_next),
    (CTL_R, Editor::h_search),
    (ESC, Editor::meta),
    (TAB, Editor::tab_pressed),
];

static HINTS: &[&str] = &[
    "% <i>Tip</>: append \"&\" to any command to run it in the background\r\n",
    "% <i>Tip</>: press <TAB> to hop between arguments\r\n",
    "% <i>Tip</>: Ctrl+R searches the command history, \"^\" anchors the match\r\n",
    "% <i>Tip</>: every command can be shortened: \"seq\" works for \"sequence\"\r\n",
    "% <i>Tip</>: \"?\" after a command name shows its manual page\r\n",
    "% <i>Tip</>: \"pin 2 save\" snapshots a pin, \"pin 2 load\" restores it\r\n",
];

fn random_hint() -> &'static str {
    let tick = espshell_lib::micros() as usize;
    HINTS[tick % HINTS.len()]
}
