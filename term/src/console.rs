//! The process console: one active byte-stream device, color and echo state,
//! and the markup-translating print path.
//!
//! Exactly one device is active at a time; `tty N` switches between devices
//! registered at startup. Switching is atomic from the shell's point of view
//! (a spin lock guards the active handle).

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicI8, AtomicU8, Ordering};

use espshell_drivers::ConsoleDevice;
use spin::{Mutex, Once};

use crate::history::History;
use crate::markup;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Off,
    On,
    /// Off until the first control byte arrives from the user, which is
    /// taken as evidence of a capable terminal.
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EchoMode {
    /// No echo, no output at all.
    Silent,
    /// User input is not echoed; command output still prints.
    Off,
    On,
}

const COLOR_OFF: u8 = 0;
const COLOR_ON: u8 = 1;
const COLOR_AUTO: u8 = 2;

pub struct Console {
    devices: Mutex<Vec<(u8, Arc<dyn ConsoleDevice>)>>,
    active: Mutex<(u8, Arc<dyn ConsoleDevice>)>,
    color: AtomicU8,
    echo: AtomicI8,
    echo_saved: AtomicI8,
    /// Set when the editor consumes a CR; used to swallow the LF half of a
    /// CR+LF pair so it does not count as "any key" for a running command.
    seen_cr: AtomicBool,
    history: Mutex<History>,
    history_enabled: AtomicBool,
}

impl Console {
    pub fn new(index: u8, device: Arc<dyn ConsoleDevice>) -> Arc<Self> {
        let con = Arc::new(Self {
            devices: Mutex::new(Vec::new()),
            active: Mutex::new((index, Arc::clone(&device))),
            color: AtomicU8::new(COLOR_AUTO),
            echo: AtomicI8::new(1),
            echo_saved: AtomicI8::new(1),
            seen_cr: AtomicBool::new(false),
            history: Mutex::new(History::new()),
            history_enabled: AtomicBool::new(true),
        });
        con.register_device(index, device);
        con
    }

    /// Make a device selectable via `tty N`.
    pub fn register_device(&self, index: u8, device: Arc<dyn ConsoleDevice>) {
        let mut devices = self.devices.lock();
        devices.retain(|(i, _)| *i != index);
        devices.push((index, device));
    }

    /// Switch the console to device `index`. Returns false if no such
    /// device was registered.
    pub fn select(&self, index: u8) -> bool {
        let devices = self.devices.lock();
        if let Some((_, dev)) = devices.iter().find(|(i, _)| *i == index) {
            *self.active.lock() = (index, Arc::clone(dev));
            true
        } else {
            false
        }
    }

    pub fn active_index(&self) -> u8 {
        self.active.lock().0
    }

    fn device(&self) -> Arc<dyn ConsoleDevice> {
        Arc::clone(&self.active.lock().1)
    }

    pub fn is_up(&self) -> bool {
        self.device().is_up()
    }

    pub fn available(&self) -> i32 {
        self.device().available()
    }

    pub fn read_bytes(&self, buf: &mut [u8], timeout_ms: u32) -> i32 {
        self.device().read_bytes(buf, timeout_ms)
    }

    /// Raw write, no markup processing, ignores echo state. The editor's
    /// screen buffer goes through here.
    pub fn write_raw(&self, bytes: &[u8]) {
        self.device().write_bytes(bytes);
    }

    /// Print `text`, translating or stripping markup tags. Suppressed
    /// entirely in silent mode.
    pub fn print(&self, text: &str) {
        if self.echo_mode() == EchoMode::Silent {
            return;
        }
        let mut out = Vec::with_capacity(text.len());
        markup::render(&mut out, text, self.color_enabled());
        self.write_raw(&out);
    }

    pub fn print_args(&self, args: fmt::Arguments<'_>) {
        let mut s = String::new();
        let _ = fmt::Write::write_fmt(&mut s, args);
        self.print(&s);
    }

    // -- color state ---------------------------------------------------

    pub fn color_mode(&self) -> ColorMode {
        match self.color.load(Ordering::Relaxed) {
            COLOR_ON => ColorMode::On,
            COLOR_AUTO => ColorMode::Auto,
            _ => ColorMode::Off,
        }
    }

    pub fn set_color_mode(&self, mode: ColorMode) {
        let raw = match mode {
            ColorMode::Off => COLOR_OFF,
            ColorMode::On => COLOR_ON,
            ColorMode::Auto => COLOR_AUTO,
        };
        self.color.store(raw, Ordering::Relaxed);
    }

    pub fn color_enabled(&self) -> bool {
        self.color.load(Ordering::Relaxed) == COLOR_ON
    }

    /// Called with every byte the user types. In auto mode, the first
    /// control byte (not CR, LF or TAB) upgrades coloring to "on" — dumb
    /// serial monitors send printable text only.
    pub fn note_user_byte(&self, byte: u8) {
        if byte < 0x20 && !matches!(byte, b'\r' | b'\n' | b'\t') {
            let _ = self.color.compare_exchange(
                COLOR_AUTO,
                COLOR_ON,
                Ordering::Relaxed,
                Ordering::Relaxed,
            );
        }
    }

    // -- echo state ----------------------------------------------------

    pub fn echo_mode(&self) -> EchoMode {
        match self.echo.load(Ordering::Relaxed) {
            i8::MIN..=-1 => EchoMode::Silent,
            0 => EchoMode::Off,
            _ => EchoMode::On,
        }
    }

    pub fn set_echo_mode(&self, mode: EchoMode) {
        let raw = match mode {
            EchoMode::Silent => -1,
            EchoMode::Off => 0,
            EchoMode::On => 1,
        };
        self.echo.store(raw, Ordering::Relaxed);
    }

    /// Temporarily disable echo (leading-`@` password entry). Balanced by
    /// [`Console::pop_echo`].
    pub fn push_echo_off(&self) {
        self.echo_saved
            .store(self.echo.load(Ordering::Relaxed), Ordering::Relaxed);
        self.echo.store(0, Ordering::Relaxed);
    }

    pub fn pop_echo(&self) {
        self.echo
            .store(self.echo_saved.load(Ordering::Relaxed), Ordering::Relaxed);
    }

    // -- history -------------------------------------------------------

    pub fn history(&self) -> &Mutex<History> {
        &self.history
    }

    pub fn history_enabled(&self) -> bool {
        self.history_enabled.load(Ordering::Relaxed)
    }

    pub fn set_history_enabled(&self, on: bool) {
        self.history_enabled.store(on, Ordering::Relaxed);
    }

    // -- keypress detection --------------------------------------------

    pub fn note_cr(&self) {
        self.seen_cr.store(true, Ordering::Relaxed);
    }

    /// Any key pressed? Consumes one pending byte. The LF of a CR+LF pair
    /// is not counted, so a command started by CR is not immediately
    /// interrupted by its own line terminator.
    pub fn anykey_pressed(&self) -> bool {
        if self.available() > 0 {
            let mut b = [0u8; 1];
            if self.read_bytes(&mut b, 0) >= 1 {
                if b[0] == b'\n' {
                    return !self.seen_cr.swap(false, Ordering::Relaxed);
                }
                return true;
            }
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Global hookup for the log backend
// ---------------------------------------------------------------------------

static LOG_CONSOLE: Once<Arc<Console>> = Once::new();

fn console_log_backend(args: fmt::Arguments<'_>) {
    if let Some(con) = LOG_CONSOLE.get() {
        con.print(&format!("% {args}\r\n"));
    }
}

/// Route `espshell_lib::log` output to this console. Called once at startup.
pub fn install_log_backend(con: &Arc<Console>) {
    LOG_CONSOLE.call_once(|| Arc::clone(con));
    espshell_lib::register_log_backend(console_log_backend);
}

/// Print through the log-backend console. For plain-function contexts (the
/// editor's help hook) that cannot carry a console reference.
pub fn log_console_print(text: &str) {
    if let Some(con) = LOG_CONSOLE.get() {
        con.print(text);
    }
}

/// Formatted print to a console: `cprintf!(con, "fmt", args...)`.
#[macro_export]
macro_rules! cprintf {
    ($con:expr, $($arg:tt)*) => {
        $con.print_args(::core::format_args!($($arg)*))
    };
}
