//! Scripted console device: tests queue input bytes, the shell's output is
//! captured for assertions.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::console::ConsoleDevice;

pub struct ScriptedConsole {
    input: Mutex<VecDeque<u8>>,
    input_cv: Condvar,
    output: Mutex<Vec<u8>>,
    up: AtomicBool,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self {
            input: Mutex::new(VecDeque::new()),
            input_cv: Condvar::new(),
            output: Mutex::new(Vec::new()),
            up: AtomicBool::new(true),
        }
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::Release);
    }

    pub fn push_bytes(&self, bytes: &[u8]) {
        let mut input = self.input.lock().unwrap();
        input.extend(bytes.iter().copied());
        self.input_cv.notify_all();
    }

    /// Queue a command line followed by CR, the way a terminal sends it.
    pub fn push_line(&self, line: &str) {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\r');
        self.push_bytes(&bytes);
    }

    /// Everything the shell printed so far, markup already resolved.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.lock().unwrap()).into_owned()
    }

    pub fn clear_output(&self) {
        self.output.lock().unwrap().clear();
    }

    /// Block until `needle` shows up in the captured output or the timeout
    /// expires. Returns whether it was seen.
    pub fn wait_for(&self, needle: &str, timeout_ms: u64) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.output().contains(needle) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Default for ScriptedConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleDevice for ScriptedConsole {
    fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    fn available(&self) -> i32 {
        if !self.is_up() {
            return -1;
        }
        self.input.lock().unwrap().len() as i32
    }

    fn read_bytes(&self, buf: &mut [u8], timeout_ms: u32) -> i32 {
        if !self.is_up() {
            return -1;
        }
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        let mut input = self.input.lock().unwrap();
        while input.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return 0;
            }
            let (guard, _) = self.input_cv.wait_timeout(input, deadline - now).unwrap();
            input = guard;
        }
        let mut n = 0;
        while n < buf.len() {
            match input.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n as i32
    }

    fn write_bytes(&self, buf: &[u8]) -> usize {
        self.output.lock().unwrap().extend_from_slice(buf);
        buf.len()
    }
}
