//! Console byte-stream collaborator interface.
//!
//! One device is active at a time (UART index or USB-CDC); the terminal
//! layer owns the switch. 8-bit transparent, no flow control assumed.

pub trait ConsoleDevice: Send + Sync {
    /// Is the underlying device initialized and usable?
    fn is_up(&self) -> bool;

    /// Bytes ready to read right now, or a negative value when the device
    /// failed (driver uninstalled, port gone).
    fn available(&self) -> i32;

    /// Read up to `buf.len()` bytes, waiting at most `timeout_ms`. Short
    /// reads are fine. Returns bytes read, or a negative value on failure.
    fn read_bytes(&self, buf: &mut [u8], timeout_ms: u32) -> i32;

    /// Best-effort write. Returns bytes accepted.
    fn write_bytes(&self, buf: &[u8]) -> usize;
}
