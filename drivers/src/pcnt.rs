//! Pulse-counter collaborator interface.

use crate::error::HalResult;

/// The counter register overflows at this count; the driver accumulates
/// overflows so `read` plus `overflows` reconstructs the 64-bit total.
pub const PCNT_OVERFLOW: u32 = 20_000;

pub trait PcntDriver: Send + Sync {
    fn unit_count(&self) -> u8;

    /// Claim a free unit. The `count` command holds one unit per running
    /// measurement.
    fn claim_unit(&self) -> HalResult<u8>;
    fn release_unit(&self, unit: u8) -> HalResult<()>;

    /// Route `pin`'s edges into `unit`.
    fn bind(&self, unit: u8, pin: u8) -> HalResult<()>;

    fn start(&self, unit: u8) -> HalResult<()>;
    fn stop(&self, unit: u8) -> HalResult<()>;
    fn clear(&self, unit: u8) -> HalResult<()>;

    /// Current counter register value.
    fn read(&self, unit: u8) -> i32;

    /// Overflow interrupts seen since the last `clear`.
    fn overflows(&self, unit: u8) -> u32;

    /// Glitch filter length in nanoseconds (0 disables).
    fn set_filter(&self, unit: u8, ns: u32) -> HalResult<()>;
}
