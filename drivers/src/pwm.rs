//! PWM generator collaborator interface.

use crate::error::HalResult;

/// Upper frequency bound accepted by the `pwm` command. Must stay well below
/// the peripheral clock.
pub const PWM_MAX_FREQUENCY: u32 = 10_000_000;

pub trait PwmDriver: Send + Sync {
    /// Start PWM on `pin`. `duty` is relative, `0.0..=1.0`. Returns the
    /// hardware channel that was bound.
    fn attach(&self, pin: u8, freq_hz: u32, duty: f32) -> HalResult<u8>;

    fn detach(&self, pin: u8) -> HalResult<()>;

    /// Frequency currently generated on `pin`, 0 when inactive.
    fn read_freq(&self, pin: u8) -> u32;

    /// Absolute duty value currently programmed.
    fn read_duty(&self, pin: u8) -> u32;

    /// Duty resolution in bits for the pin's channel.
    fn resolution_bits(&self, pin: u8) -> u8;

    /// Channel bound to `pin`, if any.
    fn channel(&self, pin: u8) -> Option<u8>;
}
