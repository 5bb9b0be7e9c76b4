//! GPIO collaborator interface.
//!
//! Pin numbers are dense `0..pin_count()` indices covering two 32-bit level
//! registers, so a full snapshot of every input is two register reads — the
//! event engine's ISR depends on that (`levels`).

use bitflags::bitflags;

use crate::error::HalResult;

bitflags! {
    /// Pin mode bits, accumulated by the `pin` command's mode verbs.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct PinFlags: u8 {
        const INPUT      = 1 << 0;
        const OUTPUT     = 1 << 1;
        const PULL_UP    = 1 << 2;
        const PULL_DOWN  = 1 << 3;
        const OPEN_DRAIN = 1 << 4;
    }
}

/// What a pin is currently bound to, as reported by the peripheral manager.
/// Consumed by `pin save` / `pin load`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BusKind {
    #[default]
    Gpio,
    Pwm,
    Uart,
    I2c,
    Spi,
    Rmt,
    Other,
}

/// An any-edge interrupt handler. `ctx` is the value passed at install time
/// (the engine passes the pin number). Runs in ISR context: no blocking, no
/// allocation.
pub type EdgeIsr = fn(ctx: usize);

pub trait GpioDriver: Send + Sync {
    fn pin_count(&self) -> u8;

    /// Pins that physically cannot drive an output.
    fn is_input_only(&self, pin: u8) -> bool;

    /// Pins claimed by the system (flash, PSRAM, …). The shell warns before
    /// touching them.
    fn is_reserved(&self, pin: u8) -> bool;

    fn set_direction(&self, pin: u8, input: bool, output: bool) -> HalResult<()>;
    fn set_pull(&self, pin: u8, up: bool, down: bool) -> HalResult<()>;
    fn set_open_drain(&self, pin: u8, enabled: bool) -> HalResult<()>;

    /// Enable the input path without touching the rest of the configuration.
    /// Condition pins must be readable even when driven by a peripheral.
    fn input_enable(&self, pin: u8) -> HalResult<()>;

    /// Apply an accumulated flag set in one call.
    fn set_mode(&self, pin: u8, flags: PinFlags) -> HalResult<()> {
        self.set_direction(
            pin,
            flags.contains(PinFlags::INPUT),
            flags.contains(PinFlags::OUTPUT),
        )?;
        self.set_pull(
            pin,
            flags.contains(PinFlags::PULL_UP),
            flags.contains(PinFlags::PULL_DOWN),
        )?;
        self.set_open_drain(pin, flags.contains(PinFlags::OPEN_DRAIN))
    }

    /// Current mode flags, for snapshots.
    fn mode(&self, pin: u8) -> PinFlags;

    fn set_level(&self, pin: u8, high: bool) -> HalResult<()>;
    fn get_level(&self, pin: u8) -> bool;

    /// Both 32-bit input registers, read back-to-back.
    fn levels(&self) -> (u32, u32);

    fn analog_read(&self, pin: u8) -> HalResult<u32>;

    /// Freeze / unfreeze the pin state across sleep.
    fn hold(&self, pin: u8) -> HalResult<()>;
    fn release(&self, pin: u8) -> HalResult<()>;

    /// Detach the pin from whatever peripheral owns it and hand it back to
    /// the GPIO matrix as a plain pin.
    fn reset(&self, pin: u8) -> HalResult<()>;

    /// Peripheral currently bound to the pin.
    fn bus_kind(&self, pin: u8) -> BusKind;

    /// GPIO-matrix routing. `matrix_in` routes the peripheral input signal
    /// `signal` from this pin; `matrix_out` routes output signal `signal`
    /// to it.
    fn matrix_in(&self, pin: u8, signal: u32) -> HalResult<()>;
    fn matrix_out(&self, pin: u8, signal: u32) -> HalResult<()>;

    /// Current (input, output) matrix signals.
    fn matrix_routing(&self, pin: u8) -> (u32, u32);

    /// Select IO-MUX function `Some(k)`, or `None` for "pad select gpio".
    fn iomux_select(&self, pin: u8, function: Option<u8>) -> HalResult<()>;

    /// Currently selected IO-MUX function, if any.
    fn iomux_function(&self, pin: u8) -> Option<u8>;

    fn install_anyedge_isr(&self, pin: u8, isr: EdgeIsr, ctx: usize) -> HalResult<()>;
    fn remove_isr(&self, pin: u8) -> HalResult<()>;
    fn enable_interrupt(&self, pin: u8) -> HalResult<()>;
    fn disable_interrupt(&self, pin: u8) -> HalResult<()>;
}

/// Constant-zero input signal index used when disconnecting matrix routing.
pub const MATRIX_SIGNAL_ZERO: u32 = 0x100;

/// "Simple GPIO output" matrix signal.
pub const MATRIX_SIGNAL_GPIO: u32 = 0x200;
