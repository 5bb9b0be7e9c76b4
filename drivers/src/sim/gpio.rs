//! Simulated 64-pin GPIO bank.

use alloc::vec;
use alloc::vec::Vec;
use std::sync::Mutex;

use crate::error::{HalError, HalResult};
use crate::gpio::{BusKind, EdgeIsr, GpioDriver, MATRIX_SIGNAL_GPIO, PinFlags};

#[derive(Clone, Copy)]
struct PinState {
    flags: PinFlags,
    level: bool,
    isr: Option<(EdgeIsr, usize)>,
    int_enabled: bool,
    iomux: Option<u8>,
    matrix: (u32, u32),
    bus: BusKind,
    held: bool,
    input_only: bool,
    reserved: bool,
}

impl PinState {
    const fn new() -> Self {
        Self {
            flags: PinFlags::empty(),
            level: false,
            isr: None,
            int_enabled: false,
            iomux: None,
            matrix: (0, MATRIX_SIGNAL_GPIO),
            bus: BusKind::Gpio,
            held: false,
            input_only: false,
            reserved: false,
        }
    }
}

pub struct SimGpio {
    pins: Mutex<Vec<PinState>>,
}

const PIN_COUNT: usize = 64;

impl SimGpio {
    pub fn new() -> Self {
        Self {
            pins: Mutex::new(vec![PinState::new(); PIN_COUNT]),
        }
    }

    /// Mark pins as input-only / reserved for tests that need the guard
    /// paths.
    pub fn set_input_only(&self, pin: u8) {
        self.pins.lock().unwrap()[pin as usize].input_only = true;
    }

    pub fn set_reserved(&self, pin: u8) {
        self.pins.lock().unwrap()[pin as usize].reserved = true;
    }

    fn check(&self, pin: u8) -> HalResult<()> {
        if (pin as usize) < PIN_COUNT {
            Ok(())
        } else {
            Err(HalError::InvalidArg)
        }
    }

    /// Set the pin level and, on a change, dispatch the installed any-edge
    /// ISR the way hardware would. The handler runs on the calling thread
    /// with the pin lock released.
    fn write_level(&self, pin: u8, high: bool) {
        let isr = {
            let mut pins = self.pins.lock().unwrap();
            let p = &mut pins[pin as usize];
            if p.level == high {
                None
            } else {
                p.level = high;
                if p.int_enabled { p.isr } else { None }
            }
        };
        if let Some((isr, ctx)) = isr {
            isr(ctx);
        }
    }

    /// Test-side edge injection: external signal driving the pin.
    pub fn drive(&self, pin: u8, high: bool) {
        self.write_level(pin, high);
    }

    /// Is the pin frozen by `hold`?
    pub fn is_held(&self, pin: u8) -> bool {
        self.pins.lock().unwrap()[pin as usize].held
    }

    /// Test-side pulse train: `count` full low-high-low cycles.
    pub fn pulse(&self, pin: u8, count: u32) {
        for _ in 0..count {
            self.drive(pin, true);
            self.drive(pin, false);
        }
    }
}

impl Default for SimGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioDriver for SimGpio {
    fn pin_count(&self) -> u8 {
        PIN_COUNT as u8
    }

    fn is_input_only(&self, pin: u8) -> bool {
        (pin as usize) < PIN_COUNT && self.pins.lock().unwrap()[pin as usize].input_only
    }

    fn is_reserved(&self, pin: u8) -> bool {
        (pin as usize) < PIN_COUNT && self.pins.lock().unwrap()[pin as usize].reserved
    }

    fn set_direction(&self, pin: u8, input: bool, output: bool) -> HalResult<()> {
        self.check(pin)?;
        if output && self.is_input_only(pin) {
            return Err(HalError::NotSupported);
        }
        let mut pins = self.pins.lock().unwrap();
        let p = &mut pins[pin as usize];
        p.flags.set(PinFlags::INPUT, input);
        p.flags.set(PinFlags::OUTPUT, output);
        Ok(())
    }

    fn set_pull(&self, pin: u8, up: bool, down: bool) -> HalResult<()> {
        self.check(pin)?;
        let mut pins = self.pins.lock().unwrap();
        let p = &mut pins[pin as usize];
        p.flags.set(PinFlags::PULL_UP, up);
        p.flags.set(PinFlags::PULL_DOWN, down);
        Ok(())
    }

    fn set_open_drain(&self, pin: u8, enabled: bool) -> HalResult<()> {
        self.check(pin)?;
        let mut pins = self.pins.lock().unwrap();
        pins[pin as usize].flags.set(PinFlags::OPEN_DRAIN, enabled);
        Ok(())
    }

    fn input_enable(&self, pin: u8) -> HalResult<()> {
        self.check(pin)?;
        let mut pins = self.pins.lock().unwrap();
        pins[pin as usize].flags.insert(PinFlags::INPUT);
        Ok(())
    }

    fn mode(&self, pin: u8) -> PinFlags {
        self.pins.lock().unwrap()[pin as usize].flags
    }

    fn set_level(&self, pin: u8, high: bool) -> HalResult<()> {
        self.check(pin)?;
        if self.is_input_only(pin) {
            return Err(HalError::NotSupported);
        }
        self.write_level(pin, high);
        Ok(())
    }

    fn get_level(&self, pin: u8) -> bool {
        self.pins.lock().unwrap()[pin as usize].level
    }

    fn levels(&self) -> (u32, u32) {
        let pins = self.pins.lock().unwrap();
        let mut lo = 0u32;
        let mut hi = 0u32;
        for (i, p) in pins.iter().enumerate() {
            if p.level {
                if i < 32 {
                    lo |= 1 << i;
                } else {
                    hi |= 1 << (i - 32);
                }
            }
        }
        (lo, hi)
    }

    fn analog_read(&self, pin: u8) -> HalResult<u32> {
        self.check(pin)?;
        // Digital rail voltage expressed on the 12-bit ADC scale.
        Ok(if self.get_level(pin) { 4095 } else { 0 })
    }

    fn hold(&self, pin: u8) -> HalResult<()> {
        self.check(pin)?;
        self.pins.lock().unwrap()[pin as usize].held = true;
        Ok(())
    }

    fn release(&self, pin: u8) -> HalResult<()> {
        self.check(pin)?;
        self.pins.lock().unwrap()[pin as usize].held = false;
        Ok(())
    }

    fn reset(&self, pin: u8) -> HalResult<()> {
        self.check(pin)?;
        let mut pins = self.pins.lock().unwrap();
        let p = &mut pins[pin as usize];
        p.flags = PinFlags::empty();
        p.iomux = None;
        p.matrix = (0, MATRIX_SIGNAL_GPIO);
        p.bus = BusKind::Gpio;
        Ok(())
    }

    fn bus_kind(&self, pin: u8) -> BusKind {
        self.pins.lock().unwrap()[pin as usize].bus
    }

    fn matrix_in(&self, pin: u8, signal: u32) -> HalResult<()> {
        self.check(pin)?;
        self.pins.lock().unwrap()[pin as usize].matrix.0 = signal;
        Ok(())
    }

    fn matrix_out(&self, pin: u8, signal: u32) -> HalResult<()> {
        self.check(pin)?;
        self.pins.lock().unwrap()[pin as usize].matrix.1 = signal;
        Ok(())
    }

    fn matrix_routing(&self, pin: u8) -> (u32, u32) {
        self.pins.lock().unwrap()[pin as usize].matrix
    }

    fn iomux_select(&self, pin: u8, function: Option<u8>) -> HalResult<()> {
        self.check(pin)?;
        self.pins.lock().unwrap()[pin as usize].iomux = function;
        Ok(())
    }

    fn iomux_function(&self, pin: u8) -> Option<u8> {
        self.pins.lock().unwrap()[pin as usize].iomux
    }

    fn install_anyedge_isr(&self, pin: u8, isr: EdgeIsr, ctx: usize) -> HalResult<()> {
        self.check(pin)?;
        self.pins.lock().unwrap()[pin as usize].isr = Some((isr, ctx));
        Ok(())
    }

    fn remove_isr(&self, pin: u8) -> HalResult<()> {
        self.check(pin)?;
        self.pins.lock().unwrap()[pin as usize].isr = None;
        Ok(())
    }

    fn enable_interrupt(&self, pin: u8) -> HalResult<()> {
        self.check(pin)?;
        self.pins.lock().unwrap()[pin as usize].int_enabled = true;
        Ok(())
    }

    fn disable_interrupt(&self, pin: u8) -> HalResult<()> {
        self.check(pin)?;
        self.pins.lock().unwrap()[pin as usize].int_enabled = false;
        Ok(())
    }
}
