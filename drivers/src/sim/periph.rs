//! Recording fakes for PWM, RMT and the pulse counter.

use alloc::vec::Vec;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{HalError, HalResult};
use crate::pcnt::PcntDriver;
use crate::pwm::PwmDriver;
use crate::rmt::{RmtDriver, RmtSymbol};

// ---------------------------------------------------------------------------
// PWM
// ---------------------------------------------------------------------------

const SIM_PWM_RESOLUTION: u8 = 10;

struct PwmState {
    freq: u32,
    duty: f32,
    channel: u8,
}

pub struct SimPwm {
    pins: Mutex<HashMap<u8, PwmState>>,
    next_channel: AtomicU8,
}

impl SimPwm {
    pub fn new() -> Self {
        Self {
            pins: Mutex::new(HashMap::new()),
            next_channel: AtomicU8::new(0),
        }
    }
}

impl Default for SimPwm {
    fn default() -> Self {
        Self::new()
    }
}

impl PwmDriver for SimPwm {
    fn attach(&self, pin: u8, freq_hz: u32, duty: f32) -> HalResult<u8> {
        if freq_hz == 0 || !(0.0..=1.0).contains(&duty) {
            return Err(HalError::InvalidArg);
        }
        let mut pins = self.pins.lock().unwrap();
        let channel = match pins.get(&pin) {
            Some(state) => state.channel,
            None => self.next_channel.fetch_add(1, Ordering::Relaxed) % 8,
        };
        pins.insert(
            pin,
            PwmState {
                freq: freq_hz,
                duty,
                channel,
            },
        );
        Ok(channel)
    }

    fn detach(&self, pin: u8) -> HalResult<()> {
        self.pins.lock().unwrap().remove(&pin);
        Ok(())
    }

    fn read_freq(&self, pin: u8) -> u32 {
        self.pins.lock().unwrap().get(&pin).map_or(0, |s| s.freq)
    }

    fn read_duty(&self, pin: u8) -> u32 {
        let max = (1u32 << SIM_PWM_RESOLUTION) - 1;
        self.pins
            .lock()
            .unwrap()
            .get(&pin)
            .map_or(0, |s| (s.duty * max as f32) as u32)
    }

    fn resolution_bits(&self, _pin: u8) -> u8 {
        SIM_PWM_RESOLUTION
    }

    fn channel(&self, pin: u8) -> Option<u8> {
        self.pins.lock().unwrap().get(&pin).map(|s| s.channel)
    }
}

// ---------------------------------------------------------------------------
// RMT
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxMode {
    Once,
    Repeated(u32),
    Looping,
}

#[derive(Clone, Debug)]
pub struct RmtTransmission {
    pub pin: u8,
    pub tick_hz: u32,
    pub symbols: Vec<RmtSymbol>,
    pub mode: TxMode,
    pub eot_high: bool,
    pub carrier: Option<(u32, f32, bool)>,
}

#[derive(Clone, Default)]
struct RmtPin {
    tick_hz: u32,
    eot_high: bool,
    carrier: Option<(u32, f32, bool)>,
}

pub struct SimRmt {
    pins: Mutex<HashMap<u8, RmtPin>>,
    log: Mutex<Vec<RmtTransmission>>,
}

impl SimRmt {
    pub fn new() -> Self {
        Self {
            pins: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Transmissions recorded so far, oldest first.
    pub fn transmissions(&self) -> Vec<RmtTransmission> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, pin: u8, symbols: &[RmtSymbol], mode: TxMode) -> HalResult<()> {
        let pins = self.pins.lock().unwrap();
        let state = pins.get(&pin).ok_or(HalError::NotReady)?;
        self.log.lock().unwrap().push(RmtTransmission {
            pin,
            tick_hz: state.tick_hz,
            symbols: symbols.to_vec(),
            mode,
            eot_high: state.eot_high,
            carrier: state.carrier,
        });
        Ok(())
    }
}

impl Default for SimRmt {
    fn default() -> Self {
        Self::new()
    }
}

impl RmtDriver for SimRmt {
    fn init(&self, pin: u8, tick_hz: u32) -> HalResult<()> {
        if tick_hz == 0 {
            return Err(HalError::InvalidArg);
        }
        let mut pins = self.pins.lock().unwrap();
        let entry = pins.entry(pin).or_default();
        entry.tick_hz = tick_hz;
        Ok(())
    }

    fn deinit(&self, pin: u8) -> HalResult<()> {
        self.pins.lock().unwrap().remove(&pin);
        Ok(())
    }

    fn set_carrier(&self, pin: u8, freq_hz: u32, duty: f32, on_high: bool) -> HalResult<()> {
        let mut pins = self.pins.lock().unwrap();
        let entry = pins.get_mut(&pin).ok_or(HalError::NotReady)?;
        entry.carrier = if freq_hz == 0 {
            None
        } else {
            Some((freq_hz, duty, on_high))
        };
        Ok(())
    }

    fn set_eot_level(&self, pin: u8, high: bool) -> HalResult<()> {
        let mut pins = self.pins.lock().unwrap();
        let entry = pins.get_mut(&pin).ok_or(HalError::NotReady)?;
        entry.eot_high = high;
        Ok(())
    }

    fn write(&self, pin: u8, symbols: &[RmtSymbol]) -> HalResult<()> {
        self.record(pin, symbols, TxMode::Once)
    }

    fn write_repeated(&self, pin: u8, symbols: &[RmtSymbol], count: u32) -> HalResult<()> {
        self.record(pin, symbols, TxMode::Repeated(count))
    }

    fn write_looping(&self, pin: u8, symbols: &[RmtSymbol]) -> HalResult<()> {
        self.record(pin, symbols, TxMode::Looping)
    }
}

// ---------------------------------------------------------------------------
// Pulse counter
// ---------------------------------------------------------------------------

const SIM_PCNT_UNITS: usize = 8;

#[derive(Clone, Copy, Default)]
struct PcntUnit {
    claimed: bool,
    running: bool,
    pin: Option<u8>,
    count: i32,
    overflows: u32,
    filter_ns: u32,
}

pub struct SimPcnt {
    units: Mutex<[PcntUnit; SIM_PCNT_UNITS]>,
}

impl SimPcnt {
    pub fn new() -> Self {
        Self {
            units: Mutex::new([PcntUnit::default(); SIM_PCNT_UNITS]),
        }
    }

    /// Configured glitch-filter length, ns.
    pub fn filter_ns(&self, unit: u8) -> u32 {
        self.units.lock().unwrap()[unit as usize].filter_ns
    }

    /// Test-side pulse injection into whichever running unit watches `pin`.
    pub fn inject(&self, pin: u8, pulses: i32) {
        let mut units = self.units.lock().unwrap();
        for unit in units.iter_mut() {
            if unit.running && unit.pin == Some(pin) {
                unit.count = unit.count.saturating_add(pulses);
            }
        }
    }

    fn unit_mut<R>(&self, unit: u8, f: impl FnOnce(&mut PcntUnit) -> R) -> HalResult<R> {
        let mut units = self.units.lock().unwrap();
        let u = units.get_mut(unit as usize).ok_or(HalError::InvalidArg)?;
        Ok(f(u))
    }
}

impl Default for SimPcnt {
    fn default() -> Self {
        Self::new()
    }
}

impl PcntDriver for SimPcnt {
    fn unit_count(&self) -> u8 {
        SIM_PCNT_UNITS as u8
    }

    fn claim_unit(&self) -> HalResult<u8> {
        let mut units = self.units.lock().unwrap();
        for (i, unit) in units.iter_mut().enumerate() {
            if !unit.claimed {
                *unit = PcntUnit {
                    claimed: true,
                    ..PcntUnit::default()
                };
                return Ok(i as u8);
            }
        }
        Err(HalError::NoResources)
    }

    fn release_unit(&self, unit: u8) -> HalResult<()> {
        self.unit_mut(unit, |u| *u = PcntUnit::default())
    }

    fn bind(&self, unit: u8, pin: u8) -> HalResult<()> {
        self.unit_mut(unit, |u| u.pin = Some(pin))
    }

    fn start(&self, unit: u8) -> HalResult<()> {
        self.unit_mut(unit, |u| u.running = true)
    }

    fn stop(&self, unit: u8) -> HalResult<()> {
        self.unit_mut(unit, |u| u.running = false)
    }

    fn clear(&self, unit: u8) -> HalResult<()> {
        self.unit_mut(unit, |u| {
            u.count = 0;
            u.overflows = 0;
        })
    }

    fn read(&self, unit: u8) -> i32 {
        self.units
            .lock()
            .unwrap()
            .get(unit as usize)
            .map_or(0, |u| u.count)
    }

    fn overflows(&self, unit: u8) -> u32 {
        self.units
            .lock()
            .unwrap()
            .get(unit as usize)
            .map_or(0, |u| u.overflows)
    }

    fn set_filter(&self, unit: u8, ns: u32) -> HalResult<()> {
        self.unit_mut(unit, |u| u.filter_ns = ns)
    }
}
