//! Shared fixture: a complete shell wired to the sim drivers.

use alloc::sync::Arc;
use alloc::vec;

use espshell_drivers::sim::{
    MemStorage, ScriptedConsole, SimGpio, SimPcnt, SimPwm, SimRmt, SimTaskService,
    SimTimerService, SimUart, install_host_hooks,
};
use espshell_drivers::ConsoleDevice;

use crate::env::Env;
use crate::shell::{Shell, ShellServices};

pub struct Rig {
    pub sh: Arc<Shell>,
    pub con: Arc<ScriptedConsole>,
    pub gpio: Arc<SimGpio>,
    pub pwm: Arc<SimPwm>,
    pub rmt: Arc<SimRmt>,
    pub pcnt: Arc<SimPcnt>,
    pub uart: Arc<SimUart>,
    pub storage: Arc<MemStorage>,
}

pub fn rig() -> Rig {
    install_host_hooks();
    let con = Arc::new(ScriptedConsole::new());
    let gpio = Arc::new(SimGpio::new());
    let pwm = Arc::new(SimPwm::new());
    let rmt = Arc::new(SimRmt::new());
    let pcnt = Arc::new(SimPcnt::new());
    let uart = Arc::new(SimUart::new());
    let storage = Arc::new(MemStorage::new());

    let console_dev: Arc<dyn ConsoleDevice> = con.clone();
    let gpio_dev: Arc<dyn espshell_drivers::GpioDriver> = gpio.clone();
    let pwm_dev: Arc<dyn espshell_drivers::PwmDriver> = pwm.clone();
    let rmt_dev: Arc<dyn espshell_drivers::RmtDriver> = rmt.clone();
    let pcnt_dev: Arc<dyn espshell_drivers::PcntDriver> = pcnt.clone();
    let uart_dev: Arc<dyn espshell_drivers::UartDriver> = uart.clone();
    let storage_dev: Arc<dyn espshell_drivers::Storage> = storage.clone();
    let sh = Shell::new(ShellServices {
        console_devices: vec![(0, console_dev)],
        gpio: gpio_dev,
        pwm: pwm_dev,
        rmt: rmt_dev,
        pcnt: pcnt_dev,
        uart: uart_dev,
        timers: SimTimerService::new(),
        tasks: SimTaskService::new(),
        storage: storage_dev,
    });

    Rig {
        sh,
        con,
        gpio,
        pwm,
        rmt,
        pcnt,
        uart,
        storage,
    }
}

pub fn env(rig: &Rig) -> Env {
    Env::new(Arc::clone(&rig.sh))
}

/// Run one command line in a fresh-but-shared environment and return what
/// it printed.
pub fn run(rig: &Rig, env: &mut Env, line: &str) -> alloc::string::String {
    rig.con.clear_output();
    let _ = crate::dispatch::execute_line(env, line);
    rig.con.output()
}
