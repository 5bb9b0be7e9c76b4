//! End-to-end scenarios: a full shell task driven through a scripted
//! console against the sim drivers.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use espshell::shell::{Shell, ShellServices};
use espshell_drivers::{ConsoleDevice, Storage};
use espshell_drivers::sim::{
    MemStorage, ScriptedConsole, SimGpio, SimPcnt, SimPwm, SimRmt, SimTaskService,
    SimTimerService, SimUart, install_host_hooks,
};

struct Rig {
    sh: Arc<Shell>,
    con: Arc<ScriptedConsole>,
    gpio: Arc<SimGpio>,
    pcnt: Arc<SimPcnt>,
    storage: Arc<MemStorage>,
}

fn start_shell() -> Rig {
    install_host_hooks();
    let con = Arc::new(ScriptedConsole::new());
    let gpio = Arc::new(SimGpio::new());
    let pcnt = Arc::new(SimPcnt::new());
    let storage = Arc::new(MemStorage::new());

    let console_dev: Arc<dyn ConsoleDevice> = con.clone();
    let gpio_dev: Arc<dyn espshell_drivers::GpioDriver> = gpio.clone();
    let pcnt_dev: Arc<dyn espshell_drivers::PcntDriver> = pcnt.clone();
    let storage_dev: Arc<dyn espshell_drivers::Storage> = storage.clone();
    let sh = Shell::new(ShellServices {
        console_devices: vec![(0, console_dev)],
        gpio: gpio_dev,
        pwm: Arc::new(SimPwm::new()),
        rmt: Arc::new(SimRmt::new()),
        pcnt: pcnt_dev,
        uart: Arc::new(SimUart::new()),
        timers: SimTimerService::new(),
        tasks: SimTaskService::new(),
        storage: storage_dev,
    });
    assert!(sh.start());
    let rig = Rig {
        sh,
        con,
        gpio,
        pcnt,
        storage,
    };
    assert!(rig.con.wait_for("ESPShell", 2000), "no banner");
    assert!(rig.con.wait_for("esp32#>", 2000), "no prompt");
    rig
}

fn wait_level(gpio: &SimGpio, pin: u8, level: bool, timeout_ms: u64) -> bool {
    use espshell_drivers::GpioDriver;
    let deadline = std::time::Instant::now() + Duration::from_millis(timeout_ms);
    while std::time::Instant::now() < deadline {
        if gpio.get_level(pin) == level {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn s1_pin_mode_level_delay() {
    use espshell_drivers::{GpioDriver, PinFlags};
    let r = start_shell();
    r.con.push_line("pin 2 out high delay 100 low");
    assert!(wait_level(&r.gpio, 2, true, 1000), "pin 2 never went high");
    assert!(wait_level(&r.gpio, 2, false, 1000), "pin 2 never went low");
    assert!(r.gpio.mode(2).contains(PinFlags::OUTPUT));
    // Let the command's final keypress poll pass before typing more.
    thread::sleep(Duration::from_millis(100));
    // The command succeeded silently; a read verifies the final level.
    r.con.clear_output();
    r.con.push_line("pin 2 read");
    assert!(r.con.wait_for("GPIO2 : logic 0", 1000));
}

#[test]
fn s2_pwm_row_in_show_table() {
    let r = start_shell();
    r.con.push_line("pwm 5 1000 0.25");
    assert!(r.con.wait_for("PWM on GPIO5", 1000));
    r.con.clear_output();
    r.con.push_line("show pwm");
    assert!(r.con.wait_for("1000", 1000));
    let out = r.con.output();
    assert!(out.contains("5 |"), "no row for pin 5: {out}");
    assert!(out.contains("25"), "no 25% duty: {out}");
}

#[test]
fn s4_edge_triggers_alias() {
    let r = start_shell();
    r.con.push_line("alias blink");
    assert!(r.con.wait_for("alias editing mode", 1000));
    r.con.push_line("pin 2 out high");
    r.con.push_line("quit");
    r.con.push_line("if rising 3 exec blink");
    thread::sleep(Duration::from_millis(100));

    // A rising edge on GPIO3 schedules the alias.
    r.gpio.drive(3, true);
    assert!(wait_level(&r.gpio, 2, true, 2000), "alias never ran");

    r.con.clear_output();
    r.con.push_line("show ifs");
    assert!(r.con.wait_for("rising pin 3", 1000));
    let out = r.con.output();
    assert!(out.contains("blink"), "alias name missing: {out}");
    // Hits column reports at least one execution.
    assert!(
        out.contains("1/") || out.contains("2/"),
        "no hits recorded: {out}"
    );
}

#[test]
fn s5_periodic_rule_fires_repeatedly() {
    let r = start_shell();
    r.con.push_line("alias tick");
    assert!(r.con.wait_for("alias editing mode", 1000));
    r.con.push_line("pin 7 toggle");
    r.con.push_line("quit");
    // 100 ms period, capped to keep the rig quiet afterwards.
    r.con.push_line("every 100 exec tick max-exec 50");
    thread::sleep(Duration::from_millis(650));

    let mut hits = 0;
    r.sh.events.for_each(|ifc, _| hits = ifc.hits());
    assert!(hits >= 2, "expected >=2 periodic hits, got {hits}");
    // ~6 intervals elapsed; allow generous scheduling slop.
    assert!(hits <= 20, "implausible hit count {hits}");
}

#[test]
fn s6_count_trigger_interrupted_by_enter() {
    let r = start_shell();
    r.con.push_line("count 4 trigger 1000");
    assert!(r.con.wait_for("Waiting for the first pulse", 1000));
    // No pulses arrive; Enter aborts within one poll interval.
    thread::sleep(Duration::from_millis(50));
    r.con.push_bytes(b"\r");
    assert!(r.con.wait_for("Interrupted", 3000));
    assert!(r.con.wait_for("0 pulses", 1000));
}

#[test]
fn count_measures_injected_pulses() {
    let r = start_shell();
    r.con.push_line("count 4 300");
    thread::sleep(Duration::from_millis(100));
    r.pcnt.inject(4, 42);
    assert!(r.con.wait_for("42 pulses", 3000));
}

#[test]
fn background_command_reports_and_dies_on_kill() {
    let r = start_shell();
    r.con.push_line("pin 2 delay 60000 &");
    assert!(r.con.wait_for("Background task started", 1000));
    assert!(r.con.wait_for("kill 0x", 1000));

    // Fish the task id out of the hint line.
    let out = r.con.output();
    let pos = out.find("kill 0x").unwrap();
    let id: String = out[pos + 7..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();

    r.con.clear_output();
    r.con.push_line(&format!("kill 0x{id}"));
    assert!(r.con.wait_for("Finished", 2000), "no completion report");
    assert!(r.con.wait_for("interrupted", 2000));
}

#[test]
fn rate_limit_and_exec_cap() {
    // Properties 7 and 8, driven through the ISR path.
    let r = start_shell();
    r.con.push_line("alias noop");
    assert!(r.con.wait_for("alias editing mode", 1000));
    r.con.push_line("quit");
    r.con
        .push_line("if rising 9 max-exec 3 rate-limit 60000 exec noop");
    assert!(r.con.wait_for("exists but it is empty", 2000));
    thread::sleep(Duration::from_millis(100));

    for _ in 0..8 {
        r.gpio.drive(9, true);
        r.gpio.drive(9, false);
        thread::sleep(Duration::from_millis(10));
    }
    thread::sleep(Duration::from_millis(300));

    let mut hits = 0;
    let mut drops = 0;
    r.sh.events.for_each(|ifc, _| {
        hits = ifc.hits();
        drops = ifc.drops();
    });
    // The 60-second rate limit lets exactly one execution through; the
    // rest are dropped, and hits never exceeds the cap.
    assert_eq!(hits, 1, "rate limit failed: hits={hits} drops={drops}");
    assert!(drops >= 1, "no drops recorded");
    assert!(hits <= 3, "execution cap exceeded");
}

#[test]
fn if_delete_disables_rule() {
    let r = start_shell();
    r.con.push_line("alias z");
    assert!(r.con.wait_for("alias editing mode", 1000));
    r.con.push_line("quit");
    r.con.push_line("if rising 11 exec z");
    thread::sleep(Duration::from_millis(100));

    let mut id = 0;
    r.sh.events.for_each(|ifc, _| id = ifc.id());
    assert!(id > 0);

    r.con.push_line(&format!("if delete {id}"));
    thread::sleep(Duration::from_millis(100));
    let mut remaining = 0;
    r.sh.events.for_each(|_, _| remaining += 1);
    assert_eq!(remaining, 0, "rule survived deletion");

    // Edges on the pin no longer reach anything (the ISR is gone).
    r.gpio.drive(11, true);
    r.gpio.drive(11, false);
}

#[test]
fn if_save_writes_retypeable_rules() {
    let r = start_shell();
    r.con.push_line("alias blink");
    assert!(r.con.wait_for("alias editing mode", 1000));
    r.con.push_line("quit");
    r.con.push_line("if rising 3 low 5 max-exec 10 exec blink");
    r.con.push_line("if save * /rules.txt");
    assert!(r.con.wait_for("appended to", 2000));

    let saved = r.storage.file_string("/rules.txt").expect("file missing");
    assert!(saved.contains("if rising 3"), "got: {saved}");
    assert!(saved.contains("low 5"), "got: {saved}");
    assert!(saved.contains("max-exec 10"), "got: {saved}");
    assert!(saved.contains("exec blink"), "got: {saved}");
}

#[test]
fn pin_loop_interrupted_by_keypress() {
    // Property 10: a foreground infinite loop dies within one pass + one
    // poll interval after a keypress.
    let r = start_shell();
    r.con.push_line("pin 13 toggle delay 100 loop infinite");
    assert!(r.con.wait_for("Hint", 1000));
    thread::sleep(Duration::from_millis(150));
    r.con.push_bytes(b"x");
    assert!(
        r.con.wait_for("interrupted", 2000) || r.con.wait_for("aborting", 500),
        "loop did not stop on keypress"
    );
    assert!(r.con.wait_for("esp32#>", 1000));
}

#[test]
fn alias_exec_replays_in_order() {
    let r = start_shell();
    r.con.push_line("alias steps");
    assert!(r.con.wait_for("alias editing mode", 1000));
    r.con.push_line("pin 20 out high");
    r.con.push_line("pin 21 out high");
    r.con.push_line("list");
    assert!(r.con.wait_for("1: pin 20 out high", 1000));
    assert!(r.con.wait_for("2: pin 21 out high", 1000));
    r.con.push_line("quit");
    r.con.push_line("exec steps");
    assert!(wait_level(&r.gpio, 20, true, 1000));
    assert!(wait_level(&r.gpio, 21, true, 1000));
}

#[test]
fn alias_delete_lines_and_empty_listing() {
    let r = start_shell();
    r.con.push_line("alias edits");
    assert!(r.con.wait_for("alias editing mode", 1000));
    r.con.push_line("pin 2 high");
    r.con.push_line("pin 2 low");
    r.con.push_line("delete");
    r.con.clear_output();
    r.con.push_line("list");
    assert!(r.con.wait_for("1: pin 2 high", 1000));
    assert!(!r.con.output().contains("pin 2 low"));
    r.con.push_line("delete all");
    r.con.clear_output();
    r.con.push_line("list");
    assert!(r.con.wait_for("Empty", 1000));
    r.con.push_line("quit");
}

#[test]
fn hostid_prefixes_the_prompt() {
    let r = start_shell();
    r.con.push_line("hostid lab7");
    assert!(r.con.wait_for("set to \"lab7\"", 1000));
    r.con.clear_output();
    r.con.push_line("uptime");
    assert!(r.con.wait_for("lab7@esp32#>", 1000));
    assert_eq!(r.storage.kv_get("hostid").as_deref(), Some("lab7"));
}

#[test]
fn uart_directory_write_and_read() {
    let r = start_shell();
    r.con.push_line("uart 1");
    assert!(r.con.wait_for("UART configuration", 1000));
    // Verbs require the driver up.
    r.con.push_line("write hi");
    assert!(r.con.wait_for("UART1 is down", 1000));
    r.con.push_line("up 9600");
    assert!(r.con.wait_for("9600 baud", 1000));
    r.con.push_line("write hello\\x21");
    assert!(r.con.wait_for("6 byte(s) sent", 1000));

    r.con.push_line("exit");
    assert!(r.con.wait_for("esp32#>", 1000));
}

#[test]
fn question_lists_and_documents() {
    let r = start_shell();
    r.con.clear_output();
    r.con.push_line("?");
    assert!(r.con.wait_for("Commands list", 2000));
    assert!(r.con.wait_for("GPIO commands", 1000));
    r.con.clear_output();
    r.con.push_line("? pin");
    assert!(r.con.wait_for("Multifunction GPIO command", 1000));
    r.con.clear_output();
    r.con.push_line("? keys");
    assert!(r.con.wait_for("ESPShell Keys", 1000));
}

#[test]
fn exit_exit_stops_the_shell() {
    let r = start_shell();
    r.con.push_line("exit exit");
    assert!(r.con.wait_for("Sayonara", 2000));
    // The task slot frees up for a restart.
    thread::sleep(Duration::from_millis(100));
    r.con.clear_output();
    assert!(r.sh.start(), "restart refused");
    assert!(r.con.wait_for("Type \"?\"", 2000));
}

#[test]
fn isr_vs_writer_hammer() {
    // Properties 5 and 6: edges firing concurrently with rule creation and
    // deletion must never tear the list or touch freed memory; afterwards
    // every surviving entry is reachable exactly once.
    let r = start_shell();
    r.con.push_line("alias h");
    assert!(r.con.wait_for("alias editing mode", 1000));
    r.con.push_line("quit");

    let gpio = Arc::clone(&r.gpio);
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let stop2 = Arc::clone(&stop);
    let driver = thread::spawn(move || {
        while !stop2.load(std::sync::atomic::Ordering::Acquire) {
            gpio.drive(17, true);
            gpio.drive(17, false);
        }
    });

    for _ in 0..10 {
        r.con.push_line("if rising 17 exec h");
        thread::sleep(Duration::from_millis(30));
        r.con.push_line("if delete all");
        thread::sleep(Duration::from_millis(30));
    }
    stop.store(true, std::sync::atomic::Ordering::Release);
    driver.join().unwrap();

    // Settle, then verify the table: no duplicates, everything alive.
    thread::sleep(Duration::from_millis(200));
    let mut ids = Vec::new();
    r.sh.events.for_each(|ifc, _| {
        assert!(ifc.is_alive());
        ids.push(ifc.id());
    });
    let mut deduped = ids.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(ids.len(), deduped.len(), "duplicate list entries");
}
