use alloc::sync::Arc;

use espshell_drivers::sim::ScriptedConsole;

use crate::console::{ColorMode, Console, EchoMode};

fn setup() -> (Arc<Console>, Arc<ScriptedConsole>) {
    let dev = Arc::new(ScriptedConsole::new());
    let dev2: Arc<dyn espshell_drivers::ConsoleDevice> = dev.clone();
    let con = Console::new(0, dev2);
    (con, dev)
}

#[test]
fn print_strips_tags_by_default() {
    let (con, dev) = setup();
    con.print("% <e>Failed</>\r\n");
    assert_eq!(dev.output(), "% Failed\r\n");
}

#[test]
fn print_colors_when_enabled() {
    let (con, dev) = setup();
    con.set_color_mode(ColorMode::On);
    con.print("<g>ok</>");
    assert_eq!(dev.output(), "\x1b[92mok\x1b[0m");
}

#[test]
fn auto_color_upgrades_on_control_byte() {
    let (con, _dev) = setup();
    assert_eq!(con.color_mode(), ColorMode::Auto);
    con.note_user_byte(b'a');
    con.note_user_byte(b'\r');
    con.note_user_byte(b'\t');
    assert_eq!(con.color_mode(), ColorMode::Auto);
    con.note_user_byte(0x01); // Ctrl-A: a real terminal
    assert_eq!(con.color_mode(), ColorMode::On);
}

#[test]
fn silent_mode_suppresses_output() {
    let (con, dev) = setup();
    con.set_echo_mode(EchoMode::Silent);
    con.print("nothing");
    assert_eq!(dev.output(), "");
    con.set_echo_mode(EchoMode::On);
    con.print("back");
    assert_eq!(dev.output(), "back");
}

#[test]
fn echo_push_pop_restores() {
    let (con, _dev) = setup();
    con.set_echo_mode(EchoMode::On);
    con.push_echo_off();
    assert_eq!(con.echo_mode(), EchoMode::Off);
    con.pop_echo();
    assert_eq!(con.echo_mode(), EchoMode::On);
}

#[test]
fn device_switching() {
    let (con, dev0) = setup();
    let dev1 = Arc::new(ScriptedConsole::new());
    con.register_device(1, dev1.clone());
    assert!(con.select(1));
    con.print("to-one");
    assert_eq!(dev1.output(), "to-one");
    assert_eq!(dev0.output(), "");
    assert!(!con.select(42));
    assert_eq!(con.active_index(), 1);
}

#[test]
fn lf_after_cr_is_not_a_keypress() {
    let (con, dev) = setup();
    con.note_cr();
    dev.push_bytes(b"\n");
    assert!(!con.anykey_pressed());
    // A bare LF with no preceding CR does count.
    dev.push_bytes(b"\n");
    assert!(con.anykey_pressed());
    // So does any ordinary byte.
    dev.push_bytes(b"x");
    assert!(con.anykey_pressed());
    assert!(!con.anykey_pressed());
}
