use alloc::string::String;
use alloc::sync::Arc;

use espshell_drivers::sim::ScriptedConsole;

use crate::console::Console;
use crate::editor::Editor;

fn setup() -> (Editor, Arc<ScriptedConsole>) {
    let dev = Arc::new(ScriptedConsole::new());
    let dev2: Arc<dyn espshell_drivers::ConsoleDevice> = dev.clone();
    let con = Console::new(0, dev2);
    (Editor::new(con), dev)
}

fn read(ed: &mut Editor, dev: &ScriptedConsole, bytes: &[u8]) -> String {
    dev.push_bytes(bytes);
    ed.readline("esp32#>").unwrap()
}

#[test]
fn plain_line() {
    let (mut ed, dev) = setup();
    assert_eq!(read(&mut ed, &dev, b"pin 2 high\r"), "pin 2 high");
}

#[test]
fn backspace_editing() {
    let (mut ed, dev) = setup();
    // "pinq" then backspace, then the rest.
    assert_eq!(read(&mut ed, &dev, b"pinq\x08 2\r"), "pin 2");
    // DEL works as backspace too.
    assert_eq!(read(&mut ed, &dev, b"ab\x7fc\r"), "ac");
}

#[test]
fn home_insert_and_kill() {
    let (mut ed, dev) = setup();
    // Type the tail, jump home (Ctrl-A), type the head.
    assert_eq!(read(&mut ed, &dev, b"2 high\x01pin \r"), "pin 2 high");
    // Ctrl-A + Ctrl-K wipes the line.
    assert_eq!(read(&mut ed, &dev, b"garbage\x01\x0bok\r"), "ok");
}

#[test]
fn ctrl_c_injects_suspend_and_ctrl_z_exit() {
    let (mut ed, dev) = setup();
    assert_eq!(read(&mut ed, &dev, b"half-typed\x03"), "suspend");
    assert_eq!(read(&mut ed, &dev, b"\x1a"), "exit");
}

#[test]
fn esc_digits_esc_inserts_character() {
    let (mut ed, dev) = setup();
    assert_eq!(read(&mut ed, &dev, b"\x1b65\x1b\r"), "A");
    // Code 0 is refused.
    assert_eq!(read(&mut ed, &dev, b"\x1b0\x1bx\r"), "x");
}

#[test]
fn crlf_pairs_submit_once() {
    let (mut ed, dev) = setup();
    dev.push_bytes(b"a\r\nb\r");
    assert_eq!(ed.readline("p>").unwrap(), "a");
    assert_eq!(ed.readline("p>").unwrap(), "b");
}

#[test]
fn arrow_keys_move_cursor() {
    let (mut ed, dev) = setup();
    // "ac", left-arrow (ESC [ D), insert "b".
    assert_eq!(read(&mut ed, &dev, b"ac\x1b[Db\r"), "abc");
}

#[test]
fn history_hotkeys_and_search() {
    let (mut ed, dev) = setup();
    {
        let mut h = ed.console().history().lock();
        h.add("pin 2 high");
        h.add("uptime");
    }
    // Ctrl-O pulls the newest entry.
    assert_eq!(read(&mut ed, &dev, b"\x0f\r"), "uptime");
    // Ctrl-O twice: one entry older.
    assert_eq!(read(&mut ed, &dev, b"\x0f\x0f\r"), "pin 2 high");
    // Ctrl-R search: type pattern, Enter accepts the hit.
    assert_eq!(read(&mut ed, &dev, b"\x12pin\r\r"), "pin 2 high");
    // Anchored search with no hit leaves the line as it was.
    assert_eq!(read(&mut ed, &dev, b"abc\x12^zz\r\r"), "abc");
}

#[test]
fn long_input_stops_growing() {
    let (mut ed, dev) = setup();
    let mut input = std::vec![b'x'; crate::editor::MAX_INPUT_LENGTH + 50];
    input.push(b'\r');
    let line = read(&mut ed, &dev, &input);
    assert_eq!(line.len(), crate::editor::MAX_INPUT_LENGTH);
}
