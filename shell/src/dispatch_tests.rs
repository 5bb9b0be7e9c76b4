use crate::error::CmdError;
use crate::input::InputRecord;
use crate::testutil::{env, rig, run};
use crate::{dispatch, keywords};

#[test]
fn unknown_command_reports_not_found() {
    let r = rig();
    let mut e = env(&r);
    let out = run(&r, &mut e, "frobnicate");
    assert!(out.contains("command not found"));
}

#[test]
fn wrong_argc_reports_missing_arg() {
    let r = rig();
    let mut e = env(&r);
    // "tty" takes exactly one argument.
    let out = run(&r, &mut e, "tty");
    assert!(out.contains("Wrong number of arguments"));
    assert!(out.contains("? tty"));
}

#[test]
fn comments_and_empty_lines_do_nothing() {
    let r = rig();
    let mut e = env(&r);
    assert_eq!(run(&r, &mut e, "// a comment line"), "");
    assert_eq!(run(&r, &mut e, "    "), "");
}

#[test]
fn prefix_matching_resolves_commands() {
    let r = rig();
    let mut e = env(&r);
    // "upt" is unambiguously "uptime" (table order decides).
    let out = run(&r, &mut e, "upt");
    assert!(out.contains("Up "), "got: {out}");
}

#[test]
fn bad_argument_is_pointed_at() {
    let r = rig();
    let mut e = env(&r);
    let out = run(&r, &mut e, "pin notanumber");
    assert!(out.contains("Invalid 1st argument"), "got: {out}");
}

#[test]
fn handler_cache_survives_replay() {
    let r = rig();
    let mut e = env(&r);
    let rec = InputRecord::tokenize("uptime").unwrap();
    assert!(rec.handler().is_none());
    let _ = dispatch::execute_record(&mut e, &rec);
    assert!(rec.handler().is_some());
    // Replay reuses the cached handler (pure dispatch, no lookup).
    let _ = dispatch::execute_record(&mut e, &rec);
}

#[test]
fn dispatcher_determinism() {
    // Property 3: same table, same tokens — same handler.
    let r = rig();
    let mut e = env(&r);
    let rec1 = InputRecord::tokenize("uptime").unwrap();
    let rec2 = InputRecord::tokenize("uptime").unwrap();
    let _ = dispatch::execute_record(&mut e, &rec1);
    let _ = dispatch::execute_record(&mut e, &rec2);
    assert_eq!(
        rec1.handler().map(|h| h as usize),
        rec2.handler().map(|h| h as usize)
    );
}

#[test]
fn directory_switch_and_fallback() {
    let r = rig();
    let mut e = env(&r);
    // Enter the sequence directory; main commands still resolve.
    let out = run(&r, &mut e, "sequence 3");
    assert!(out.contains("Entering"));
    assert!(core::ptr::eq(e.dir, &keywords::KEYWORDS_SEQUENCE));
    assert_eq!(e.context, 3);
    assert_eq!(e.prompt(), "esp32-seq3>");
    // Fallback to main from inside a sub-directory.
    let out = run(&r, &mut e, "uptime");
    assert!(out.contains("Up "));
    // "exit" returns to main.
    let _ = run(&r, &mut e, "exit");
    assert!(e.in_main());
    assert_eq!(e.prompt(), "esp32#>");
}

#[test]
fn directory_isolation_between_envs() {
    // Property 4: two tasks, two directories, no bleed-through.
    let r = rig();
    let mut a = env(&r);
    let mut b = env(&r);
    let _ = run(&r, &mut a, "sequence 1");
    assert!(!a.in_main());
    assert!(b.in_main());
    let _ = run(&r, &mut b, "uart 0");
    assert!(core::ptr::eq(b.dir, &keywords::KEYWORDS_UART));
    assert!(core::ptr::eq(a.dir, &keywords::KEYWORDS_SEQUENCE));
}

#[test]
fn failed_error_is_silent() {
    let r = rig();
    let mut e = env(&r);
    // "exec nosuch" prints its own message; the dispatcher adds nothing.
    let out = run(&r, &mut e, "exec nosuchalias");
    assert!(out.contains("No alias named"));
    assert!(!out.contains("command not found"));
    assert!(!out.contains("Invalid"));
}

#[test]
fn exit_exit_requests_shutdown() {
    let r = rig();
    let mut e = env(&r);
    let out = run(&r, &mut e, "exit");
    assert!(out.contains("Not in a subdirectory"));
    let _ = run(&r, &mut e, "exit exit");
    assert!(r.sh.exit_requested.load(core::sync::atomic::Ordering::Acquire));
}

#[test]
fn format_error_messages() {
    let rec = InputRecord::tokenize("cmd a b").unwrap();
    let bad = dispatch::format_error(CmdError::BadArg(2), &rec).unwrap();
    assert!(bad.contains("2nd"));
    assert!(bad.contains("\"b\""));
    assert!(dispatch::format_error(CmdError::Failed, &rec).is_none());
}
