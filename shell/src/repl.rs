//! The main shell task: read a line, dispatch it, repeat.

use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::Ordering;

use espshell_term::Editor;

use crate::config::CONSOLE_UP_POLL_MS;
use crate::dispatch;
use crate::env::Env;
use crate::help;
use crate::shell::Shell;

const WELCOME_BANNER: &str = "\x1b[H\x1b[2J%\r\n\
% ESPShell\r\n\
% Type \"?\" and press <Enter> for help\r\n\
% Press <Ctrl+L> to clear the screen, enable colors and show \"tip of the day\"\r\n";

/// Body of the "ESPShell" task.
pub fn shell_task(sh: Arc<Shell>) {
    // The sketch may not have opened the serial port yet.
    while !sh.con.is_up() {
        sh.tasks.sleep_ms(CONSOLE_UP_POLL_MS);
    }

    sh.con.print(WELCOME_BANNER);

    let mut editor = Editor::new(Arc::clone(&sh.con));
    editor.set_help_hook(help::inline_help_hook);
    let mut env = Env::new(Arc::clone(&sh));

    while !sh.exit_requested.load(Ordering::Acquire) {
        let hostid = sh.hostid();
        if hostid.is_empty() {
            editor.set_prompt_tag("");
        } else {
            editor.set_prompt_tag(&alloc::format!("{hostid}@"));
        }

        let prompt = env.prompt();
        let Some(line) = editor.readline(&prompt) else {
            // The console read path is failing; don't spin.
            espshell_lib::yield_now();
            continue;
        };

        let line = normalize(&line);
        if line.is_empty() {
            continue;
        }
        // Comments skip both history and execution.
        if line.starts_with("//") {
            continue;
        }
        if sh.con.history_enabled() {
            sh.con.history().lock().add(&line);
        }
        let _ = dispatch::execute_line(&mut env, &line);
    }

    sh.con.print("% Sayonara!\r\n");
    // Make a later restart possible.
    sh.exit_requested.store(false, Ordering::Release);
    sh.clear_shell_task();
}

/// Strip surrounding whitespace and the leading `@` echo marker.
fn normalize(line: &str) -> String {
    let line = line.trim();
    let line = line.strip_prefix('@').unwrap_or(line);
    String::from(line)
}
