//! The `?` help system: command listings, per-command manual pages, the
//! terminal keys page, and the inline `?`-hotkey hook.

use espshell_lib::prefix_match;
use espshell_term::cprintf;

use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::input::ArgView;
use crate::keywords::{self, KEYWORDS_MAIN};

// 25 lines maximum, to fit a default terminal window without scrolling.
const KEYS_MANUAL: &str = "%             -- ESPShell Keys -- \r\n\r\n\
% <ENTER>         : Execute command.\r\n\
% <- ->           : Arrows: move cursor left or right. Up and down to scroll\r\n\
%                   through command history\r\n\
% <DEL>           : As in Notepad\r\n\
% <BACKSPACE>     : As in Notepad\r\n\
% <HOME>, <END>   : Use Ctrl+A instead of <HOME> and Ctrl+E as <END>\r\n\
% <TAB>           : Move cursor to the next word/argument: press <TAB> multiple\r\n\
%                   times to cycle through words in the line\r\n\
% Ctrl+R          : Command history search\r\n\
% Ctrl+K          : [K]ill line: clear input line from cursor to the end\r\n\
% Ctrl+L          : Clear screen\r\n\
% Ctrl+Z          : Same as entering \"exit\" command\r\n\
% Ctrl+C          : Suspend sketch execution\r\n\
% <ESC>,NUM,<ESC> : Same as entering letter with decimal ASCII code NUM\r\n%\r\n\
% -- Terminal compatibility workarounds (alternative key sequences) --\r\n%\r\n\
% Ctrl+B and Ctrl+F work as \"<-\" and \"->\" ([B]ack & [F]orward arrows)\r\n\
% Ctrl+O or P   : Go through the command history: O=backward, P=forward\r\n\
% Ctrl+D works as <[D]elete> key\r\n\
% Ctrl+H works as <BACKSPACE> key\r\n";

const LIST_BANNER: &str = "% Enter \"<b>?</> <i>COMMAND</>\" to view details about a specific command.\r\n\
% Enter \"<b>? <i>keys</>\" to display the ESPShell keyboard help page.\r\n%\r\n";

// "?", "? KEYWORD", "? keys"
pub fn cmd_question(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    match args.get(1) {
        None => {
            list_commands(env);
            Ok(())
        }
        Some(tok) if tok == "keys" => {
            env.sh.con.print(KEYS_MANUAL);
            Ok(())
        }
        Some(tok) => help_for(env, tok),
    }
}

/// Print the brief listing of the active directory. Directory-entering
/// commands are highlighted differently from plain ones.
fn list_commands(env: &Env) {
    env.sh.con.print(LIST_BANNER);
    let mut prev = "";
    for entry in env.dir.entries {
        if entry.is_hidden() || entry.cmd == prev {
            // Repeating rows (same keyword, different argc) show only the
            // first description.
            prev = entry.cmd;
            continue;
        }
        prev = entry.cmd;
        let brief = if !entry.brief.is_empty() {
            entry.brief
        } else if !entry.help.is_empty() {
            entry.help
        } else {
            "No description"
        };
        let tag = if keywords::is_directory_name(entry.cmd) {
            'b'
        } else {
            'i'
        };
        cprintf!(
            env.sh.con,
            "% <{}>{:<11}</> : {}\r\n",
            tag,
            entry.cmd,
            brief
        );
    }
}

/// Print every help page matching `name`: the active directory first, the
/// main directory as a fallback.
fn help_for(env: &Env, name: &str) -> CmdResult {
    let mut found = false;
    for dir in [env.dir, &KEYWORDS_MAIN] {
        for entry in dir.entries {
            if entry.is_hidden() || !prefix_match(name, entry.cmd) {
                continue;
            }
            let brief = if entry.brief.is_empty() {
                entry.help
            } else {
                entry.brief
            };
            cprintf!(env.sh.con, "\r\n%<r> -- {} --</>\r\n", brief);
            env.sh.con.print(if entry.help.is_empty() {
                entry.brief
            } else {
                entry.help
            });
            env.sh.con.print("\r\n");
            found = true;
        }
        if found || core::ptr::eq(dir, &KEYWORDS_MAIN) {
            break;
        }
    }
    if !found {
        cprintf!(
            env.sh.con,
            "\r\n% Sorry, no manual entry for \"{}\"\r\n\
             % Type \"<i>?</>\" and press <Enter> to see what is available\r\n",
            name
        );
        return Err(CmdError::Failed);
    }
    Ok(())
}

/// The editor's `?`-hotkey hook: a plain function, so it can only consult
/// the main directory (the per-task active directory is out of reach from
/// here — acceptable, the hotkey is a convenience).
pub fn inline_help_hook(line: &str) {
    let first = line.split_whitespace().next().unwrap_or("");
    if first.is_empty() {
        return;
    }
    // Printing goes through the log backend console, which is the one the
    // REPL runs on.
    for entry in KEYWORDS_MAIN.entries {
        if !entry.is_hidden() && prefix_match(first, entry.cmd) && !entry.help.is_empty() {
            espshell_term::console::log_console_print(entry.help);
            espshell_term::console::log_console_print("\r\n");
            return;
        }
    }
    espshell_term::console::log_console_print("% No help page for this command\r\n");
}
