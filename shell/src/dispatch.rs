//! The command dispatcher.
//!
//! Takes a tokenized record, resolves it against the active directory (then
//! the main directory), and runs the handler — either inline or, when the
//! line ended with `&`, on a freshly spawned task. Error printing is
//! centralized here so handlers only ever print their own domain-specific
//! explanations (and return [`CmdError::Failed`] to keep the dispatcher
//! quiet).

use alloc::string::String;
use alloc::sync::Arc;

use espshell_lib::{ordinal_suffix, prefix_match};

use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::exec;
use crate::input::{ArgView, CmdHandler, InputRecord};
use crate::keywords::{ArgCount, KEYWORDS_MAIN};

/// Parse and execute one typed line.
pub fn execute_line(env: &mut Env, line: &str) -> CmdResult {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") {
        // Comments occupy a whole line and produce no error.
        return Ok(());
    }
    match InputRecord::tokenize(line) {
        None => Ok(()),
        Some(rec) => execute_record(env, &rec),
    }
}

/// Execute an already-tokenized record (alias replays come through here with
/// their cached handler).
pub fn execute_record(env: &mut Env, rec: &Arc<InputRecord>) -> CmdResult {
    // A trailing "&" requests background execution — except in alias editing
    // mode, where it is part of the recorded line and is processed when the
    // alias eventually runs.
    let editing_alias = env.dir.name == "alias";
    if !editing_alias
        && rec.detect_background(espshell_drivers::MAX_TASK_PRIORITY as u32)
    {
        env.sh
            .con
            .print("% Unrecognized priority value, priority will be inherited\r\n");
    }

    let handler = match rec.handler() {
        Some(h) => h,
        None => match find_handler(env, rec) {
            Ok(h) => {
                rec.set_handler(Some(h));
                h
            }
            Err(e) => {
                display_error(env, e, rec);
                return Err(e);
            }
        },
    };

    let result = if rec.is_background() && !editing_alias {
        exec::in_background(env, rec, handler)
    } else {
        let view = ArgView::new(rec);
        handler(env, &view)
    };

    if let Err(e) = result {
        display_error(env, e, rec);
    }
    result
}

/// Find the handler for `rec`: active directory first, then main. A keyword
/// matches by unambiguous-prefix equality; among matching rows the argument
/// count must agree exactly (`Many` takes anything, `None` takes zero). The
/// first qualifying row in table order wins.
fn find_handler(env: &Env, rec: &InputRecord) -> Result<CmdHandler, CmdError> {
    let name = rec.arg(0);
    let nargs = rec.argc() - 1;
    let mut name_seen = false;

    let main = &KEYWORDS_MAIN;
    let dirs: [&'static crate::keywords::Directory; 2] = [env.dir, main];
    for (i, dir) in dirs.iter().enumerate() {
        if i == 1 && core::ptr::eq(env.dir, *dir) {
            break;
        }
        for entry in dir.entries {
            let matches = entry.cmd == "*" || prefix_match(name, entry.cmd);
            if !matches {
                continue;
            }
            name_seen = true;
            let argc_ok = match entry.argc {
                ArgCount::Many => true,
                ArgCount::None => nargs == 0,
                ArgCount::Exact(n) => nargs == n as usize,
            };
            if argc_ok {
                if let Some(h) = entry.handler {
                    return Ok(h);
                }
            }
        }
    }

    Err(if name_seen {
        CmdError::MissingArg
    } else {
        CmdError::NotFound
    })
}

/// One diagnostic line per failed command.
pub fn display_error(env: &Env, err: CmdError, rec: &InputRecord) {
    if let Some(text) = format_error(err, rec) {
        env.sh.con.print(&text);
    }
}

/// Render the diagnostic, or `None` when the dispatcher must stay silent.
pub fn format_error(err: CmdError, rec: &InputRecord) -> Option<String> {
    match err {
        CmdError::BadArg(i) => {
            let arg = if i < rec.argc() { rec.arg(i) } else { "Empty" };
            Some(alloc::format!(
                "% <e>Invalid {}{} argument (\"{}\")</>\r\n",
                i,
                ordinal_suffix(i),
                arg
            ))
        }
        CmdError::MissingArg => Some(alloc::format!(
            "% <e>Wrong number of arguments. Help page: \"? {}\"</>\r\n",
            rec.arg(0)
        )),
        CmdError::NotFound => Some(alloc::format!(
            "% <e>\"{}\": command not found</>\r\n\
             % Type \"?\" to show the list of commands available\r\n",
            rec.arg(0)
        )),
        CmdError::Failed => None,
    }
}
