//! Command aliases: named, replayable lists of recorded input.
//!
//! An alias object is **persistent**: once created it is never deallocated
//! (deleting only empties its line list), so the event engine can cache
//! `&'static Alias` pointers without ever dangling. The line list itself is
//! a refcounted-record vector behind a readers/writer lock: the editor
//! appends under the writer lock, `exec` replays under the reader lock.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use espshell_lib::{RwLock, prefix_match};
use espshell_term::cprintf;

use crate::config;
use crate::dispatch;
use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::input::{ArgView, InputRecord};
use crate::keywords::KEYWORDS_ALIAS;
use crate::shell::Shell;

pub struct Alias {
    pub name: String,
    lines: RwLock<Vec<Arc<InputRecord>>>,
}

impl Alias {
    fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            lines: RwLock::new(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.read().len()
    }

    fn push(&self, rec: Arc<InputRecord>) {
        self.lines.write().push(rec);
    }

    /// Delete line `n` (1-based), the last line (`n == 0`), or everything
    /// (`n < 0`). Returns how many lines went away.
    fn delete_lines(&self, n: i32) -> usize {
        let mut lines = self.lines.write();
        match n {
            n if n < 0 => {
                let count = lines.len();
                lines.clear();
                count
            }
            0 => {
                if lines.pop().is_some() {
                    1
                } else {
                    0
                }
            }
            n => {
                let idx = (n - 1) as usize;
                if idx < lines.len() {
                    lines.remove(idx);
                    1
                } else {
                    0
                }
            }
        }
    }

    /// Run every recorded line, in order, under the reader lock.
    pub fn execute(&'static self, env: &mut Env) {
        let lines = self.lines.read();
        for rec in lines.iter() {
            let _ = dispatch::execute_record(env, rec);
        }
    }

    fn show_lines(&self, env: &Env) {
        let lines = self.lines.read();
        let mut indent = "";
        for (i, rec) in lines.iter().enumerate() {
            cprintf!(env.sh.con, "% {}: {}{}\r\n", i + 1, indent, rec.display());
            // Indent lines typed inside a sub-directory, one level deep.
            let first = rec.arg(0);
            if prefix_match(first, "exit") || prefix_match(first, "quit") {
                indent = "";
            } else if prefix_match(first, "uart") || prefix_match(first, "sequence") {
                indent = "  ";
            }
        }
        if lines.is_empty() {
            env.sh.con.print("% Empty.\r\n");
        } else {
            env.sh.con.print("% --- END ---\r\n");
        }
    }
}

pub struct AliasStore {
    list: spin::Mutex<Vec<&'static Alias>>,
}

impl AliasStore {
    pub fn new() -> Self {
        Self {
            list: spin::Mutex::new(Vec::new()),
        }
    }

    /// Find by (possibly shortened) name.
    pub fn find(&self, name: &str) -> Option<&'static Alias> {
        self.list
            .lock()
            .iter()
            .copied()
            .find(|a| prefix_match(name, &a.name))
    }

    /// Find, or create an empty persistent alias. The leak is deliberate:
    /// alias pointers must stay valid for the lifetime of the shell.
    pub fn find_or_create(&self, name: &str) -> &'static Alias {
        let mut list = self.list.lock();
        if let Some(a) = list.iter().copied().find(|a| prefix_match(name, &a.name)) {
            return a;
        }
        let alias: &'static Alias = Box::leak(Box::new(Alias::new(name)));
        list.push(alias);
        alias
    }

    pub fn all(&self) -> Vec<&'static Alias> {
        self.list.lock().clone()
    }
}

impl Default for AliasStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Run an alias on its own task — the event daemon cannot block on alias
/// content (the next event may be right behind).
pub fn exec_in_background(sh: &Arc<Shell>, alias: &'static Alias) {
    let sh2 = Arc::clone(sh);
    let _ = sh.tasks.spawn(
        &alias.name,
        config::SHELL_CORE,
        None,
        Box::new(move || {
            let mut env = Env::new(sh2);
            env.is_foreground = false;
            alias.execute(&mut env);
        }),
    );
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Fetch the alias being edited out of the directory context.
fn current_alias(env: &Env) -> &'static Alias {
    espshell_lib::must_not_happen!(env.context == 0);
    // SAFETY: the context is set to a leaked &'static Alias by
    // cmd_alias_if and only read while the alias directory is active.
    unsafe { &*(env.context as *const Alias) }
}

// "alias NAME" — enter alias editing mode.
pub fn cmd_alias_if(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let name = args.arg(1);
    if name.contains(' ') {
        env.sh
            .con
            .print("% Either remove spaces from the name or use quotes\r\n");
        return Err(CmdError::Failed);
    }
    let alias = env.sh.aliases.find_or_create(name);
    env.change_directory(alias as *const Alias as usize, &KEYWORDS_ALIAS, None);
    env.sh
        .con
        .print("% Entering alias editing mode. \"quit\" to return\r\n");
    Ok(())
}

// "quit" — leave the editor ("exit" stays recordable as alias content).
pub fn cmd_alias_quit(env: &mut Env, _args: &ArgView<'_>) -> CmdResult {
    env.change_directory(0, &crate::keywords::KEYWORDS_MAIN, None);
    Ok(())
}

// "list"
pub fn cmd_alias_list(env: &mut Env, _args: &ArgView<'_>) -> CmdResult {
    let alias = current_alias(env);
    cprintf!(env.sh.con, "% Alias \"{}\":\r\n", alias.name);
    alias.show_lines(env);
    Ok(())
}

// "delete [all|NUMBER]" — no argument deletes the last line.
pub fn cmd_alias_delete(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let alias = current_alias(env);
    let n = match args.get(1) {
        None => 0,
        Some("all") => -1,
        Some(num) => match espshell_lib::numparse::parse_i32(num) {
            Some(v) if v > 0 => v,
            _ => return Err(CmdError::BadArg(1)),
        },
    };
    let deleted = alias.delete_lines(n);
    cprintf!(env.sh.con, "% {} line(s) deleted\r\n", deleted);
    Ok(())
}

// The catch-all: every other line typed in alias mode is recorded.
pub fn cmd_alias_asterisk(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let alias = current_alias(env);

    // Nested "alias" would edit one alias while another records it — the
    // locking story for that does not exist, so it is simply refused.
    if prefix_match(args.arg(0), "alias") {
        env.sh
            .con
            .print("% Command \"alias\" can not be part of an alias, sorry.\r\n");
        return Err(CmdError::Failed);
    }

    let rec = Arc::clone(args.record());
    // The cached handler currently points at this function; the real
    // resolution happens when the alias runs.
    rec.set_handler(None);
    alias.push(rec);
    Ok(())
}

// "exec NAME [NAME2 ... NAMEn]" — main directory.
pub fn cmd_exec(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    if args.argc() < 2 {
        return Err(CmdError::MissingArg);
    }
    for i in 1..args.argc() {
        let name = args.arg(i);
        match env.sh.aliases.find(name) {
            Some(alias) => alias.execute(env),
            None => {
                cprintf!(env.sh.con, "% No alias named \"{}\"\r\n", name);
            }
        }
    }
    Ok(())
}

// "show alias [NAME]"
pub fn cmd_show_alias(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    match args.get(2) {
        None => {
            let all = env.sh.aliases.all();
            if all.is_empty() {
                env.sh
                    .con
                    .print("% No aliases defined. Use \"alias NAME\" to create one\r\n");
            } else {
                env.sh.con.print("% List of defined aliases:\r\n");
                for (i, a) in all.iter().enumerate() {
                    cprintf!(
                        env.sh.con,
                        "% {}. \"{}\"{}\r\n",
                        i + 1,
                        a.name,
                        if a.is_empty() { ", empty" } else { "" }
                    );
                }
            }
            Ok(())
        }
        Some(name) => match env.sh.aliases.find(name) {
            Some(alias) => {
                alias.show_lines(env);
                Ok(())
            }
            None => {
                cprintf!(
                    env.sh.con,
                    "% Unknown alias \"{}\" (\"show alias\" to list names)\r\n",
                    name
                );
                Err(CmdError::Failed)
            }
        },
    }
}
