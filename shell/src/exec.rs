//! Background command execution and interruptible delays.
//!
//! A command whose line ends with `&` runs on its own task, pinned to the
//! shell core, inheriting the spawner's directory and context. The record's
//! reference count is raised for the task and dropped when it finishes.
//!
//! Cancellation is cooperative: `kill` sends a task notification and every
//! long wait in a handler goes through [`delay_interruptible`], which
//! returns early when anything arrives. Foreground commands additionally
//! poll the console and abort on any keypress.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;

use espshell_drivers::DELAY_INFINITE;
use espshell_lib::millis;
use espshell_term::cprintf;

use crate::config;
use crate::dispatch;
use crate::env::Env;
use crate::error::CmdResult;
use crate::input::{ArgView, CmdHandler, InputRecord};

/// Foreground delays longer than this are keypress-interruptible.
pub const TOO_LONG: u32 = 2999;

/// Foreground keypress poll interval, ms.
pub const DELAY_POLL: u32 = 250;

/// Spawn a task that runs `handler` on `rec`, then reports completion.
pub fn in_background(env: &Env, rec: &Arc<InputRecord>, handler: CmdHandler) -> CmdResult {
    let sh = Arc::clone(&env.sh);
    let rec = Arc::clone(rec);
    let dir = env.dir;
    let context = env.context;
    let name = String::from(rec.arg(0));
    let priority = rec.priority();

    let task_sh = Arc::clone(&sh);
    let spawned = sh.tasks.spawn(
        &name,
        config::SHELL_CORE,
        priority,
        Box::new(move || {
            let mut benv = Env {
                sh: Arc::clone(&task_sh),
                dir,
                context,
                is_foreground: false,
            };
            let view = ArgView::new(&rec);
            let ret = handler(&mut benv, &view);
            cprintf!(task_sh.con, "\r\n% Finished: \"<i>{}</>\", ", rec.display());
            match ret {
                Ok(()) => task_sh.con.print("Ok!\r\n"),
                Err(e) => match dispatch::format_error(e, &rec) {
                    Some(text) => task_sh.con.print(&text),
                    None => task_sh.con.print("Failed\r\n"),
                },
            }
            // `rec` drops here: the task's reference is released.
        }),
    );

    match spawned {
        Ok(id) => {
            cprintf!(
                env.sh.con,
                "% Background task started\r\n% Copy/paste \"<i>kill 0x{:x}</>\" to abort\r\n",
                id.0
            );
            Ok(())
        }
        Err(_) => {
            env.sh
                .con
                .print("% <e>Can not start a new task. Resources low?</>\r\n");
            Ok(())
        }
    }
}

/// Delay for `duration_ms` (or [`DELAY_INFINITE`]), giving the user a way
/// out. Returns the actual time spent; a return value equal to the request
/// means the delay ran to completion — callers rely on that to distinguish
/// interruption.
pub fn delay_interruptible(env: &Env, duration_ms: u32) -> u32 {
    let started = millis();

    // Background tasks wait for a signal from `kill`; keypresses belong to
    // the foreground shell.
    if !env.is_foreground {
        return match env.sh.tasks.wait_notify(duration_ms) {
            Some(_) => millis().saturating_sub(started) as u32,
            None => duration_ms,
        };
    }

    let mut remaining = duration_ms;
    if duration_ms > TOO_LONG {
        while remaining >= DELAY_POLL {
            if remaining != DELAY_INFINITE {
                remaining -= DELAY_POLL;
            }
            env.sh.tasks.sleep_ms(DELAY_POLL);
            if env.sh.con.anykey_pressed() {
                return millis().saturating_sub(started) as u32;
            }
        }
    }
    if remaining > 0 && remaining != DELAY_INFINITE {
        env.sh.tasks.sleep_ms(remaining);
    }
    duration_ms
}

/// Did a delay return early?
pub fn was_interrupted(requested: u32, actual: u32) -> bool {
    actual != requested
}
