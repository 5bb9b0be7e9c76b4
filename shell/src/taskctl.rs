//! Task control commands: `kill`, `suspend`, `resume`.

use espshell_drivers::{SIGNAL_HUP, SIGNAL_KILL, SIGNAL_TERM, TaskId};
use espshell_lib::numparse::parse_hex_id;
use espshell_term::cprintf;

use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::input::ArgView;

/// Is `id` something we are allowed to manipulate? The shell's own task is
/// off limits, and the id must name a live task.
fn taskid_good(env: &Env, id: TaskId) -> bool {
    if *env.sh.shell_task.lock() == Some(id) {
        cprintf!(
            env.sh.con,
            "% Task <i>0x{:x}</> is the main espshell task, access denied :)\r\n",
            id.0
        );
        return false;
    }
    if !env.sh.tasks.exists(id) {
        env.sh
            .con
            .print("% No such task. Task ID is a <i>hex number</>, e.g. \"0x5566\"\r\n");
        return false;
    }
    true
}

fn parse_taskid(arg: &str) -> Option<TaskId> {
    parse_hex_id(arg).map(TaskId)
}

// "kill [-term|-kill|-hup|-15|-9|-1] TASK_ID"
pub fn cmd_kill(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let mut i = 1;
    let mut signal = SIGNAL_TERM;

    if args.argc() < 2 {
        return Err(CmdError::MissingArg);
    }

    let first = args.arg(1);
    if let Some(opt) = first.strip_prefix('-') {
        signal = match opt {
            "term" | "t" | "15" => SIGNAL_TERM,
            "hup" | "h" | "1" => SIGNAL_HUP,
            "kill" | "k" | "9" => SIGNAL_KILL,
            _ => return Err(CmdError::BadArg(1)),
        };
        i += 1;
    }

    let Some(id_arg) = args.get(i) else {
        return Err(CmdError::MissingArg);
    };
    let Some(id) = parse_taskid(id_arg) else {
        return Err(CmdError::BadArg(i));
    };
    if !taskid_good(env, id) {
        return Err(CmdError::Failed);
    }

    if signal == SIGNAL_KILL {
        // Forced deletion: suspend first, let the scheduler settle, delete.
        // Resources owned by the task leak; that is the documented price.
        let _ = env.sh.tasks.suspend(id);
        env.sh.tasks.sleep_ms(1);
        let _ = env.sh.tasks.delete(id);
        cprintf!(
            env.sh.con,
            "% Killed: \"0x{:x}\". Resources are not freed!\r\n",
            id.0
        );
    } else if env.sh.tasks.notify(id, signal).is_err() {
        return Err(CmdError::BadArg(i));
    }
    Ok(())
}

// "suspend [TASK_ID]" — with no argument, suspends the sketch task.
pub fn cmd_suspend(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let target = match args.get(1) {
        Some(arg) => {
            let Some(id) = parse_taskid(arg) else {
                return Err(CmdError::BadArg(1));
            };
            if !taskid_good(env, id) {
                return Err(CmdError::Failed);
            }
            id
        }
        None => match *env.sh.sketch_task.lock() {
            Some(id) => id,
            None => {
                env.sh
                    .con
                    .print("% No sketch task registered, nothing to suspend\r\n");
                return Err(CmdError::Failed);
            }
        },
    };
    let _ = env.sh.tasks.suspend(target);
    Ok(())
}

// "resume [TASK_ID]"
pub fn cmd_resume(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let target = match args.get(1) {
        Some(arg) => {
            let Some(id) = parse_taskid(arg) else {
                return Err(CmdError::BadArg(1));
            };
            if !taskid_good(env, id) {
                return Err(CmdError::Failed);
            }
            id
        }
        None => match *env.sh.sketch_task.lock() {
            Some(id) => id,
            None => {
                env.sh
                    .con
                    .print("% No sketch task registered, nothing to resume\r\n");
                return Err(CmdError::Failed);
            }
        },
    };
    let _ = env.sh.tasks.resume(target);
    Ok(())
}
