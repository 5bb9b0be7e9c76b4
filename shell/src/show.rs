//! The `show` command: one front door to every subsystem's status display.

use espshell_lib::{numparse, prefix_match};
use espshell_term::cprintf;

use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::input::ArgView;
use crate::{alias, count, event, pin, pwm, sequence};

// "show pwm|counters|ifs|alias [NAME]|sequence N|history|pin N"
pub fn cmd_show(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let Some(what) = args.get(1) else {
        return Err(CmdError::MissingArg);
    };

    if prefix_match(what, "pwm") {
        pwm::show_pwm(env)
    } else if prefix_match(what, "counters") {
        count::show_counters(env)
    } else if prefix_match(what, "ifs") {
        event::cmd_show_ifs(env, args)
    } else if prefix_match(what, "alias") {
        alias::cmd_show_alias(env, args)
    } else if prefix_match(what, "sequence") {
        let Some(n) = args.get(2).and_then(numparse::parse_u32) else {
            return Err(CmdError::BadArg(2));
        };
        sequence::show_sequence(env, n as usize)
    } else if prefix_match(what, "history") {
        show_history(env)
    } else if prefix_match(what, "pin") {
        let Some(n) = args.get(2).and_then(numparse::parse_u32) else {
            return Err(CmdError::BadArg(2));
        };
        if n > u8::MAX as u32 {
            return Err(CmdError::BadArg(2));
        }
        pin::show_pin(env, n as u8)
    } else {
        Err(CmdError::BadArg(1))
    }
}

fn show_history(env: &Env) -> CmdResult {
    let history = env.sh.con.history().lock();
    if history.is_empty() {
        env.sh.con.print("% History is empty\r\n");
        return Ok(());
    }
    for (i, line) in history.iter().enumerate() {
        cprintf!(env.sh.con, "% {:>3}: {}\r\n", i + 1, line);
    }
    Ok(())
}
