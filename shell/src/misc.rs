//! Small state commands: echo, colors, history, tty, uptime, hostid, exit.

use core::sync::atomic::Ordering;

use espshell_lib::{numparse, plural_suffix, prefix_match};
use espshell_term::console::{ColorMode, EchoMode};
use espshell_term::cprintf;

use crate::config;
use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::input::ArgView;
use crate::keywords::KEYWORDS_MAIN;

// "echo on|off|silent"
pub fn cmd_echo(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    match args.get(1) {
        None => {
            let mode = match env.sh.con.echo_mode() {
                EchoMode::On => "on",
                EchoMode::Off => "off",
                EchoMode::Silent => "silent",
            };
            cprintf!(env.sh.con, "% Echo is \"{}\"\r\n", mode);
            Ok(())
        }
        Some(tok) if prefix_match(tok, "on") => {
            env.sh.con.set_echo_mode(EchoMode::On);
            Ok(())
        }
        Some(tok) if prefix_match(tok, "off") => {
            env.sh.con.set_echo_mode(EchoMode::Off);
            Ok(())
        }
        Some(tok) if prefix_match(tok, "silent") => {
            env.sh.con.set_echo_mode(EchoMode::Silent);
            Ok(())
        }
        Some(_) => Err(CmdError::BadArg(1)),
    }
}

// "colors on|off|auto"
pub fn cmd_colors(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    match args.get(1) {
        None => {
            let mode = match env.sh.con.color_mode() {
                ColorMode::On => "on",
                ColorMode::Off => "off",
                ColorMode::Auto => "auto",
            };
            cprintf!(env.sh.con, "% Color is \"{}\"\r\n", mode);
            Ok(())
        }
        Some(tok) if prefix_match(tok, "auto") => {
            env.sh.con.set_color_mode(ColorMode::Auto);
            Ok(())
        }
        Some(tok) if prefix_match(tok, "on") => {
            env.sh.con.set_color_mode(ColorMode::On);
            Ok(())
        }
        Some(tok) if prefix_match(tok, "off") => {
            env.sh.con.set_color_mode(ColorMode::Off);
            Ok(())
        }
        Some(_) => Err(CmdError::BadArg(1)),
    }
}

// "history [on|off]"
pub fn cmd_history(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    match args.get(1) {
        None => {
            cprintf!(
                env.sh.con,
                "% History is \"{}\"\r\n",
                if env.sh.con.history_enabled() { "on" } else { "off" }
            );
            Ok(())
        }
        Some(tok) if prefix_match(tok, "on") => {
            env.sh.con.set_history_enabled(true);
            Ok(())
        }
        Some(tok) if prefix_match(tok, "off") => {
            env.sh.con.set_history_enabled(false);
            Ok(())
        }
        Some(_) => Err(CmdError::BadArg(1)),
    }
}

// "tty NUM"
pub fn cmd_tty(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let Some(n) = numparse::parse_u32(args.arg(1)) else {
        return Err(CmdError::BadArg(1));
    };
    if n > u8::MAX as u32 {
        return Err(CmdError::BadArg(1));
    }
    // Goodbye on the old device, hello on the new one.
    env.sh.con.print("% See you there\r\n");
    if env.sh.con.select(n as u8) {
        env.sh.con.print("% Shell console is here now\r\n");
        Ok(())
    } else {
        cprintf!(env.sh.con, "% No console device \"{}\" registered\r\n", n);
        Err(CmdError::Failed)
    }
}

// "uptime"
pub fn cmd_uptime(env: &mut Env, _args: &ArgView<'_>) -> CmdResult {
    let ms = env.sh.uptime_ms();
    let secs = ms / 1000;
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    let mut out = alloc::string::String::from("% Up ");
    if days > 0 {
        out.push_str(&alloc::format!("{} day{} ", days, plural_suffix(days)));
    }
    if hours > 0 {
        out.push_str(&alloc::format!("{} hour{} ", hours, plural_suffix(hours)));
    }
    if minutes > 0 {
        out.push_str(&alloc::format!(
            "{} minute{} ",
            minutes,
            plural_suffix(minutes)
        ));
    }
    out.push_str(&alloc::format!(
        "{} second{}\r\n",
        seconds,
        plural_suffix(seconds)
    ));
    env.sh.con.print(&out);
    Ok(())
}

// "hostid [NAME]"
pub fn cmd_hostid(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    match args.get(1) {
        None => {
            let id = env.sh.hostid();
            if id.is_empty() {
                env.sh.con.print("% Host identifier is not set\r\n");
            } else {
                cprintf!(env.sh.con, "% Host identifier: \"{}\"\r\n", id);
            }
            Ok(())
        }
        Some(name) => {
            if name.len() > 16 {
                env.sh
                    .con
                    .print("% Host identifier is limited to 16 characters\r\n");
                return Err(CmdError::BadArg(1));
            }
            if env.sh.storage.kv_set(config::HOSTID_KEY, name).is_err() {
                env.sh.con.print("% <e>Failed to persist the identifier</>\r\n");
                return Err(CmdError::Failed);
            }
            cprintf!(env.sh.con, "% Host identifier set to \"{}\"\r\n", name);
            Ok(())
        }
    }
}

// "exit" / "exit exit"
pub fn cmd_exit(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    if !env.in_main() {
        // Leave the sub-directory, keep the context value as-is.
        let context = env.context;
        env.change_directory(context, &KEYWORDS_MAIN, None);
        return Ok(());
    }
    if args.get(1).is_some_and(|a| prefix_match(a, "exit")) {
        env.sh.exit_requested.store(true, Ordering::Release);
    } else {
        env.sh
            .con
            .print("% Not in a subdirectory; (to close the shell type \"exit ex\")\r\n");
    }
    Ok(())
}
