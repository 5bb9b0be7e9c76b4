//! The UART configuration directory.
//!
//! `uart N` enters the directory; its verbs operate on port N (carried in
//! the directory context) through the `UartDriver` collaborator.

use alloc::string::String;
use alloc::vec;

use espshell_drivers::UART_DEF_BAUDRATE;
use espshell_lib::numparse;
use espshell_term::cprintf;

use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::input::{ArgView, join_unescape};
use crate::keywords::KEYWORDS_UART;

fn port(env: &Env) -> u8 {
    env.context as u8
}

/// Most verbs need the driver installed first.
fn require_up(env: &Env) -> CmdResult {
    let p = port(env);
    if env.sh.uart.is_up(p) {
        Ok(())
    } else {
        cprintf!(
            env.sh.con,
            "% UART{} is down. Use command \"up\" to initialize it\r\n",
            p
        );
        Err(CmdError::Failed)
    }
}

// "uart N"
pub fn cmd_uart_if(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let Some(n) = numparse::parse_u32(args.arg(1)) else {
        return Err(CmdError::BadArg(1));
    };
    if n >= env.sh.uart.port_count() as u32 {
        cprintf!(
            env.sh.con,
            "% Valid UART numbers are 0..{}\r\n",
            env.sh.uart.port_count() - 1
        );
        return Err(CmdError::BadArg(1));
    }
    env.change_directory(n as usize, &KEYWORDS_UART, Some("UART configuration"));
    Ok(())
}

// "up [BAUD]"
pub fn cmd_uart_up(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    let baud = match args.get(1) {
        None => UART_DEF_BAUDRATE,
        Some(tok) => match numparse::parse_u32(tok) {
            Some(b) if b > 0 => b,
            _ => return Err(CmdError::BadArg(1)),
        },
    };
    match env.sh.uart.up(port(env), baud) {
        Ok(()) => {
            cprintf!(env.sh.con, "% UART{} is up, {} baud\r\n", port(env), baud);
            Ok(())
        }
        Err(e) => {
            cprintf!(env.sh.con, "% <e>UART init failed: {}</>\r\n", e);
            Err(CmdError::Failed)
        }
    }
}

// "down"
pub fn cmd_uart_down(env: &mut Env, _args: &ArgView<'_>) -> CmdResult {
    require_up(env)?;
    let _ = env.sh.uart.down(port(env));
    Ok(())
}

// "baud RATE"
pub fn cmd_uart_baud(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    require_up(env)?;
    let Some(baud) = numparse::parse_u32(args.arg(1)).filter(|b| *b > 0) else {
        return Err(CmdError::BadArg(1));
    };
    match env.sh.uart.set_baud(port(env), baud) {
        Ok(()) => Ok(()),
        Err(e) => {
            cprintf!(env.sh.con, "% <e>Baudrate change failed: {}</>\r\n", e);
            Err(CmdError::Failed)
        }
    }
}

// "read" — drain pending bytes, printable text as-is, the rest as hex.
pub fn cmd_uart_read(env: &mut Env, _args: &ArgView<'_>) -> CmdResult {
    require_up(env)?;
    let mut buf = vec![0u8; 256];
    let mut total = 0usize;
    loop {
        match env.sh.uart.read(port(env), &mut buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                let mut out = String::new();
                for &b in &buf[..n] {
                    if b == b'\n' || b == b'\r' || b == b'\t' || (0x20..0x7f).contains(&b) {
                        out.push(b as char);
                    } else {
                        out.push_str(&alloc::format!("\\x{b:02x}"));
                    }
                }
                env.sh.con.print(&out);
            }
            Err(e) => {
                cprintf!(env.sh.con, "% <e>UART read failed: {}</>\r\n", e);
                return Err(CmdError::Failed);
            }
        }
    }
    cprintf!(env.sh.con, "\r\n% {} byte(s) read\r\n", total);
    Ok(())
}

// "write TEXT..." — joined with single spaces, escapes decoded.
pub fn cmd_uart_write(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    if args.argc() < 2 {
        return Err(CmdError::MissingArg);
    }
    require_up(env)?;
    let data = join_unescape(args, 1);
    match env.sh.uart.write(port(env), &data) {
        Ok(n) => {
            cprintf!(env.sh.con, "% {} byte(s) sent\r\n", n);
            Ok(())
        }
        Err(e) => {
            cprintf!(env.sh.con, "% <e>UART write failed: {}</>\r\n", e);
            Err(CmdError::Failed)
        }
    }
}

// "tap" — bridge the console to the UART until a quiet moment and a
// keypress.
pub fn cmd_uart_tap(env: &mut Env, _args: &ArgView<'_>) -> CmdResult {
    require_up(env)?;
    let p = port(env);
    cprintf!(
        env.sh.con,
        "% Bridging console and UART{}. Press any key to finish\r\n",
        p
    );
    let mut buf = [0u8; 64];
    loop {
        // Device -> console.
        match env.sh.uart.read(p, &mut buf) {
            Ok(n) if n > 0 => env.sh.con.write_raw(&buf[..n]),
            Ok(_) => {
                // Quiet: a keypress on the console side ends the tap;
                // anything typed earlier went to the device.
                if env.sh.con.anykey_pressed() {
                    break;
                }
                env.sh.tasks.sleep_ms(10);
            }
            Err(e) => {
                cprintf!(env.sh.con, "% <e>UART read failed: {}</>\r\n", e);
                return Err(CmdError::Failed);
            }
        }
        // Console -> device.
        while env.sh.con.available() > 0 {
            let n = env.sh.con.read_bytes(&mut buf, 0);
            if n > 0 {
                let _ = env.sh.uart.write(p, &buf[..n as usize]);
            } else {
                break;
            }
        }
    }
    env.sh.con.print("\r\n% Tap finished\r\n");
    Ok(())
}
