//! The `pwm` command and the `show pwm` table.

use espshell_drivers::PWM_MAX_FREQUENCY;
use espshell_lib::numparse;
use espshell_term::cprintf;

use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::input::ArgView;

// "pwm PIN FREQ [DUTY]" starts, "pwm PIN" / "pwm PIN 0" stops.
pub fn cmd_pwm(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    if args.argc() < 2 {
        return Err(CmdError::MissingArg);
    }
    let Some(pin) = numparse::parse_u32(args.arg(1)) else {
        return Err(CmdError::BadArg(1));
    };
    if pin >= env.sh.gpio.pin_count() as u32 {
        return Err(CmdError::BadArg(1));
    }
    let pin = pin as u8;

    let freq = match args.get(2) {
        None => 0,
        Some(tok) => match numparse::parse_u32(tok) {
            Some(f) if f <= PWM_MAX_FREQUENCY => f,
            _ => return Err(CmdError::BadArg(2)),
        },
    };

    if freq == 0 {
        let _ = env.sh.pwm.detach(pin);
        return Ok(());
    }

    let duty = match args.get(3) {
        None => 0.5,
        Some(tok) => match numparse::parse_f32(tok) {
            Some(d) if (0.0..=1.0).contains(&d) => d,
            _ => return Err(CmdError::BadArg(3)),
        },
    };

    match env.sh.pwm.attach(pin, freq, duty) {
        Ok(channel) => {
            cprintf!(
                env.sh.con,
                "% PWM on GPIO{}: {} Hz, duty {:.0}% (channel {})\r\n",
                pin,
                freq,
                duty * 100.0,
                channel
            );
            Ok(())
        }
        Err(e) => {
            cprintf!(env.sh.con, "% <e>PWM failed: {}</>\r\n", e);
            Err(CmdError::Failed)
        }
    }
}

// "show pwm"
pub fn show_pwm(env: &Env) -> CmdResult {
    env.sh.con.print(
        "%      -- Currently active PWM generators --\r\n\
         %<r>  GPIO | Frequency | DutyAbs | Duty (%) | Channel </>\r\n\
         % ------+-----------+---------+----------+---------\r\n",
    );
    let pwm = &env.sh.pwm;
    for pin in 0..env.sh.gpio.pin_count() {
        let freq = pwm.read_freq(pin);
        if freq == 0 {
            continue;
        }
        let duty = pwm.read_duty(pin);
        let duty_max = (1u32 << pwm.resolution_bits(pin)) - 1;
        let percent = (duty as f32 / duty_max as f32) * 100.0;
        let channel = pwm.channel(pin).unwrap_or(0);
        cprintf!(
            env.sh.con,
            "%   {:>3} | {:>9} | {:>7} | {:>8.0} | {}\r\n",
            pin,
            freq,
            duty,
            percent,
            channel
        );
    }
    Ok(())
}
