//! Line commands typed on stdin

use std::str::FromStr;

use vehicle_telemetry_core::error::SimError;
use vehicle_telemetry_core::vehicle::ControlSurface;

/// One driver command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Throttle(bool),
    Brake(bool),
    /// Release both pedals
    Coast,
    ToggleEngine,
    ShiftUp,
    ShiftDown,
    Reset,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace().map(str::to_lowercase);
        let verb = words.next().ok_or_else(|| "empty command".to_string())?;
        let arg = words.next();
        if let Some(extra) = words.next() {
            return Err(format!("unexpected argument '{extra}'"));
        }

        let pedal = |arg: Option<&str>| -> Result<bool, String> {
            match arg {
                None | Some("on") => Ok(true),
                Some("off") => Ok(false),
                Some(other) => Err(format!("expected 'on' or 'off', got '{other}'")),
            }
        };

        let command = match verb.as_str() {
            "gas" | "throttle" | "w" => Command::Throttle(pedal(arg.as_deref())?),
            "brake" | "s" => Command::Brake(pedal(arg.as_deref())?),
            "coast" | "c" => Command::Coast,
            "engine" | "e" => Command::ToggleEngine,
            "up" | "+" => Command::ShiftUp,
            "down" | "-" => Command::ShiftDown,
            "reset" | "r" => Command::Reset,
            "status" | "?" => Command::Status,
            "help" | "h" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command '{other}'")),
        };

        if arg.is_some() && !matches!(command, Command::Throttle(_) | Command::Brake(_)) {
            return Err(format!("'{verb}' takes no argument"));
        }
        Ok(command)
    }
}

impl Command {
    /// Forward a driving command to the control surface
    ///
    /// Returns `false` for commands the front end handles itself.
    pub fn apply(self, controls: &ControlSurface) -> Result<bool, SimError> {
        match self {
            Command::Throttle(on) => controls.set_throttle(on),
            Command::Brake(on) => controls.set_brake(on),
            Command::Coast => {
                controls.set_throttle(false);
                controls.set_brake(false);
            }
            Command::ToggleEngine => controls.toggle_engine(),
            Command::ShiftUp => controls.shift_gear(1)?,
            Command::ShiftDown => controls.shift_gear(-1)?,
            Command::Reset => controls.reset(),
            Command::Status | Command::Help | Command::Quit => return Ok(false),
        }
        Ok(true)
    }
}

pub const HELP: &str = "\
commands:
  gas [on|off]     (w)   hold or release the throttle
  brake [on|off]   (s)   hold or release the brake
  coast            (c)   release both pedals
  engine           (e)   toggle the engine
  up / down        (+/-) shift one gear
  reset            (r)   return to the startup state
  status           (?)   print the current snapshot
  quit             (q)   stop the simulator";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_pedals() {
        assert_eq!("gas".parse::<Command>(), Ok(Command::Throttle(true)));
        assert_eq!("GAS off".parse::<Command>(), Ok(Command::Throttle(false)));
        assert_eq!("s on".parse::<Command>(), Ok(Command::Brake(true)));
        assert!("brake maybe".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("+".parse::<Command>(), Ok(Command::ShiftUp));
        assert_eq!("-".parse::<Command>(), Ok(Command::ShiftDown));
        assert_eq!(" e ".parse::<Command>(), Ok(Command::ToggleEngine));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Command>().is_err());
        assert!("fly".parse::<Command>().is_err());
        assert!("engine now".parse::<Command>().is_err());
        assert!("gas on now".parse::<Command>().is_err());
    }

    #[test]
    fn test_apply_reaches_controls() {
        let controls = ControlSurface::new();
        assert!(Command::Throttle(true).apply(&controls).unwrap());
        assert!(Command::ShiftUp.apply(&controls).unwrap());
        assert!(!Command::Status.apply(&controls).unwrap());

        let frame = controls.take_frame();
        assert!(frame.throttle_held);
        assert_eq!(frame.shifts, vec![1]);
    }

    #[test]
    fn test_coast_releases_both() {
        let controls = ControlSurface::new();
        Command::Throttle(true).apply(&controls).unwrap();
        Command::Brake(true).apply(&controls).unwrap();
        Command::Coast.apply(&controls).unwrap();

        let frame = controls.take_frame();
        assert!(!frame.throttle_held);
        assert!(!frame.brake_held);
    }
}
