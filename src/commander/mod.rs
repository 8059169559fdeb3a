// ================================
// src/commander/mod.rs - command sources
// ================================
use std::fmt;
use std::str::FromStr;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::config::RoverParams;
use crate::hardware::{Platform, Pull};
use crate::sonar::Sonar;
use crate::steering::SteeringGear;

pub mod avoidance;
pub mod infrared;
pub mod joystick;
pub mod search;
pub mod terminal;

pub use avoidance::SteeringSonarCommander;
pub use infrared::InfraredCommander;
pub use joystick::{Joystick, JoystickSupervisor};
pub use search::SonarCommander;
pub use terminal::TerminalCommander;

/// Drive command handed to the motor layer once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Forward,
    Backward,
    Left,
    Right,
    Brake,
}

impl Command {
    /// Wire form consumed by the drive layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Forward => "forward",
            Command::Backward => "backward",
            Command::Left => "left",
            Command::Right => "right",
            Command::Brake => "brake",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command: {0:?}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    /// Accepts the full names and their one-letter shorthands.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" | "f" => Ok(Command::Forward),
            "backward" | "b" => Ok(Command::Backward),
            "left" | "l" => Ok(Command::Left),
            "right" | "r" => Ok(Command::Right),
            "brake" => Ok(Command::Brake),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// A source of drive commands.
///
/// `scan_cmd` is called once per control period and always yields a command;
/// implementations fall back to [`Command::Brake`] when their inputs are
/// missing.
pub trait Commander {
    fn scan_cmd(&mut self) -> Command;
}

/// Configuration key selecting a [`Commander`] implementation.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommanderKind {
    Terminal,
    Infrared,
    Sonar,
    SteeringSonar,
    Joystick,
}

impl CommanderKind {
    /// Whether the commander drives without a human in the loop.
    pub fn is_autonomous(self) -> bool {
        matches!(
            self,
            CommanderKind::Infrared | CommanderKind::Sonar | CommanderKind::SteeringSonar
        )
    }

    /// Whether building this commander claims GPIO lines.
    pub fn needs_gpio(self) -> bool {
        !matches!(self, CommanderKind::Terminal | CommanderKind::Joystick)
    }
}

impl fmt::Display for CommanderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommanderKind::Terminal => "terminal",
            CommanderKind::Infrared => "infrared",
            CommanderKind::Sonar => "sonar",
            CommanderKind::SteeringSonar => "steering_sonar",
            CommanderKind::Joystick => "joystick",
        };
        f.write_str(name)
    }
}

/// Build the commander selected by `kind`, claiming its lines from `platform`.
///
/// Any line that cannot be claimed aborts construction.
pub fn make_commander<P: Platform>(
    kind: CommanderKind,
    params: &RoverParams,
    platform: &mut P,
) -> Result<Box<dyn Commander>> {
    build(kind, params, platform).with_context(|| format!("failed to build {} commander", kind))
}

fn build<P: Platform>(
    kind: CommanderKind,
    params: &RoverParams,
    platform: &mut P,
) -> Result<Box<dyn Commander>> {
    let commander: Box<dyn Commander> = match kind {
        CommanderKind::Terminal => Box::new(TerminalCommander::stdin()),
        CommanderKind::Infrared => {
            let [p1, p2, p3, p4] = params.infrared.pins;
            let lines = [
                platform.input(p1, Pull::Up)?,
                platform.input(p2, Pull::Up)?,
                platform.input(p3, Pull::Up)?,
                platform.input(p4, Pull::Up)?,
            ];
            Box::new(InfraredCommander::new(lines))
        }
        CommanderKind::Sonar => {
            let sonar = build_sonar(params, platform)?;
            Box::new(SonarCommander::new(sonar, &params.search))
        }
        CommanderKind::SteeringSonar => {
            let sonar = build_sonar(params, platform)?;
            let steering = SteeringGear::new(platform.pulse(params.steering.control_pin)?);
            Box::new(SteeringSonarCommander::new(
                sonar,
                steering,
                platform.clock(),
                &params.avoidance,
            ))
        }
        CommanderKind::Joystick => {
            ensure!(
                params.joystick.autopilot.is_autonomous(),
                "joystick autopilot must be autonomous, got {}",
                params.joystick.autopilot
            );
            let autopilot = make_commander(params.joystick.autopilot, params, platform)?;
            Box::new(JoystickSupervisor::new(
                Joystick::open(&params.joystick.device),
                autopilot,
                Box::new(TerminalCommander::stdin()),
            ))
        }
    };
    Ok(commander)
}

fn build_sonar<P: Platform>(
    params: &RoverParams,
    platform: &mut P,
) -> Result<Sonar<P::Output, P::Input, P::Clock>> {
    let trigger = platform.output(params.sonar.trigger_pin)?;
    let echo = platform.input(params.sonar.echo_pin, Pull::Down)?;
    Ok(Sonar::new(
        trigger,
        echo,
        platform.clock(),
        params.sonar.timeout_us,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::MockPlatform;
    use crate::hardware::unavailable::NoGpio;

    #[test]
    fn command_wire_names() {
        let all = [
            Command::Forward,
            Command::Backward,
            Command::Left,
            Command::Right,
            Command::Brake,
        ];
        let names: Vec<String> = all.iter().map(|c| c.to_string()).collect();
        assert_eq!(names, ["forward", "backward", "left", "right", "brake"]);
        for cmd in all {
            assert_eq!(cmd.as_str().parse::<Command>(), Ok(cmd));
        }
    }

    #[test]
    fn shorthand_commands() {
        assert_eq!("f".parse::<Command>(), Ok(Command::Forward));
        assert_eq!("b".parse::<Command>(), Ok(Command::Backward));
        assert_eq!("l".parse::<Command>(), Ok(Command::Left));
        assert_eq!("r".parse::<Command>(), Ok(Command::Right));
        assert_eq!(
            "stop".parse::<Command>(),
            Err(UnknownCommand("stop".to_string()))
        );
    }

    #[test]
    fn steering_sonar_claims_its_lines() {
        let params = RoverParams::default();
        let mut platform = MockPlatform::new().with_sonar(14, 15);
        make_commander(CommanderKind::SteeringSonar, &params, &mut platform).unwrap();
        assert_eq!(platform.claimed(), &[14, 15, 18]);
    }

    #[test]
    fn infrared_claims_four_inputs() {
        let params = RoverParams::default();
        let mut platform = MockPlatform::new();
        make_commander(CommanderKind::Infrared, &params, &mut platform).unwrap();
        assert_eq!(platform.claimed(), &[25, 8, 7, 1]);
    }

    #[test]
    fn claim_failure_is_fatal() {
        let params = RoverParams::default();
        let mut platform = MockPlatform::new().with_broken_line(15);
        let err = make_commander(CommanderKind::Sonar, &params, &mut platform)
            .err()
            .unwrap();
        let message = format!("{:#}", err);
        assert!(message.contains("sonar commander"));
        assert!(message.contains("line 15"));
    }

    #[test]
    fn no_gpio_only_allows_terminal() {
        let params = RoverParams::default();
        assert!(make_commander(CommanderKind::Terminal, &params, &mut NoGpio).is_ok());
        assert!(make_commander(CommanderKind::SteeringSonar, &params, &mut NoGpio).is_err());
    }

    #[test]
    fn kind_names_match_config_keys() {
        assert_eq!(CommanderKind::SteeringSonar.to_string(), "steering_sonar");
        assert!(CommanderKind::Sonar.is_autonomous());
        assert!(!CommanderKind::Joystick.is_autonomous());
        assert!(!CommanderKind::Terminal.needs_gpio());
    }
}
