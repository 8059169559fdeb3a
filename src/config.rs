// ================================
// src/config.rs - rover parameters
// ================================
use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::{env, fs};

use crate::commander::CommanderKind;
use crate::sonar::DEFAULT_TIMEOUT_US;

const DEFAULT_CONFIG_PATH: &str = "./rover_param.toml";

/// Rover configuration loaded from a TOML file.
///
/// Read once at startup; thresholds are not re-tuned while running.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RoverParams {
    // Which command source drives the rover
    pub commander: CommanderKind,
    // Driver loop period
    pub control_period_ms: u64,
    // Debug options
    pub debug_mode: bool,

    pub sonar: SonarParams,
    pub steering: SteeringParams,
    pub avoidance: AvoidanceParams,
    pub search: SearchParams,
    pub infrared: InfraredParams,
    pub joystick: JoystickParams,
}

/// Ultrasonic sensor wiring and timing.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SonarParams {
    pub trigger_pin: u8,
    pub echo_pin: u8,
    /// Bound on each echo phase.
    pub timeout_us: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SteeringParams {
    pub control_pin: u8,
}

/// Steering + sonar obstacle avoidance.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AvoidanceParams {
    /// Below this front-cone distance the rover must stop and look around.
    pub safe_distance_low: f64,
    /// Verify with a short CHECK sweep on the tick after a WALK decision.
    pub light_check: bool,
}

/// Fixed sonar with widening zigzag search.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SearchParams {
    pub safe_distance_low: f64,
    /// Distance needed to resume walking; the gap to `low` is the dead band.
    pub safe_distance_high: f64,
    /// Longest run of one turn direction in the zigzag table.
    pub max_run: u32,
}

/// Infrared line sensor lines p1..p4, left to right.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct InfraredParams {
    pub pins: [u8; 4],
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct JoystickParams {
    pub device: String,
    /// Commander that takes over while the autopilot button is held.
    pub autopilot: CommanderKind,
}

impl Default for RoverParams {
    fn default() -> Self {
        Self {
            commander: CommanderKind::SteeringSonar,
            control_period_ms: 100,
            debug_mode: false,
            sonar: SonarParams::default(),
            steering: SteeringParams::default(),
            avoidance: AvoidanceParams::default(),
            search: SearchParams::default(),
            infrared: InfraredParams::default(),
            joystick: JoystickParams::default(),
        }
    }
}

impl Default for SonarParams {
    fn default() -> Self {
        Self {
            trigger_pin: 14,
            echo_pin: 15,
            timeout_us: DEFAULT_TIMEOUT_US,
        }
    }
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self { control_pin: 18 }
    }
}

impl Default for AvoidanceParams {
    fn default() -> Self {
        Self {
            safe_distance_low: 0.4,
            light_check: false,
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            safe_distance_low: 0.5,
            safe_distance_high: 0.8,
            max_run: 32,
        }
    }
}

impl Default for InfraredParams {
    fn default() -> Self {
        Self {
            pins: [25, 8, 7, 1],
        }
    }
}

impl Default for JoystickParams {
    fn default() -> Self {
        Self {
            device: "/dev/input/js0".to_string(),
            autopilot: CommanderKind::Sonar,
        }
    }
}

impl RoverParams {
    /// Load parameters from the TOML file named by `CONFIG_PATH`.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &str) -> Result<Self> {
        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file {}", config_path))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("invalid config file {}", config_path))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let params: Self = toml::from_str(config_str)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.control_period_ms > 0, "control_period_ms must be positive");
        ensure!(self.sonar.timeout_us > 0, "sonar.timeout_us must be positive");
        ensure!(
            self.avoidance.safe_distance_low > 0.0,
            "avoidance.safe_distance_low must be positive"
        );
        ensure!(
            self.search.safe_distance_low > 0.0,
            "search.safe_distance_low must be positive"
        );
        ensure!(
            self.search.safe_distance_high >= self.search.safe_distance_low,
            "search.safe_distance_high ({}) is below safe_distance_low ({})",
            self.search.safe_distance_high,
            self.search.safe_distance_low
        );
        ensure!(self.search.max_run > 0, "search.max_run must be positive");
        ensure!(
            self.joystick.autopilot.is_autonomous(),
            "joystick.autopilot must be an autonomous commander, got {}",
            self.joystick.autopilot
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let params = RoverParams::from_toml_str("").unwrap();
        assert_eq!(params.commander, CommanderKind::SteeringSonar);
        assert_eq!(params.control_period_ms, 100);
        assert_eq!(params.sonar.trigger_pin, 14);
        assert_eq!(params.sonar.echo_pin, 15);
        assert_eq!(params.sonar.timeout_us, DEFAULT_TIMEOUT_US);
        assert_eq!(params.avoidance.safe_distance_low, 0.4);
        assert_eq!(params.infrared.pins, [25, 8, 7, 1]);
        assert_eq!(params.joystick.autopilot, CommanderKind::Sonar);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let params = RoverParams::from_toml_str(
            r#"
            commander = "sonar"

            [search]
            safe_distance_low = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(params.commander, CommanderKind::Sonar);
        assert_eq!(params.search.safe_distance_low, 0.3);
        assert_eq!(params.search.safe_distance_high, 0.8);
        assert_eq!(params.search.max_run, 32);
    }

    #[test]
    fn shipped_config_parses() {
        let params =
            RoverParams::from_toml_str(include_str!("../rover_param.toml")).unwrap();
        assert_eq!(params.steering.control_pin, 18);
        assert!(!params.avoidance.light_check);
    }

    #[test]
    fn rejects_inverted_dead_band() {
        let err = RoverParams::from_toml_str(
            r#"
            [search]
            safe_distance_low = 0.9
            safe_distance_high = 0.5
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("safe_distance_high"));
    }

    #[test]
    fn rejects_manual_autopilot() {
        let result = RoverParams::from_toml_str(
            r#"
            [joystick]
            autopilot = "terminal"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_commander() {
        assert!(RoverParams::from_toml_str(r#"commander = "lidar""#).is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = RoverParams::load_from("/nonexistent/rover.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/rover.toml"));
    }
}
