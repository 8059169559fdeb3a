// ================================
// src/sonar.rs - ultrasonic ranging
// ================================
use std::time::Duration;

use tracing::warn;

use crate::error::SonarError;
use crate::hardware::{Clock, DigitalInput, DigitalOutput};

/// Speed of sound in air at ~20 °C.
pub const SPEED_OF_SOUND_M_S: f64 = 343.2;

/// Width of the trigger pulse that starts one measurement.
pub const TRIGGER_PULSE_US: u64 = 10;

/// Default bound on each echo phase, ~5 m of round trip.
pub const DEFAULT_TIMEOUT_US: u64 = 30_000;

/// Anything that can produce one distance reading on demand.
pub trait RangeFinder {
    /// Distance to the nearest reflector in meters.
    fn get_distance(&mut self) -> Result<f64, SonarError>;
}

/// Converts an echo-high duration into a one-way distance.
pub fn echo_to_distance(echo_us: u64) -> f64 {
    echo_us as f64 * (SPEED_OF_SOUND_M_S / 1_000_000.0) / 2.0
}

/// Trigger/echo ultrasonic sensor (HC-SR04 style).
///
/// Each call to [`RangeFinder::get_distance`] issues exactly one trigger
/// pulse and busy-polls the echo line twice: once for the rising edge and
/// once for the falling edge. Each phase has its own deadline of
/// `timeout_us`, so a call blocks for at most twice the timeout.
pub struct Sonar<T, E, C> {
    trigger: T,
    echo: E,
    clock: C,
    timeout_us: u64,
}

impl<T, E, C> Sonar<T, E, C>
where
    T: DigitalOutput,
    E: DigitalInput,
    C: Clock,
{
    pub fn new(mut trigger: T, echo: E, clock: C, timeout_us: u64) -> Self {
        trigger.set_low();
        Self {
            trigger,
            echo,
            clock,
            timeout_us,
        }
    }

    pub fn timeout_us(&self) -> u64 {
        self.timeout_us
    }

    fn ping(&mut self) {
        self.trigger.set_high();
        self.clock.sleep(Duration::from_micros(TRIGGER_PULSE_US));
        self.trigger.set_low();
    }

    /// Width of the echo pulse in microseconds.
    fn pong(&self) -> Result<u64, SonarError> {
        let start = self.clock.now_us();
        while self.echo.is_low() {
            let waited_us = self.clock.elapsed_since(start);
            if waited_us >= self.timeout_us {
                return Err(SonarError::EchoStartTimeout { waited_us });
            }
        }

        let rise = self.clock.now_us();
        while self.echo.is_high() {
            let waited_us = self.clock.elapsed_since(rise);
            if waited_us >= self.timeout_us {
                return Err(SonarError::EchoEndTimeout { waited_us });
            }
        }

        Ok(self.clock.elapsed_since(rise))
    }
}

impl<T, E, C> RangeFinder for Sonar<T, E, C>
where
    T: DigitalOutput,
    E: DigitalInput,
    C: Clock,
{
    fn get_distance(&mut self) -> Result<f64, SonarError> {
        self.ping();
        match self.pong() {
            Ok(echo_us) => Ok(echo_to_distance(echo_us)),
            Err(e) => {
                warn!("sonar: {}", e);
                Err(e)
            }
        }
    }
}
