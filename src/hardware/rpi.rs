// ================================
// src/hardware/rpi.rs - Raspberry Pi backend over rppal
// ================================
use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin};

use super::{DigitalInput, DigitalOutput, MonotonicClock, Platform, Pull, PulseOutput};
use crate::error::HardwareError;

pub struct RpiPlatform {
    gpio: Gpio,
    clock: MonotonicClock,
}

impl RpiPlatform {
    /// Open the GPIO character device.
    pub fn open() -> Result<Self, HardwareError> {
        let gpio = Gpio::new().map_err(|e| HardwareError::Unavailable(e.to_string()))?;
        Ok(Self {
            gpio,
            clock: MonotonicClock::new(),
        })
    }
}

pub struct RpiOutput(OutputPin);

impl DigitalOutput for RpiOutput {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }
}

pub struct RpiInput(InputPin);

impl DigitalInput for RpiInput {
    fn is_high(&self) -> bool {
        self.0.is_high()
    }
}

/// Software PWM on a plain output line.
pub struct RpiPulse {
    line: u8,
    pin: OutputPin,
}

impl PulseOutput for RpiPulse {
    fn set_pulse(&mut self, width_us: u32, period_us: u32) -> Result<(), HardwareError> {
        self.pin
            .set_pwm(
                Duration::from_micros(period_us as u64),
                Duration::from_micros(width_us as u64),
            )
            .map_err(|e| HardwareError::Pwm {
                line: self.line,
                reason: e.to_string(),
            })
    }

    fn release(&mut self) -> Result<(), HardwareError> {
        self.pin.clear_pwm().map_err(|e| HardwareError::Pwm {
            line: self.line,
            reason: e.to_string(),
        })?;
        self.pin.set_low();
        Ok(())
    }
}

impl Platform for RpiPlatform {
    type Output = RpiOutput;
    type Input = RpiInput;
    type Pulse = RpiPulse;
    type Clock = MonotonicClock;

    fn output(&mut self, line: u8) -> Result<RpiOutput, HardwareError> {
        let pin = self.gpio.get(line).map_err(|e| HardwareError::Gpio {
            line,
            reason: e.to_string(),
        })?;
        Ok(RpiOutput(pin.into_output_low()))
    }

    fn input(&mut self, line: u8, pull: Pull) -> Result<RpiInput, HardwareError> {
        let pin = self.gpio.get(line).map_err(|e| HardwareError::Gpio {
            line,
            reason: e.to_string(),
        })?;
        let pin = match pull {
            Pull::None => pin.into_input(),
            Pull::Up => pin.into_input_pullup(),
            Pull::Down => pin.into_input_pulldown(),
        };
        Ok(RpiInput(pin))
    }

    fn pulse(&mut self, line: u8) -> Result<RpiPulse, HardwareError> {
        let pin = self.gpio.get(line).map_err(|e| HardwareError::Gpio {
            line,
            reason: e.to_string(),
        })?;
        Ok(RpiPulse {
            line,
            pin: pin.into_output_low(),
        })
    }

    fn clock(&self) -> MonotonicClock {
        self.clock
    }
}
