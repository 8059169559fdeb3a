// ================================
// src/hardware/unavailable.rs - platform for builds without gpio
// ================================
//! Only the terminal commander can run on it; any line claim fails so that
//! hardware-backed commanders stop at construction.

use std::convert::Infallible;

use super::{DigitalInput, DigitalOutput, MonotonicClock, Platform, Pull, PulseOutput};
use crate::error::HardwareError;

#[derive(Debug, Default)]
pub struct NoGpio;

/// Line type that can never be constructed.
pub struct NoLine(Infallible);

impl DigitalOutput for NoLine {
    fn set_high(&mut self) {
        match self.0 {}
    }

    fn set_low(&mut self) {
        match self.0 {}
    }
}

impl DigitalInput for NoLine {
    fn is_high(&self) -> bool {
        match self.0 {}
    }
}

impl PulseOutput for NoLine {
    fn set_pulse(&mut self, _width_us: u32, _period_us: u32) -> Result<(), HardwareError> {
        match self.0 {}
    }

    fn release(&mut self) -> Result<(), HardwareError> {
        match self.0 {}
    }
}

fn unavailable(line: u8) -> HardwareError {
    HardwareError::Unavailable(format!(
        "line {line} requested but no gpio backend was built (enable the `rpi` feature)"
    ))
}

impl Platform for NoGpio {
    type Output = NoLine;
    type Input = NoLine;
    type Pulse = NoLine;
    type Clock = MonotonicClock;

    fn output(&mut self, line: u8) -> Result<NoLine, HardwareError> {
        Err(unavailable(line))
    }

    fn input(&mut self, line: u8, _pull: Pull) -> Result<NoLine, HardwareError> {
        Err(unavailable(line))
    }

    fn pulse(&mut self, line: u8) -> Result<NoLine, HardwareError> {
        Err(unavailable(line))
    }

    fn clock(&self) -> MonotonicClock {
        MonotonicClock::new()
    }
}
