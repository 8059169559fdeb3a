// ================================
// src/hardware/mod.rs - hardware seam
// ================================
//! The core only needs digital reads/writes, a servo pulse train and a
//! monotonic clock. Backends live in submodules:
//! - `rpi` drives real lines through `rppal` (feature `rpi`)
//! - `mock` scripts lines and time for host tests
//! - `unavailable` is used when no backend is compiled in
//!
//! # Ownership
//!
//! Every line handle has exactly one owner. Commanders take their sensor,
//! mount and clock by value and are driven from a single thread.

use std::time::{Duration, Instant};

use crate::error::HardwareError;

pub mod mock;
#[cfg(feature = "rpi")]
pub mod rpi;
pub mod unavailable;

/// Bias applied to an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

/// Push-pull output line.
pub trait DigitalOutput {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// Input line.
pub trait DigitalInput {
    /// Returns `true` while the line reads logic level 1.
    fn is_high(&self) -> bool;

    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Repeating pulse train, as used by hobby servos.
pub trait PulseOutput {
    /// Emit a `width_us` high pulse every `period_us` until changed.
    fn set_pulse(&mut self, width_us: u32, period_us: u32) -> Result<(), HardwareError>;

    /// Stop the pulse train and leave the line low.
    fn release(&mut self) -> Result<(), HardwareError>;
}

/// Monotonic time source used for echo timing and settle waits.
pub trait Clock: Clone {
    /// Microseconds since an arbitrary fixed origin.
    fn now_us(&self) -> u64;

    /// Block the calling thread.
    fn sleep(&self, duration: Duration);

    /// Elapsed microseconds since `reference_us`, saturating at zero.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

/// Wall-clock independent time backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Source of line handles, addressed by BCM line number.
///
/// Acquisition failures are fatal initialisation errors; callers must not
/// retry or start the control loop.
pub trait Platform {
    type Output: DigitalOutput + 'static;
    type Input: DigitalInput + 'static;
    type Pulse: PulseOutput + 'static;
    type Clock: Clock + 'static;

    fn output(&mut self, line: u8) -> Result<Self::Output, HardwareError>;
    fn input(&mut self, line: u8, pull: Pull) -> Result<Self::Input, HardwareError>;
    fn pulse(&mut self, line: u8) -> Result<Self::Pulse, HardwareError>;
    fn clock(&self) -> Self::Clock;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_us();
        clock.sleep(Duration::from_micros(200));
        let b = clock.now_us();
        assert!(b >= a + 200);
        assert!(clock.elapsed_since(b + 1_000_000) == 0);
    }
}
