// ================================
// src/error.rs - rover error types
// ================================
use thiserror::Error;

/// Failures while binding to GPIO lines or the PWM output.
///
/// These only occur at construction time and are fatal: the control loop
/// must not start with a half-initialised rover.
#[derive(Debug, Error)]
pub enum HardwareError {
    /// A digital line could not be claimed.
    #[error("failed to claim gpio line {line}: {reason}")]
    Gpio {
        /// BCM line number.
        line: u8,
        /// Backend error message.
        reason: String,
    },

    /// A pulse train could not be started on a line.
    #[error("failed to drive pulses on gpio line {line}: {reason}")]
    Pwm {
        /// BCM line number.
        line: u8,
        /// Backend error message.
        reason: String,
    },

    /// No GPIO backend was compiled in or the chip could not be opened.
    #[error("gpio unavailable: {0}")]
    Unavailable(String),
}

/// A single ping that produced no usable echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SonarError {
    /// The echo line never went high.
    #[error("echo never started within {waited_us} us")]
    EchoStartTimeout {
        /// Time spent polling before giving up.
        waited_us: u64,
    },

    /// The echo line went high but never dropped back.
    #[error("echo never ended within {waited_us} us")]
    EchoEndTimeout {
        /// Time spent polling before giving up.
        waited_us: u64,
    },
}
