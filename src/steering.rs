// ================================
// src/steering.rs - rotating sensor mount
// ================================
use std::time::Duration;

use tracing::debug;

use crate::error::HardwareError;
use crate::hardware::PulseOutput;

/// Servo frame length (50 Hz).
pub const SERVO_PERIOD_US: u32 = 20_000;

/// No-load slew rate of the mount: 60° per 0.13 s.
pub const SECONDS_PER_60_DEGREES: f64 = 0.13;

/// Discrete mount positions, from the rover's left to its right.
///
/// `Full` is the power-on state where no angle has been commanded yet, and
/// the state after the pulse train is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    LeftFront,
    Front,
    RightFront,
    Right,
    Full,
}

impl Direction {
    /// Every commandable angle, left to right.
    pub const SWEEP: [Direction; 5] = [
        Direction::Left,
        Direction::LeftFront,
        Direction::Front,
        Direction::RightFront,
        Direction::Right,
    ];

    /// Directions whose minimum distance gates forward motion.
    pub const FRONT_CONE: [Direction; 3] = [
        Direction::LeftFront,
        Direction::Front,
        Direction::RightFront,
    ];

    /// Servo pulse width. Only meaningful at the hardware boundary.
    pub fn pulse_width_us(self) -> u32 {
        match self {
            Direction::Left => 500,
            Direction::LeftFront => 1_000,
            Direction::Front => 1_500,
            Direction::RightFront => 2_000,
            Direction::Right => 2_500,
            Direction::Full => SERVO_PERIOD_US,
        }
    }

    /// Mount angle, 0° at the far left. `None` for [`Direction::Full`].
    pub fn degrees(self) -> Option<u32> {
        match self {
            Direction::Left => Some(0),
            Direction::LeftFront => Some(45),
            Direction::Front => Some(90),
            Direction::RightFront => Some(135),
            Direction::Right => Some(180),
            Direction::Full => None,
        }
    }

    /// `true` for positions right of center.
    pub fn is_right_side(self) -> bool {
        matches!(self.degrees(), Some(d) if d > 90)
    }
}

/// Angular travel between two positions.
///
/// Anything involving [`Direction::Full`] counts as a full 180° sweep since
/// the actual angle is unknown.
pub fn degrees_between(from: Direction, to: Direction) -> u32 {
    if from == to {
        return 0;
    }
    match (from.degrees(), to.degrees()) {
        (Some(a), Some(b)) => a.abs_diff(b),
        _ => 180,
    }
}

/// Time to wait after a move before a reading in the new direction is valid.
pub fn settle_time(degrees: u32) -> Duration {
    Duration::from_secs_f64(SECONDS_PER_60_DEGREES / 60.0 * degrees as f64)
}

/// Servo that points the sonar.
///
/// The gear has no position feedback: [`SteeringGear::get_pos`] reports the
/// last commanded direction. It never sleeps; callers wait
/// [`settle_time`] themselves.
pub struct SteeringGear<P> {
    pulse: P,
    current: Direction,
}

impl<P: PulseOutput> SteeringGear<P> {
    pub fn new(pulse: P) -> Self {
        Self {
            pulse,
            current: Direction::Full,
        }
    }

    /// Command the mount to `target` and return the degrees it will travel.
    ///
    /// A move to the current position is a no-op returning 0. Commanding
    /// [`Direction::Full`] releases the servo.
    pub fn move_to(&mut self, target: Direction) -> Result<u32, HardwareError> {
        if target == self.current {
            return Ok(0);
        }
        let degrees = degrees_between(self.current, target);
        match target {
            Direction::Full => self.pulse.release()?,
            _ => self
                .pulse
                .set_pulse(target.pulse_width_us(), SERVO_PERIOD_US)?,
        }
        debug!("steering: {:?} -> {:?} ({}°)", self.current, target, degrees);
        self.current = target;
        Ok(degrees)
    }

    pub fn get_pos(&self) -> Direction {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{MockPulse, PulseEvent};
    use approx::assert_relative_eq;

    #[test]
    fn starts_unpositioned() {
        let gear = SteeringGear::new(MockPulse::new());
        assert_eq!(gear.get_pos(), Direction::Full);
    }

    #[test]
    fn first_move_is_a_full_sweep() {
        let pulse = MockPulse::new();
        let mut gear = SteeringGear::new(pulse.clone());
        assert_eq!(gear.move_to(Direction::Front).unwrap(), 180);
        assert_eq!(gear.get_pos(), Direction::Front);
        assert_eq!(
            pulse.events(),
            vec![PulseEvent::Pulse {
                width_us: 1_500,
                period_us: SERVO_PERIOD_US
            }]
        );
    }

    #[test]
    fn repeated_move_is_free() {
        let pulse = MockPulse::new();
        let mut gear = SteeringGear::new(pulse.clone());
        gear.move_to(Direction::LeftFront).unwrap();
        assert_eq!(gear.move_to(Direction::LeftFront).unwrap(), 0);
        assert_eq!(gear.get_pos(), Direction::LeftFront);
        assert_eq!(pulse.widths(), vec![1_000]);
    }

    #[test]
    fn adjacent_positions_are_45_degrees_apart() {
        let mut gear = SteeringGear::new(MockPulse::new());
        gear.move_to(Direction::Left).unwrap();
        assert_eq!(gear.move_to(Direction::LeftFront).unwrap(), 45);
        assert_eq!(gear.move_to(Direction::Right).unwrap(), 135);
        assert_eq!(gear.move_to(Direction::Left).unwrap(), 180);
    }

    #[test]
    fn release_returns_to_full() {
        let pulse = MockPulse::new();
        let mut gear = SteeringGear::new(pulse.clone());
        gear.move_to(Direction::Right).unwrap();
        assert_eq!(gear.move_to(Direction::Full).unwrap(), 180);
        assert_eq!(gear.get_pos(), Direction::Full);
        assert_eq!(pulse.events().last(), Some(&PulseEvent::Released));
    }

    #[test]
    fn pulse_widths_are_not_used_for_angles() {
        // 2000 - 1000 would read as 1000 "units"; the table says 90°.
        assert_eq!(
            degrees_between(Direction::LeftFront, Direction::RightFront),
            90
        );
        assert_eq!(degrees_between(Direction::Full, Direction::Full), 0);
    }

    #[test]
    fn settle_time_scales_with_travel() {
        assert_eq!(settle_time(0), Duration::ZERO);
        assert_relative_eq!(settle_time(60).as_secs_f64(), 0.13, epsilon = 1e-6);
        assert_relative_eq!(settle_time(45).as_secs_f64(), 0.0975, epsilon = 1e-6);
        assert_relative_eq!(settle_time(180).as_secs_f64(), 0.39, epsilon = 1e-6);
    }

    #[test]
    fn side_of_center() {
        assert!(!Direction::Left.is_right_side());
        assert!(!Direction::Front.is_right_side());
        assert!(!Direction::Full.is_right_side());
        assert!(Direction::RightFront.is_right_side());
        assert!(Direction::Right.is_right_side());
    }
}
