// ================================
// src/commander/avoidance.rs - steering + sonar obstacle avoidance
// ================================
use std::collections::HashMap;

use tracing::{debug, warn};

use super::{Command, Commander};
use crate::config::AvoidanceParams;
use crate::hardware::{Clock, PulseOutput};
use crate::sonar::RangeFinder;
use crate::steering::{settle_time, Direction, SteeringGear};

/// Controller state. Exactly one is active per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Driving forward.
    Walk,
    /// Short front-cone sweep to confirm the path is still clear.
    Check,
    /// Stopped; full left-to-right sweep to pick a way out.
    Lookup,
    /// A turn was issued last tick; let it run for one period.
    Adjust,
}

/// Obstacle avoidance with the sonar on a rotating mount.
///
/// Each [`Commander::scan_cmd`] call runs one state's work:
///
/// | state  | sensing                  | clear front cone  | blocked front cone            |
/// |--------|--------------------------|-------------------|-------------------------------|
/// | WALK   | 3-point sweep            | WALK, `forward`   | LOOKUP, `brake`               |
/// | CHECK  | 3-point sweep            | WALK, `forward`   | LOOKUP, `brake`               |
/// | LOOKUP | 5-point sweep            | WALK, `forward`   | ADJUST, `left`/`right`        |
/// | ADJUST | none                     | LOOKUP, `brake`   | LOOKUP, `brake`               |
///
/// With `light_check`, WALK does not sense: it re-uses the readings from the
/// previous sweep and hands over to CHECK, which sweeps on the next tick.
///
/// Readings that timed out, and directions never scanned, count as 0 m.
pub struct SteeringSonarCommander<R, P, C> {
    sonar: R,
    steering: SteeringGear<P>,
    clock: C,
    safe_distance_low: f64,
    light_check: bool,
    // determines whether to keep going
    walk_scan: [Direction; 3],
    // determines which way to turn
    stop_scan: [Direction; 5],
    dir_distance: HashMap<Direction, Option<f64>>,
    state: State,
}

impl<R, P, C> SteeringSonarCommander<R, P, C>
where
    R: RangeFinder,
    P: PulseOutput,
    C: Clock,
{
    pub fn new(sonar: R, steering: SteeringGear<P>, clock: C, params: &AvoidanceParams) -> Self {
        Self {
            sonar,
            steering,
            clock,
            safe_distance_low: params.safe_distance_low,
            light_check: params.light_check,
            walk_scan: Direction::FRONT_CONE,
            stop_scan: Direction::SWEEP,
            dir_distance: HashMap::new(),
            state: State::Lookup,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Last reading for `dir`; `None` if it timed out or was never taken.
    pub fn distance(&self, dir: Direction) -> Option<f64> {
        self.dir_distance.get(&dir).copied().flatten()
    }

    pub fn steering(&self) -> &SteeringGear<P> {
        &self.steering
    }

    /// Distance used for decisions: unknown counts as touching.
    fn known(&self, dir: Direction) -> f64 {
        self.distance(dir).unwrap_or(0.0)
    }

    fn front_cone_min(&self) -> f64 {
        Direction::FRONT_CONE
            .iter()
            .map(|&dir| self.known(dir))
            .fold(f64::INFINITY, f64::min)
    }

    fn front_cone_clear(&self) -> bool {
        self.front_cone_min() >= self.safe_distance_low
    }

    /// Run `pattern` starting from the end nearer to the current position.
    fn sweep<const N: usize>(&mut self, mut pattern: [Direction; N]) {
        if self.steering.get_pos().is_right_side() {
            pattern.reverse();
        }
        for dir in pattern {
            self.scan_step(dir);
        }
    }

    fn scan_step(&mut self, dir: Direction) {
        let reading = match self.steering.move_to(dir) {
            Ok(degrees) => {
                self.clock.sleep(settle_time(degrees));
                self.sonar.get_distance().ok()
            }
            Err(e) => {
                warn!("steering: cannot point to {:?}: {}", dir, e);
                None
            }
        };
        debug!("scan {:?}: {:?}", dir, reading);
        self.dir_distance.insert(dir, reading);
    }

    fn transition(&mut self, next: State, cmd: Command) -> Command {
        if next != self.state {
            debug!("avoidance: {:?} -> {:?} ({})", self.state, next, cmd);
        }
        self.state = next;
        cmd
    }

    fn walk_or_stop(&mut self) -> Command {
        if self.front_cone_clear() {
            self.transition(State::Walk, Command::Forward)
        } else {
            self.transition(State::Lookup, Command::Brake)
        }
    }
}

impl<R, P, C> Commander for SteeringSonarCommander<R, P, C>
where
    R: RangeFinder,
    P: PulseOutput,
    C: Clock,
{
    fn scan_cmd(&mut self) -> Command {
        match self.state {
            State::Adjust => self.transition(State::Lookup, Command::Brake),
            State::Walk if self.light_check => {
                if self.front_cone_clear() {
                    self.transition(State::Check, Command::Forward)
                } else {
                    self.transition(State::Lookup, Command::Brake)
                }
            }
            State::Walk | State::Check => {
                self.sweep(self.walk_scan);
                self.walk_or_stop()
            }
            State::Lookup => {
                self.sweep(self.stop_scan);
                if self.front_cone_clear() {
                    return self.transition(State::Walk, Command::Forward);
                }
                let turn = if self.known(Direction::Left) > self.known(Direction::Right) {
                    Command::Left
                } else {
                    Command::Right
                };
                self.transition(State::Adjust, turn)
            }
        }
    }
}
