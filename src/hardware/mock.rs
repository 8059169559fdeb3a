// ================================
// src/hardware/mock.rs - host-side stand-ins for the gpio layer
// ================================
//! Always compiled so integration tests and dry runs can build commanders
//! without a Raspberry Pi. Handles share their state through `Rc`, so a test
//! can keep a clone and inspect or script it after handing one to
//! the code under test. None of these types are `Send`.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use super::{Clock, DigitalInput, DigitalOutput, Platform, Pull, PulseOutput};
use crate::error::{HardwareError, SonarError};
use crate::sonar::{RangeFinder, SPEED_OF_SOUND_M_S};

/// Delay between the end of the trigger pulse and the echo line rising.
pub const ECHO_LATENCY_US: u64 = 250;

// ============================================================================
// Clock
// ============================================================================

/// Controllable time source.
///
/// Every `now_us` read advances time by `step_us`, which lets busy-polling
/// loops terminate. `sleep` advances by the requested duration and records it.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Rc<Cell<u64>>,
    step_us: u64,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl MockClock {
    /// Clock at t=0 that advances 1 us per read.
    pub fn new() -> Self {
        Self::with_step(1)
    }

    pub fn with_step(step_us: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            step_us,
            sleeps: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Current time without advancing it.
    pub fn peek(&self) -> u64 {
        self.now.get()
    }

    pub fn advance(&self, us: u64) {
        self.now.set(self.now.get() + us);
    }

    /// All durations passed to `sleep`, oldest first.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn clear_sleeps(&self) {
        self.sleeps.borrow_mut().clear();
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_us(&self) -> u64 {
        let t = self.now.get();
        self.now.set(t + self.step_us);
        t
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration.as_micros() as u64);
        self.sleeps.borrow_mut().push(duration);
    }
}

// ============================================================================
// Simulated ultrasonic module
// ============================================================================

/// What the simulated module does in answer to one trigger pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Echo {
    /// Reflection from an obstacle this many meters away.
    Distance(f64),
    /// Echo line never rises.
    Silent,
    /// Echo line rises and never falls.
    Stuck,
    /// Raw timing: rises `after_us` past the trigger edge, stays high `width_us`.
    Pulse { after_us: u64, width_us: u64 },
}

impl Echo {
    fn width_us(distance: f64) -> u64 {
        (distance * 2.0 / SPEED_OF_SOUND_M_S * 1_000_000.0).round() as u64
    }
}

#[derive(Debug, Default)]
struct SimState {
    queue: VecDeque<Echo>,
    active: Option<(u64, Echo)>,
    triggers: Vec<u64>,
}

/// Ultrasonic module answering each falling trigger edge with the next
/// queued [`Echo`]. An empty queue answers with [`Echo::Silent`].
#[derive(Debug, Clone)]
pub struct SonarSim {
    clock: MockClock,
    state: Rc<RefCell<SimState>>,
}

impl SonarSim {
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            state: Rc::new(RefCell::new(SimState::default())),
        }
    }

    pub fn push(&self, echo: Echo) {
        self.state.borrow_mut().queue.push_back(echo);
    }

    pub fn push_distances(&self, distances: &[f64]) {
        for &d in distances {
            self.push(Echo::Distance(d));
        }
    }

    /// Timestamps of every completed trigger pulse.
    pub fn triggers(&self) -> Vec<u64> {
        self.state.borrow().triggers.clone()
    }

    pub fn trigger_line(&self) -> MockOutput {
        MockOutput {
            history: Rc::new(RefCell::new(Vec::new())),
            sonar: Some(self.clone()),
        }
    }

    pub fn echo_line(&self) -> MockInput {
        MockInput::Echo(self.clone())
    }

    fn on_trigger_end(&self) {
        let now = self.clock.peek();
        let mut state = self.state.borrow_mut();
        let next = state.queue.pop_front().unwrap_or(Echo::Silent);
        state.active = Some((now, next));
        state.triggers.push(now);
    }

    fn echo_high(&self) -> bool {
        let now = self.clock.peek();
        match self.state.borrow().active {
            Some((armed, Echo::Distance(d))) => {
                let rise = armed + ECHO_LATENCY_US;
                now >= rise && now < rise + Echo::width_us(d)
            }
            Some((armed, Echo::Stuck)) => now >= armed + ECHO_LATENCY_US,
            Some((armed, Echo::Pulse { after_us, width_us })) => {
                let rise = armed + after_us;
                now >= rise && now < rise + width_us
            }
            Some((_, Echo::Silent)) | None => false,
        }
    }
}

// ============================================================================
// Lines
// ============================================================================

/// Output line recording every level written to it.
#[derive(Debug, Clone)]
pub struct MockOutput {
    history: Rc<RefCell<Vec<bool>>>,
    sonar: Option<SonarSim>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self {
            history: Rc::new(RefCell::new(Vec::new())),
            sonar: None,
        }
    }

    pub fn history(&self) -> Vec<bool> {
        self.history.borrow().clone()
    }

    fn level(&self) -> bool {
        self.history.borrow().last().copied().unwrap_or(false)
    }
}

impl Default for MockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl DigitalOutput for MockOutput {
    fn set_high(&mut self) {
        self.history.borrow_mut().push(true);
    }

    fn set_low(&mut self) {
        let was_high = self.level();
        self.history.borrow_mut().push(false);
        if was_high {
            if let Some(sonar) = &self.sonar {
                sonar.on_trigger_end();
            }
        }
    }
}

/// Input line, either held at a settable level or wired to a [`SonarSim`].
#[derive(Debug, Clone)]
pub enum MockInput {
    Level(Rc<Cell<bool>>),
    Echo(SonarSim),
}

impl MockInput {
    pub fn new(high: bool) -> Self {
        Self::Level(Rc::new(Cell::new(high)))
    }

    /// Drive a level line. Has no effect on echo lines.
    pub fn set(&self, high: bool) {
        if let Self::Level(level) = self {
            level.set(high);
        }
    }
}

impl DigitalInput for MockInput {
    fn is_high(&self) -> bool {
        match self {
            Self::Level(level) => level.get(),
            Self::Echo(sonar) => sonar.echo_high(),
        }
    }
}

/// A pulse train change seen by [`MockPulse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseEvent {
    Pulse { width_us: u32, period_us: u32 },
    Released,
}

/// Pulse output recording every change.
#[derive(Debug, Clone, Default)]
pub struct MockPulse {
    events: Rc<RefCell<Vec<PulseEvent>>>,
}

impl MockPulse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PulseEvent> {
        self.events.borrow().clone()
    }

    /// Pulse widths in the order they were commanded.
    pub fn widths(&self) -> Vec<u32> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                PulseEvent::Pulse { width_us, .. } => Some(*width_us),
                PulseEvent::Released => None,
            })
            .collect()
    }
}

impl PulseOutput for MockPulse {
    fn set_pulse(&mut self, width_us: u32, period_us: u32) -> Result<(), HardwareError> {
        self.events.borrow_mut().push(PulseEvent::Pulse {
            width_us,
            period_us,
        });
        Ok(())
    }

    fn release(&mut self) -> Result<(), HardwareError> {
        self.events.borrow_mut().push(PulseEvent::Released);
        Ok(())
    }
}

// ============================================================================
// Range finder
// ============================================================================

/// Range finder replaying a fixed list of outcomes, then timing out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRanger {
    readings: Rc<RefCell<VecDeque<Result<f64, SonarError>>>>,
    calls: Rc<Cell<usize>>,
}

impl ScriptedRanger {
    pub fn new(distances: &[f64]) -> Self {
        let ranger = Self::default();
        ranger.extend(distances);
        ranger
    }

    pub fn extend(&self, distances: &[f64]) {
        self.readings
            .borrow_mut()
            .extend(distances.iter().map(|&d| Ok(d)));
    }

    pub fn push(&self, reading: Result<f64, SonarError>) {
        self.readings.borrow_mut().push_back(reading);
    }

    /// Number of `get_distance` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl RangeFinder for ScriptedRanger {
    fn get_distance(&mut self) -> Result<f64, SonarError> {
        self.calls.set(self.calls.get() + 1);
        self.readings
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(SonarError::EchoStartTimeout { waited_us: 0 }))
    }
}

// ============================================================================
// Platform
// ============================================================================

/// Platform handing out mock lines.
///
/// The sonar trigger/echo pair set with [`MockPlatform::with_sonar`] is wired
/// to [`MockPlatform::sonar`]; every other input is a level line reachable
/// through [`MockPlatform::line`].
#[derive(Debug)]
pub struct MockPlatform {
    clock: MockClock,
    sonar: SonarSim,
    sonar_lines: Option<(u8, u8)>,
    levels: HashMap<u8, MockInput>,
    pulses: HashMap<u8, MockPulse>,
    claimed: Vec<u8>,
    broken: Vec<u8>,
}

impl MockPlatform {
    pub fn new() -> Self {
        let clock = MockClock::new();
        Self {
            sonar: SonarSim::new(clock.clone()),
            clock,
            sonar_lines: None,
            levels: HashMap::new(),
            pulses: HashMap::new(),
            claimed: Vec::new(),
            broken: Vec::new(),
        }
    }

    pub fn with_sonar(mut self, trigger: u8, echo: u8) -> Self {
        self.sonar_lines = Some((trigger, echo));
        self
    }

    /// Make every later claim of `line` fail.
    pub fn with_broken_line(mut self, line: u8) -> Self {
        self.broken.push(line);
        self
    }

    pub fn sonar(&self) -> &SonarSim {
        &self.sonar
    }

    pub fn mock_clock(&self) -> &MockClock {
        &self.clock
    }

    /// Level line for `line`, created high (pulled up) on first use.
    pub fn line(&mut self, line: u8) -> MockInput {
        self.levels
            .entry(line)
            .or_insert_with(|| MockInput::new(true))
            .clone()
    }

    pub fn pulse_line(&mut self, line: u8) -> MockPulse {
        self.pulses.entry(line).or_default().clone()
    }

    /// Lines claimed so far, in order.
    pub fn claimed(&self) -> &[u8] {
        &self.claimed
    }

    fn claim(&mut self, line: u8) -> Result<(), HardwareError> {
        if self.broken.contains(&line) {
            return Err(HardwareError::Gpio {
                line,
                reason: "line busy".to_string(),
            });
        }
        self.claimed.push(line);
        Ok(())
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MockPlatform {
    type Output = MockOutput;
    type Input = MockInput;
    type Pulse = MockPulse;
    type Clock = MockClock;

    fn output(&mut self, line: u8) -> Result<MockOutput, HardwareError> {
        self.claim(line)?;
        match self.sonar_lines {
            Some((trigger, _)) if trigger == line => Ok(self.sonar.trigger_line()),
            _ => Ok(MockOutput::new()),
        }
    }

    fn input(&mut self, line: u8, pull: Pull) -> Result<MockInput, HardwareError> {
        self.claim(line)?;
        match self.sonar_lines {
            Some((_, echo)) if echo == line => Ok(self.sonar.echo_line()),
            _ => {
                let input = self.line(line);
                input.set(pull == Pull::Up);
                Ok(input)
            }
        }
    }

    fn pulse(&mut self, line: u8) -> Result<MockPulse, HardwareError> {
        self.claim(line)?;
        Ok(self.pulse_line(line))
    }

    fn clock(&self) -> MockClock {
        self.clock.clone()
    }
}
