// ================================
// src/commander/joystick.rs - Linux joystick and source hand-over
// ================================
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{Command, Commander};

pub const JS_EVENT_BUTTON: u8 = 0x01;
pub const JS_EVENT_AXIS: u8 = 0x02;
/// Set on the synthetic events the driver emits right after open.
pub const JS_EVENT_INIT: u8 = 0x80;

const AXIS_X: u8 = 4;
const AXIS_Y: u8 = 5;
const BUTTON_AUTOPILOT: u8 = 2;

/// One `struct js_event` from the kernel joystick API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsEvent {
    pub time_ms: u32,
    pub value: i16,
    pub kind: u8,
    pub number: u8,
}

impl JsEvent {
    pub const SIZE: usize = 8;

    pub fn from_bytes(b: [u8; Self::SIZE]) -> Self {
        Self {
            time_ms: u32::from_ne_bytes([b[0], b[1], b[2], b[3]]),
            value: i16::from_ne_bytes([b[4], b[5]]),
            kind: b[6],
            number: b[7],
        }
    }

    pub fn is_button(&self) -> bool {
        self.kind & !JS_EVENT_INIT == JS_EVENT_BUTTON
    }

    pub fn is_axis(&self) -> bool {
        self.kind & !JS_EVENT_INIT == JS_EVENT_AXIS
    }
}

/// What the operator is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoystickIntent {
    Drive(Command),
    /// Hand control to the autonomous commander.
    Autopilot,
}

/// Latest stick and button positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoystickState {
    x: i16,
    y: i16,
    autopilot: bool,
}

impl JoystickState {
    pub fn apply(&mut self, event: &JsEvent) {
        if event.is_button() {
            if event.number == BUTTON_AUTOPILOT {
                self.autopilot = event.value != 0;
            }
        } else if event.is_axis() {
            match event.number {
                AXIS_X => self.x = event.value,
                AXIS_Y => self.y = event.value,
                _ => {}
            }
        }
    }

    pub fn intent(&self) -> JoystickIntent {
        if self.autopilot {
            return JoystickIntent::Autopilot;
        }
        let cmd = if self.x == 0 && self.y == 0 {
            Command::Brake
        } else if self.x < 0 {
            Command::Forward
        } else if self.y == 0 {
            Command::Backward
        } else if self.y < 0 {
            Command::Right
        } else {
            Command::Left
        };
        JoystickIntent::Drive(cmd)
    }
}

/// Anything that reports operator intent, or `None` while disconnected.
pub trait IntentSource {
    fn poll(&mut self) -> Option<JoystickIntent>;
}

/// Joystick device opened non-blocking.
///
/// When the device disappears the handle is dropped; every later poll tries
/// to open the path again.
pub struct Joystick {
    path: PathBuf,
    device: Option<File>,
    state: JoystickState,
}

impl Joystick {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let mut js = Self {
            path: path.as_ref().to_path_buf(),
            device: None,
            state: JoystickState::default(),
        };
        js.reload_if_needed();
        js
    }

    pub fn is_found(&self) -> bool {
        self.device.is_some()
    }

    fn reload_if_needed(&mut self) {
        if self.device.is_some() {
            return;
        }
        match OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
        {
            Ok(file) => {
                info!("joystick: opened {}", self.path.display());
                self.state = JoystickState::default();
                self.device = Some(file);
            }
            Err(e) => debug!("joystick: {} unavailable: {}", self.path.display(), e),
        }
    }

    fn disconnect(&mut self, reason: &str) {
        warn!("joystick: lost {}: {}", self.path.display(), reason);
        self.device = None;
        self.state = JoystickState::default();
    }
}

impl IntentSource for Joystick {
    fn poll(&mut self) -> Option<JoystickIntent> {
        self.reload_if_needed();
        let device = self.device.as_mut()?;
        let mut buf = [0u8; JsEvent::SIZE];
        loop {
            match device.read(&mut buf) {
                Ok(JsEvent::SIZE) => self.state.apply(&JsEvent::from_bytes(buf)),
                Ok(0) => {
                    self.disconnect("end of stream");
                    return None;
                }
                Ok(n) => debug!("joystick: dropped short read of {} bytes", n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.disconnect(&e.to_string());
                    return None;
                }
            }
        }
        Some(self.state.intent())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Joystick,
    Autopilot,
    Terminal,
}

/// Joystick first, with the autopilot on demand and the terminal when no
/// joystick is plugged in.
pub struct JoystickSupervisor<S = Joystick> {
    joystick: S,
    autopilot: Box<dyn Commander>,
    fallback: Box<dyn Commander>,
    source: Option<Source>,
}

impl<S: IntentSource> JoystickSupervisor<S> {
    pub fn new(joystick: S, autopilot: Box<dyn Commander>, fallback: Box<dyn Commander>) -> Self {
        Self {
            joystick,
            autopilot,
            fallback,
            source: None,
        }
    }

    fn switch_to(&mut self, source: Source) {
        if self.source != Some(source) {
            info!("command source: {:?}", source);
            self.source = Some(source);
        }
    }
}

impl<S: IntentSource> Commander for JoystickSupervisor<S> {
    fn scan_cmd(&mut self) -> Command {
        match self.joystick.poll() {
            Some(JoystickIntent::Drive(cmd)) => {
                self.switch_to(Source::Joystick);
                cmd
            }
            Some(JoystickIntent::Autopilot) => {
                self.switch_to(Source::Autopilot);
                self.autopilot.scan_cmd()
            }
            None => {
                self.switch_to(Source::Terminal);
                self.fallback.scan_cmd()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn event(kind: u8, number: u8, value: i16) -> JsEvent {
        JsEvent {
            time_ms: 0,
            value,
            kind,
            number,
        }
    }

    #[test]
    fn decodes_kernel_layout() {
        let mut raw = [0u8; 8];
        raw[..4].copy_from_slice(&1234u32.to_ne_bytes());
        raw[4..6].copy_from_slice(&(-32767i16).to_ne_bytes());
        raw[6] = JS_EVENT_AXIS | JS_EVENT_INIT;
        raw[7] = 5;
        let e = JsEvent::from_bytes(raw);
        assert_eq!(e.time_ms, 1234);
        assert_eq!(e.value, -32767);
        assert!(e.is_axis());
        assert!(!e.is_button());
        assert_eq!(e.number, 5);
    }

    #[test]
    fn centered_stick_brakes() {
        assert_eq!(
            JoystickState::default().intent(),
            JoystickIntent::Drive(Command::Brake)
        );
    }

    #[test]
    fn stick_mapping() {
        let mut state = JoystickState::default();
        state.apply(&event(JS_EVENT_AXIS, AXIS_X, -100));
        assert_eq!(state.intent(), JoystickIntent::Drive(Command::Forward));

        state.apply(&event(JS_EVENT_AXIS, AXIS_X, 100));
        assert_eq!(state.intent(), JoystickIntent::Drive(Command::Backward));

        state.apply(&event(JS_EVENT_AXIS, AXIS_Y, -100));
        assert_eq!(state.intent(), JoystickIntent::Drive(Command::Right));

        state.apply(&event(JS_EVENT_AXIS, AXIS_Y, 100));
        assert_eq!(state.intent(), JoystickIntent::Drive(Command::Left));

        // other axes are ignored
        state.apply(&event(JS_EVENT_AXIS, 0, -100));
        assert_eq!(state.intent(), JoystickIntent::Drive(Command::Left));
    }

    #[test]
    fn autopilot_button_overrides_stick() {
        let mut state = JoystickState::default();
        state.apply(&event(JS_EVENT_AXIS, AXIS_X, -100));
        state.apply(&event(JS_EVENT_BUTTON, BUTTON_AUTOPILOT, 1));
        assert_eq!(state.intent(), JoystickIntent::Autopilot);
        state.apply(&event(JS_EVENT_BUTTON, BUTTON_AUTOPILOT, 0));
        assert_eq!(state.intent(), JoystickIntent::Drive(Command::Forward));
    }

    #[test]
    fn missing_device_reports_disconnected() {
        let mut js = Joystick::open("/nonexistent/js0");
        assert!(!js.is_found());
        assert_eq!(js.poll(), None);
    }

    struct Scripted(VecDeque<Option<JoystickIntent>>);

    impl IntentSource for Scripted {
        fn poll(&mut self) -> Option<JoystickIntent> {
            self.0.pop_front().flatten()
        }
    }

    struct Fixed(Command);

    impl Commander for Fixed {
        fn scan_cmd(&mut self) -> Command {
            self.0
        }
    }

    #[test]
    fn supervisor_routes_to_active_source() {
        let script = Scripted(VecDeque::from(vec![
            Some(JoystickIntent::Drive(Command::Left)),
            Some(JoystickIntent::Autopilot),
            None,
            Some(JoystickIntent::Drive(Command::Brake)),
        ]));
        let mut sup = JoystickSupervisor::new(
            script,
            Box::new(Fixed(Command::Forward)),
            Box::new(Fixed(Command::Backward)),
        );
        assert_eq!(sup.scan_cmd(), Command::Left);
        assert_eq!(sup.scan_cmd(), Command::Forward);
        assert_eq!(sup.scan_cmd(), Command::Backward);
        assert_eq!(sup.scan_cmd(), Command::Brake);
    }
}
