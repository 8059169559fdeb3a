// ================================
// src/commander/infrared.rs - infrared line following
// ================================
use super::{Command, Commander};
use crate::hardware::DigitalInput;

/// Line follower over four reflective infrared sensors.
///
/// Sensors p1..p4 sit left to right and pull their line low when they see the
/// track. The outer pair forces a hard correction, the inner pair steers.
pub struct InfraredCommander<I> {
    lines: [I; 4],
}

impl<I: DigitalInput> InfraredCommander<I> {
    pub fn new(lines: [I; 4]) -> Self {
        Self { lines }
    }
}

/// Maps sensor levels (`true` = high, track not seen) to a command.
pub fn follow_line(levels: [bool; 4]) -> Command {
    let [p1, p2, p3, p4] = levels.map(|high| !high);
    if p4 {
        return Command::Right;
    }
    if p1 {
        return Command::Left;
    }
    match (p2, p3) {
        (true, true) => Command::Forward,
        (true, false) => Command::Left,
        (false, true) => Command::Right,
        (false, false) => Command::Backward,
    }
}

impl<I: DigitalInput> Commander for InfraredCommander<I> {
    fn scan_cmd(&mut self) -> Command {
        let levels = [
            self.lines[0].is_high(),
            self.lines[1].is_high(),
            self.lines[2].is_high(),
            self.lines[3].is_high(),
        ];
        follow_line(levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::MockInput;

    const H: bool = true;
    const L: bool = false;

    #[test]
    fn outer_sensors_take_priority() {
        assert_eq!(follow_line([L, L, L, L]), Command::Right);
        assert_eq!(follow_line([L, H, H, H]), Command::Left);
        assert_eq!(follow_line([H, L, L, L]), Command::Right);
    }

    #[test]
    fn inner_sensors_steer() {
        assert_eq!(follow_line([H, L, L, H]), Command::Forward);
        assert_eq!(follow_line([H, L, H, H]), Command::Left);
        assert_eq!(follow_line([H, H, L, H]), Command::Right);
    }

    #[test]
    fn lost_track_backs_up() {
        assert_eq!(follow_line([H, H, H, H]), Command::Backward);
    }

    #[test]
    fn reads_all_four_lines() {
        let lines = [
            MockInput::new(true),
            MockInput::new(false),
            MockInput::new(false),
            MockInput::new(true),
        ];
        let mut cmd = InfraredCommander::new(lines.clone());
        assert_eq!(cmd.scan_cmd(), Command::Forward);

        lines[2].set(true);
        assert_eq!(cmd.scan_cmd(), Command::Left);
    }
}
