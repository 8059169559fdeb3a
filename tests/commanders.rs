// ================================
// tests/commanders.rs - factory-built command sources on simulated hardware
// ================================
use sonar_rover::commander::search::widening_zigzag;
use sonar_rover::hardware::mock::MockPlatform;
use sonar_rover::{make_commander, Command, CommanderKind, RoverParams};

#[test]
fn fixed_sonar_recovers_after_zigzag() {
    let params = RoverParams::from_toml_str(
        r#"
        commander = "sonar"

        [search]
        safe_distance_low = 0.5
        safe_distance_high = 0.5
        "#,
    )
    .unwrap();
    let mut platform = MockPlatform::new().with_sonar(14, 15);
    let mut cmd = make_commander(params.commander, &params, &mut platform).unwrap();
    platform.sonar().push_distances(&[0.6, 0.6, 0.4, 0.4, 0.6]);

    let table = widening_zigzag(params.search.max_run);
    let out: Vec<Command> = (0..5).map(|_| cmd.scan_cmd()).collect();
    assert_eq!(
        out,
        vec![
            Command::Forward,
            Command::Forward,
            table[0],
            table[1],
            Command::Forward
        ]
    );
    assert_eq!(platform.sonar().triggers().len(), 5);
}

#[test]
fn infrared_follows_platform_lines() {
    let params = RoverParams::default();
    let mut platform = MockPlatform::new();
    let mut cmd = make_commander(CommanderKind::Infrared, &params, &mut platform).unwrap();

    // pull-ups: nothing on the track
    assert_eq!(cmd.scan_cmd(), Command::Backward);

    let [_, p2, p3, _] = params.infrared.pins;
    platform.line(p2).set(false);
    platform.line(p3).set(false);
    assert_eq!(cmd.scan_cmd(), Command::Forward);

    platform.line(params.infrared.pins[3]).set(false);
    assert_eq!(cmd.scan_cmd(), Command::Right);
}

#[test]
fn joystick_builds_its_autopilot() {
    let params = RoverParams::from_toml_str(
        r#"
        commander = "joystick"

        [joystick]
        device = "/nonexistent/js0"
        autopilot = "steering_sonar"
        "#,
    )
    .unwrap();
    let mut platform = MockPlatform::new().with_sonar(14, 15);
    make_commander(params.commander, &params, &mut platform).unwrap();
    assert_eq!(platform.claimed(), &[14, 15, 18]);
}

#[test]
fn joystick_cannot_nest() {
    let mut params = RoverParams::default();
    params.joystick.autopilot = CommanderKind::Joystick;
    let mut platform = MockPlatform::new();
    assert!(make_commander(CommanderKind::Joystick, &params, &mut platform).is_err());
}

#[test]
fn broken_servo_line_aborts_startup() {
    let params = RoverParams::default();
    let mut platform = MockPlatform::new()
        .with_sonar(14, 15)
        .with_broken_line(params.steering.control_pin);
    let err = make_commander(CommanderKind::SteeringSonar, &params, &mut platform)
        .err()
        .unwrap();
    assert!(format!("{:#}", err).contains("steering_sonar"));
}
