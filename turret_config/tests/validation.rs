use rstest::rstest;
use turret_config::{load_file, load_toml};

const PINS: &str = r#"
[pins]
pan_servo = 24
tilt_servo = 23
fire_servo = 25
door_sensor = 17
motion_sensor = 18
"#;

fn with_pins(extra: &str) -> String {
    format!("{PINS}\n{extra}")
}

#[test]
fn pins_only_config_uses_defaults_and_validates() {
    let cfg = load_toml(PINS).expect("parse TOML");
    cfg.validate().expect("defaults must be valid");

    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.height, 480);
    assert_eq!(cfg.aim.sample_stride, 5);
    assert_eq!(cfg.aim.fps_window, 10);
    assert_eq!(cfg.servo.pan.max_us, 2500);
    assert_eq!(cfg.latches.door_hold_s, 300);
    assert_eq!(cfg.capture.max_files, 20);
    assert!(cfg.turret.enabled);
    assert!(cfg.runner.max_iterations.is_none());
}

#[test]
fn missing_pins_is_a_parse_error() {
    let err = load_toml("[camera]\nwidth = 320\n").expect_err("pins are required");
    assert!(err.to_string().contains("pins"));
}

#[test]
fn full_config_round_trips_values() {
    let toml = with_pins(
        r#"
[camera]
width = 320
height = 240
frame_timeout_ms = 100
target_fps = 15

[aim]
leeway_x = 10
leeway_y = 12
tilt_bias_px = 8
sample_stride = 3

[servo.pan]
min_us = 600
max_us = 2400
step_us = 20
start_us = 1500
invert = true

[servo.fire]
stop_us = 1500
fire_us = 1900

[latches]
door_hold_s = 120

[capture]
dir = "/var/lib/turret/captures"
extension = "png"
max_files = 50

[turret]
enabled = false

[logging]
file = "logs/turret.log"
rotation = "daily"
max_files = 5
"#,
    );
    let cfg = load_toml(&toml).expect("parse");
    cfg.validate().expect("valid");
    assert_eq!(cfg.aim.tilt_bias_px, 8);
    assert!(cfg.servo.pan.invert);
    assert_eq!(cfg.servo.tilt.step_us, 10, "tilt keeps defaults");
    assert_eq!(cfg.latches.door_hold_s, 120);
    assert_eq!(cfg.latches.motion_hold_s, 60);
    assert!(!cfg.turret.enabled);
    assert_eq!(cfg.logging.max_files, 5);
}

#[rstest]
#[case("[aim]\nsample_stride = 0", "aim.sample_stride must be >= 1")]
#[case("[aim]\nfps_window = 0", "aim.fps_window must be >= 1")]
#[case("[aim]\nleeway_x = 400", "aim.leeway_x")]
#[case("[aim]\ntilt_bias_px = -300", "aim.tilt_bias_px")]
#[case("[camera]\nframe_timeout_ms = 0", "camera.frame_timeout_ms")]
#[case("[camera]\ntarget_fps = 0", "camera.target_fps")]
#[case("[servo.pan]\nmin_us = 2000\nmax_us = 1000\nstart_us = 1500", "servo.pan.min_us must be < max_us")]
#[case("[servo.tilt]\nstep_us = 0", "servo.tilt.step_us must be >= 1")]
#[case("[servo.tilt]\nstart_us = 2550", "servo.tilt.start_us")]
#[case("[servo.pan]\nmax_us = 3000", "servo.pan: min_us/max_us")]
#[case("[servo.fire]\nstop_us = 1500\nfire_us = 1500", "servo.fire.fire_us must differ")]
#[case("[latches]\nmotion_hold_s = 0", "latches.motion_hold_s must be >= 1")]
#[case("[capture]\nmax_files = 0", "capture.max_files must be >= 1")]
#[case("[capture]\nextension = \".png\"", "capture.extension")]
#[case("[capture]\nextension = \"jpg\"", "captures are PNG-encoded")]
#[case("[vision]\nscore_threshold = 1.5", "vision.score_threshold")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_out_of_range_values(#[case] extra: &str, #[case] needle: &str) {
    let cfg = load_toml(&with_pins(extra)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "expected `{needle}` in `{err}`"
    );
}

#[test]
fn rejects_duplicate_pins() {
    let toml = r#"
[pins]
pan_servo = 24
tilt_servo = 24
fire_servo = 25
door_sensor = 17
motion_sensor = 18
"#;
    let cfg = load_toml(toml).expect("parse");
    let err = cfg.validate().expect_err("duplicate");
    assert!(err.to_string().contains("pin 24 is assigned more than once"));
}

#[test]
fn load_file_reports_path_on_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[pins]\npan_servo = \"x\"\n").unwrap();
    let err = load_file(&path).expect_err("bad type");
    let msg = err.to_string();
    assert!(msg.contains("invalid configuration"));
    assert!(msg.contains("bad.toml"));
}
