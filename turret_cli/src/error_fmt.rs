//! Human-readable error descriptions and structured JSON error formatting.

use turret_core::error::{BuildError, TurretError};

/// Process exit codes. Argument errors exit with clap's own code (2).
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_CAMERA: i32 = 3;
pub const EXIT_HARDWARE: i32 = 4;

fn is_config_message(lower: &str) -> bool {
    lower.contains("invalid configuration")
        || lower.contains("read config")
        || lower.contains("assigned more than once")
        || lower.starts_with("camera.")
        || lower.starts_with("aim.")
        || lower.starts_with("servo.")
        || lower.starts_with("latches.")
        || lower.starts_with("capture.")
        || lower.starts_with("vision.")
        || lower.starts_with("logging.")
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingCamera => {
                "What happened: No camera was provided to the controller.\nLikely causes: The capture device failed to open or was not wired into the builder.\nHow to fix: Check the camera connection and camera.index in the config.".to_string()
            }
            BuildError::MissingServos => {
                "What happened: No servo outputs were provided to the controller.\nLikely causes: GPIO initialization failed.\nHow to fix: Check the [pins] section and GPIO permissions.".to_string()
            }
            BuildError::MissingInputs => {
                "What happened: No sensor inputs were provided to the controller.\nLikely causes: GPIO initialization failed.\nHow to fix: Check pins.door_sensor and pins.motion_sensor.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/turret.toml for a sample."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TurretError>() {
        return match te {
            TurretError::FrameTimeout => {
                "What happened: The camera stopped delivering frames.\nLikely causes: Camera unplugged, USB bandwidth exhausted, or camera.frame_timeout_ms too low.\nHow to fix: Reconnect the camera, or raise camera.frame_timeout_ms / camera.max_consecutive_timeouts.".to_string()
            }
            TurretError::Camera(msg) => format!(
                "What happened: Camera error ({msg}).\nLikely causes: Capture device disconnected or busy.\nHow to fix: Reconnect the camera and check camera.index. The servos were parked before exit."
            ),
            TurretError::Hardware(msg) | TurretError::HardwareFault(msg) => format!(
                "What happened: Servo or sensor hardware failed ({msg}).\nLikely causes: Wiring, power, or GPIO permissions.\nHow to fix: Check the [pins] section, servo power and that the process may access GPIO. The servos were parked before exit."
            ),
            TurretError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read ({msg}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> pointing at a readable TOML file."
        );
    }
    if is_config_message(&lower) {
        return format!(
            "What happened: Configuration is invalid or incomplete ({msg}).\nLikely causes: Missing sections, duplicate pins, or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }
    if lower.contains("gpio") {
        return format!(
            "What happened: Failed to initialize GPIO ({msg}).\nLikely causes: Incorrect pin numbers or insufficient permissions.\nHow to fix: Fix the [pins] values; add the user to the gpio group."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable short name for the error class, used in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        EXIT_CONFIG => "Config",
        EXIT_CAMERA => "Camera",
        EXIT_HARDWARE => "Hardware",
        _ => "Error",
    }
}

/// Map the error class to a stable exit code.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => EXIT_CONFIG,
            _ => EXIT_HARDWARE,
        };
    }
    if let Some(te) = err.downcast_ref::<TurretError>() {
        return match te {
            TurretError::Config(_) => EXIT_CONFIG,
            TurretError::Camera(_) | TurretError::FrameTimeout => EXIT_CAMERA,
            TurretError::Hardware(_) | TurretError::HardwareFault(_) => EXIT_HARDWARE,
            _ => EXIT_FAILURE,
        };
    }
    // Config loader and validation errors are plain messages, possibly wrapped.
    let chain_is_config = err
        .chain()
        .any(|e| is_config_message(&e.to_string().to_ascii_lowercase()));
    if chain_is_config {
        return EXIT_CONFIG;
    }
    if err
        .chain()
        .any(|e| e.to_string().to_ascii_lowercase().contains("gpio"))
    {
        return EXIT_HARDWARE;
    }
    EXIT_FAILURE
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn typed_errors_map_to_codes() {
        let camera = eyre::Report::new(TurretError::Camera("gone".into()));
        assert_eq!(exit_code_for_error(&camera), EXIT_CAMERA);
        assert!(humanize(&camera).contains("Camera error (gone)"));

        let timeout = eyre::Report::new(TurretError::FrameTimeout);
        assert_eq!(exit_code_for_error(&timeout), EXIT_CAMERA);

        let hw = eyre::Report::new(TurretError::HardwareFault("pin busy".into()));
        assert_eq!(exit_code_for_error(&hw), EXIT_HARDWARE);

        let cfg = eyre::Report::new(BuildError::InvalidConfig("sample_stride must be >= 1"));
        assert_eq!(exit_code_for_error(&cfg), EXIT_CONFIG);
        assert!(humanize(&cfg).contains("sample_stride"));
    }

    #[test]
    fn wrapped_validation_message_is_config() {
        let err: eyre::Result<()> = Err(eyre::eyre!("pins: pin 17 is assigned more than once"));
        let err = err.wrap_err("config rejected").unwrap_err();
        assert_eq!(exit_code_for_error(&err), EXIT_CONFIG);
        assert_eq!(reason_name(&err), "Config");
    }

    #[test]
    fn json_error_has_reason_and_message() {
        let err = eyre::Report::new(TurretError::FrameTimeout);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Camera");
        assert_eq!(v["code"], 3);
        assert!(v["message"].as_str().unwrap().contains("stopped delivering frames"));
    }

    #[test]
    fn unknown_errors_exit_one() {
        let err = eyre::eyre!("something odd");
        assert_eq!(exit_code_for_error(&err), EXIT_FAILURE);
        assert!(humanize(&err).contains("Original: something odd"));
    }
}
