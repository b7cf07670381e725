#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the turret controller.
//!
//! - `Config` and sub-structs are deserialized from TOML; only `[pins]` is
//!   mandatory, every other section falls back to its `Default`.
//! - `Config::validate` checks ranges and cross-field constraints and reports
//!   the offending key path.
use serde::Deserialize;

/// BCM pin assignments.
#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    pub pan_servo: u8,
    pub tilt_servo: u8,
    pub fire_servo: u8,
    pub door_sensor: u8,
    pub motion_sensor: u8,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Camera {
    /// Capture device index (`/dev/videoN`)
    pub index: u32,
    pub width: u32,
    pub height: u32,
    /// Max wait for one frame before the read counts as a timeout
    pub frame_timeout_ms: u64,
    /// Consecutive frame timeouts tolerated before the loop gives up
    pub max_consecutive_timeouts: u32,
    /// Loop pacing target
    pub target_fps: u32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            frame_timeout_ms: 500,
            max_consecutive_timeouts: 3,
            target_fps: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Aim {
    /// Dead-band half-width around the horizontal centre (px)
    pub leeway_x: u32,
    /// Dead-band half-width around the vertical aim point (px)
    pub leeway_y: u32,
    /// Vertical offset of the aim point below centre, compensating projectile drop (px)
    pub tilt_bias_px: i32,
    /// Run the detector every Nth frame
    pub sample_stride: u32,
    /// Iterations per frame-rate estimate
    pub fps_window: u32,
}

impl Default for Aim {
    fn default() -> Self {
        Self {
            leeway_x: 20,
            leeway_y: 20,
            tilt_bias_px: 0,
            sample_stride: 5,
            fps_window: 10,
        }
    }
}

/// Positional servo driving one aiming axis.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AxisServo {
    pub min_us: u16,
    pub max_us: u16,
    /// Fixed correction per iteration
    pub step_us: u16,
    /// Initial and park position
    pub start_us: u16,
    /// Swap correction direction for mirrored mounts
    pub invert: bool,
}

impl Default for AxisServo {
    fn default() -> Self {
        Self {
            min_us: 500,
            max_us: 2500,
            step_us: 10,
            start_us: 1500,
            invert: false,
        }
    }
}

/// Continuous-rotation servo driving the trigger wheel.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FireServo {
    pub stop_us: u16,
    pub fire_us: u16,
}

impl Default for FireServo {
    fn default() -> Self {
        Self {
            stop_us: 1500,
            fire_us: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Servos {
    pub pan: AxisServo,
    pub tilt: AxisServo,
    pub fire: FireServo,
}

/// Hold windows of the debounce latches, in seconds.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Latches {
    pub door_hold_s: u64,
    pub motion_hold_s: u64,
    pub person_hold_s: u64,
}

impl Default for Latches {
    fn default() -> Self {
        Self {
            door_hold_s: 300,
            motion_hold_s: 60,
            person_hold_s: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Capture {
    pub dir: String,
    /// File extension without the leading dot. Captures are PNG-encoded, so
    /// only `png` is accepted.
    pub extension: String,
    /// Captures retained; the oldest are deleted beyond this
    pub max_files: usize,
}

impl Default for Capture {
    fn default() -> Self {
        Self {
            dir: "captures".into(),
            extension: "png".into(),
            max_files: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Vision {
    pub enabled: bool,
    /// Detections below this confidence are ignored
    pub score_threshold: f32,
    /// Detections considered per frame, best first
    pub max_results: usize,
    /// Detector calls slower than this are discarded
    pub timeout_ms: u64,
}

impl Default for Vision {
    fn default() -> Self {
        Self {
            enabled: true,
            score_threshold: 0.5,
            max_results: 3,
            timeout_ms: 250,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Turret {
    /// Master arm switch; when false the fire servo is held stopped
    pub enabled: bool,
}

impl Default for Turret {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
    /// Log files kept in the log directory; older ones are removed at startup
    pub max_files: usize,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            file: None,
            level: None,
            rotation: None,
            max_files: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RunnerCfg {
    /// Stop after this many iterations (simulation and soak tests)
    pub max_iterations: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub camera: Camera,
    #[serde(default)]
    pub aim: Aim,
    #[serde(default)]
    pub servo: Servos,
    #[serde(default)]
    pub latches: Latches,
    #[serde(default)]
    pub capture: Capture,
    #[serde(default)]
    pub vision: Vision,
    #[serde(default)]
    pub turret: Turret,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub runner: RunnerCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration in {:?}: {}", path, e))
}

/// Servo pulse widths accepted anywhere in the config.
const PULSE_RANGE_US: std::ops::RangeInclusive<u16> = 400..=2600;

fn validate_axis(name: &str, a: &AxisServo) -> eyre::Result<()> {
    if !PULSE_RANGE_US.contains(&a.min_us) || !PULSE_RANGE_US.contains(&a.max_us) {
        eyre::bail!("servo.{name}: min_us/max_us must be within 400..=2600");
    }
    if a.min_us >= a.max_us {
        eyre::bail!("servo.{name}.min_us must be < max_us");
    }
    if a.step_us == 0 {
        eyre::bail!("servo.{name}.step_us must be >= 1");
    }
    if a.step_us > a.max_us - a.min_us {
        eyre::bail!("servo.{name}.step_us must not exceed max_us - min_us");
    }
    if !(a.min_us..=a.max_us).contains(&a.start_us) {
        eyre::bail!("servo.{name}.start_us must be within [min_us, max_us]");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        let all = [
            p.pan_servo,
            p.tilt_servo,
            p.fire_servo,
            p.door_sensor,
            p.motion_sensor,
        ];
        for (i, a) in all.iter().enumerate() {
            if all[i + 1..].contains(a) {
                eyre::bail!("pins: pin {a} is assigned more than once");
            }
        }

        // Camera
        if self.camera.width == 0 || self.camera.height == 0 {
            eyre::bail!("camera.width and camera.height must be > 0");
        }
        if self.camera.frame_timeout_ms == 0 {
            eyre::bail!("camera.frame_timeout_ms must be >= 1");
        }
        if self.camera.target_fps == 0 || self.camera.target_fps > 240 {
            eyre::bail!("camera.target_fps must be in [1, 240]");
        }

        // Aim
        if self.aim.leeway_x == 0 || self.aim.leeway_x > self.camera.width / 2 {
            eyre::bail!("aim.leeway_x must be in [1, camera.width / 2]");
        }
        if self.aim.leeway_y == 0 || self.aim.leeway_y > self.camera.height / 2 {
            eyre::bail!("aim.leeway_y must be in [1, camera.height / 2]");
        }
        if self.aim.tilt_bias_px.unsigned_abs() >= self.camera.height / 2 {
            eyre::bail!("aim.tilt_bias_px must be smaller than half the frame height");
        }
        if self.aim.sample_stride == 0 {
            eyre::bail!("aim.sample_stride must be >= 1");
        }
        if self.aim.fps_window == 0 {
            eyre::bail!("aim.fps_window must be >= 1");
        }

        // Servos
        validate_axis("pan", &self.servo.pan)?;
        validate_axis("tilt", &self.servo.tilt)?;
        if !PULSE_RANGE_US.contains(&self.servo.fire.stop_us)
            || !PULSE_RANGE_US.contains(&self.servo.fire.fire_us)
        {
            eyre::bail!("servo.fire: stop_us/fire_us must be within 400..=2600");
        }
        if self.servo.fire.stop_us == self.servo.fire.fire_us {
            eyre::bail!("servo.fire.fire_us must differ from stop_us");
        }

        // Latches
        for (key, v) in [
            ("door_hold_s", self.latches.door_hold_s),
            ("motion_hold_s", self.latches.motion_hold_s),
            ("person_hold_s", self.latches.person_hold_s),
        ] {
            if v == 0 {
                eyre::bail!("latches.{key} must be >= 1");
            }
            if v > 24 * 60 * 60 {
                eyre::bail!("latches.{key} is unreasonably large (>24h)");
            }
        }

        // Capture
        if self.capture.dir.trim().is_empty() {
            eyre::bail!("capture.dir must not be empty");
        }
        let ext = self.capture.extension.as_str();
        if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
            eyre::bail!("capture.extension must be a bare extension such as \"png\"");
        }
        if !ext.eq_ignore_ascii_case("png") {
            eyre::bail!("capture.extension must be \"png\"; captures are PNG-encoded");
        }
        if self.capture.max_files == 0 {
            eyre::bail!("capture.max_files must be >= 1");
        }

        // Vision
        if !(0.0..=1.0).contains(&self.vision.score_threshold) {
            eyre::bail!("vision.score_threshold must be in [0.0, 1.0]");
        }
        if self.vision.max_results == 0 {
            eyre::bail!("vision.max_results must be >= 1");
        }
        if self.vision.timeout_ms == 0 {
            eyre::bail!("vision.timeout_ms must be >= 1");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }
        if self.logging.max_files == 0 {
            eyre::bail!("logging.max_files must be >= 1");
        }

        Ok(())
    }
}
